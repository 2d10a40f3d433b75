use log::info;

/// Longest body echo, in characters
pub const MAX_ECHO_CHARS: usize = 2000;

/// Side channel for outgoing request bodies
pub trait DebugSink: Send + Sync {
    fn emit(&self, label: &str, body: &str);
}

/// Default sink: echoes through the `log` facade
#[derive(Clone, Copy, Default)]
pub struct LogSink;

impl DebugSink for LogSink {
    fn emit(&self, label: &str, body: &str) {
        info!("{}: {}", label, body);
    }
}

pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
