use std::time::Duration;

use envconfig::Envconfig;
use log::debug;

use crate::client::CallOptions;

#[derive(Envconfig, Clone)]
pub struct VdsConfig {
    #[envconfig(from = "TABLEAU_DOMAIN")]
    pub domain: String,

    #[envconfig(from = "DATASOURCE_LUID")]
    pub datasource_luid: String,

    #[envconfig(from = "VDS_TIMEOUT_SECS", default = "60")]
    pub timeout_secs: u64,

    #[envconfig(from = "VDS_DEBUG", default = "true")]
    pub debug: bool,
}

impl VdsConfig {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!(
            "VdsConfig loaded: domain={}, datasource_luid={}, timeout_secs={}, debug={}",
            config.domain, config.datasource_luid, config.timeout_secs, config.debug
        );
        Ok(config)
    }

    /// Per-call options handed to every [`crate::client::VdsClient`] operation
    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            debug: self.debug,
        }
    }
}

/// The token itself is issued elsewhere; this only picks it up.
#[derive(Envconfig, Clone)]
pub struct AuthConfig {
    #[envconfig(from = "TABLEAU_AUTH_TOKEN")]
    pub token: String,
}

impl AuthConfig {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!("AuthConfig loaded: token_len={}", config.token.len());
        Ok(config)
    }
}

#[derive(Envconfig)]
pub struct RunnerConfig {
    #[envconfig(from = "VDS_QUERY_FILE")]
    pub query_file: Option<String>,
}

impl RunnerConfig {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!("RunnerConfig loaded: query_file={:?}", config.query_file);
        Ok(config)
    }
}
