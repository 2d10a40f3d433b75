pub mod client;
pub mod config;
pub mod query;
pub mod result;

pub use client::{CallOptions, VdsClient, VdsError};
pub use query::{adapt, Query, QueryRequest};
