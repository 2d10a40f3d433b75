pub mod sink;
pub mod transport;

use crate::query::{AdapterError, Query, QueryRequest};
use log::debug;
use serde_json::{json, Value};
use sink::{truncate_chars, DebugSink, LogSink, MAX_ECHO_CHARS};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
pub use transport::{HttpTransport, Transport, TransportResponse};

pub const QUERY_DATASOURCE_PATH: &str = "/api/v1/vizql-data-service/query-datasource";
pub const READ_METADATA_PATH: &str = "/api/v1/vizql-data-service/read-metadata";

/// Per-call settings, passed explicitly to each operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallOptions {
    pub timeout: Duration,
    pub debug: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        CallOptions {
            timeout: Duration::from_secs(60),
            debug: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum VdsError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("VDS query must include at least one field")]
    EmptyQuery,

    #[error("Missing X-Tableau-Auth token")]
    MissingToken,

    #[error("Failed to query data source via Tableau VizQL Data Service. Status code: {status}. Response: {body}")]
    RemoteQueryFailed { status: u16, body: String },

    #[error("Failed to obtain data source metadata from VizQL Data Service. Status code: {status}. Response: {body}")]
    RemoteMetadataFailed { status: u16, body: String },

    #[error("VDS request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid VDS response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode VDS request: {0}")]
    Encoding(String),
}

/// Client for the two VizQL Data Service operations
///
/// Holds only the transport and the debug sink; token, URL and query are
/// supplied per call and nothing is shared between calls.
pub struct VdsClient<T> {
    transport: T,
    sink: Arc<dyn DebugSink>,
}

impl VdsClient<HttpTransport> {
    pub fn http() -> Self {
        VdsClient::new(HttpTransport::new())
    }
}

impl<T> VdsClient<T>
where
    T: Transport,
{
    pub fn new(transport: T) -> Self {
        VdsClient {
            transport,
            sink: Arc::new(LogSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.sink = sink;
        self
    }

    /// POST `{base_url}/api/v1/vizql-data-service/query-datasource`
    ///
    /// Legacy requests are adapted before anything is sent.
    pub async fn query_datasource(
        &self,
        token: &str,
        datasource_luid: &str,
        base_url: &str,
        request: impl Into<QueryRequest>,
        options: &CallOptions,
    ) -> Result<Value, VdsError> {
        let query = request.into().adapt();
        if query.fields.is_empty() {
            return Err(VdsError::EmptyQuery);
        }

        let payload = query_payload(datasource_luid, &query)?;
        let response = self
            .send(token, base_url, QUERY_DATASOURCE_PATH, "DEBUG VDS BODY", &payload, options)
            .await?;

        if !response.is_success() {
            return Err(VdsError::RemoteQueryFailed {
                status: response.status,
                body: response.body,
            });
        }
        parse_body(&response.body)
    }

    /// Same as [`VdsClient::query_datasource`] for a raw JSON request of
    /// either shape
    pub async fn query_datasource_json(
        &self,
        token: &str,
        datasource_luid: &str,
        base_url: &str,
        request: Value,
        options: &CallOptions,
    ) -> Result<Value, VdsError> {
        let request = QueryRequest::from_value(request)?;
        self.query_datasource(token, datasource_luid, base_url, request, options)
            .await
    }

    /// POST `{base_url}/api/v1/vizql-data-service/read-metadata`
    pub async fn read_metadata(
        &self,
        token: &str,
        datasource_luid: &str,
        base_url: &str,
        options: &CallOptions,
    ) -> Result<Value, VdsError> {
        let payload = metadata_payload(datasource_luid);
        let response = self
            .send(token, base_url, READ_METADATA_PATH, "DEBUG VDS METADATA BODY", &payload, options)
            .await?;

        if !response.is_success() {
            return Err(VdsError::RemoteMetadataFailed {
                status: response.status,
                body: response.body,
            });
        }
        parse_body(&response.body)
    }

    async fn send(
        &self,
        token: &str,
        base_url: &str,
        path: &str,
        label: &str,
        payload: &Value,
        options: &CallOptions,
    ) -> Result<TransportResponse, VdsError> {
        if token.is_empty() {
            return Err(VdsError::MissingToken);
        }

        let url = endpoint(base_url, path);
        if options.debug {
            let pretty = serde_json::to_string_pretty(payload)
                .map_err(|e| VdsError::Encoding(e.to_string()))?;
            self.sink
                .emit(label, truncate_chars(&pretty, MAX_ECHO_CHARS));
        }

        debug!("POST {}", url);
        let response = tokio::time::timeout(
            options.timeout,
            self.transport
                .post_json(&url, token, payload, options.timeout),
        )
        .await
        .map_err(|_| VdsError::Timeout(options.timeout))??;
        debug!("POST {} => {}", url, response.status);

        Ok(response)
    }
}

pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

pub fn query_payload(datasource_luid: &str, query: &Query) -> Result<Value, VdsError> {
    let query = serde_json::to_value(query).map_err(|e| VdsError::Encoding(e.to_string()))?;
    Ok(json!({
        "datasource": {"datasourceLuid": datasource_luid},
        "query": query,
        "options": {"returnFormat": "OBJECTS", "debug": true, "disaggregate": false}
    }))
}

pub fn metadata_payload(datasource_luid: &str) -> Value {
    json!({
        "datasource": {"datasourceLuid": datasource_luid},
        "options": {"debug": true}
    })
}

fn parse_body(body: &str) -> Result<Value, VdsError> {
    serde_json::from_str(body).map_err(|e| VdsError::InvalidResponse(e.to_string()))
}
