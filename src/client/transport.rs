use super::VdsError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const AUTH_HEADER: &str = "X-Tableau-Auth";

/// Raw outcome of a single HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport issues one authenticated JSON POST and hands back the raw response
///
/// Non-2xx statuses are not errors at this level; the client decides
/// what they mean.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<TransportResponse, VdsError>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<TransportResponse, VdsError> {
        (**self).post_json(url, token, body, timeout).await
    }
}

#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        HttpTransport { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<TransportResponse, VdsError> {
        // .json() also sets Content-Type: application/json
        let response = self
            .client
            .post(url)
            .header(AUTH_HEADER, token)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        Ok(TransportResponse { status, body })
    }
}

fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> VdsError {
    if e.is_timeout() {
        VdsError::Timeout(timeout)
    } else {
        VdsError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case::ok(200, true)]
    #[case::created(201, true)]
    #[case::no_content(204, true)]
    #[case::redirect(302, false)]
    #[case::unauthorized(401, false)]
    #[case::server_error(500, false)]
    fn test_is_success(#[case] status: u16, #[case] expected: bool) {
        let response = TransportResponse {
            status,
            body: String::new(),
        };
        assert_eq!(response.is_success(), expected);
    }

    #[test_log::test(tokio::test)]
    async fn test_connection_refused_is_transport_error() {
        // Port 9 (discard) is not listening on loopback in test environments.
        let transport = HttpTransport::new();
        let result = transport
            .post_json(
                "http://127.0.0.1:9/api/v1/vizql-data-service/read-metadata",
                "token",
                &Value::Null,
                Duration::from_secs(5),
            )
            .await;

        assert!(matches!(
            result,
            Err(VdsError::Transport(_)) | Err(VdsError::Timeout(_))
        ));
    }
}
