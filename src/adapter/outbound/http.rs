//! HTTP readiness probe.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::trace;

use crate::error::{Error, Result};
use crate::port::outbound::probe::{HealthCheck, Probe};

/// [`Probe`] issuing one `GET` per attempt.
///
/// Only a 2xx response counts as ready.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(client_error)?;
        Ok(Self { client })
    }
}

fn client_error(source: reqwest::Error) -> Error {
    Error::HttpClient {
        purpose: "readiness probe",
        source,
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn ready(&self, check: &HealthCheck) -> bool {
        let mut request = self.client.get(&check.url);
        if let Some(token) = &check.token {
            request = request.bearer_auth(token.expose());
        }
        match request.send().await {
            Ok(response) => {
                trace!(url = %check.url, status = %response.status(), "Probe answered");
                response.status().is_success()
            }
            Err(e) => {
                trace!(url = %check.url, error = %e, "Probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one request with a fixed status line.
    async fn serve_once(status: &'static str) -> (u16, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let response = format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });
        (port, handle)
    }

    #[tokio::test]
    async fn success_status_is_ready_and_sends_token() {
        let (port, server) = serve_once("200 OK").await;
        let probe = HttpProbe::new(Duration::from_secs(2)).unwrap();
        let check = HealthCheck::new(format!("http://127.0.0.1:{port}/v1/models"))
            .with_token(crate::domain::Credential::new("tok"));

        assert!(probe.ready(&check).await);
        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /v1/models"), "{request}");
        assert!(request.contains("authorization: bearer tok"), "{request}");
    }

    #[tokio::test]
    async fn error_status_is_not_ready() {
        let (port, server) = serve_once("503 Service Unavailable").await;
        let probe = HttpProbe::new(Duration::from_secs(2)).unwrap();

        assert!(!probe.ready(&HealthCheck::new(format!("http://127.0.0.1:{port}/health"))).await);
        server.await.unwrap();
    }

    #[test]
    fn client_failure_is_not_a_registry_error() {
        let source = Client::new().get("not a url").build().unwrap_err();
        let err = client_error(source);
        assert!(matches!(err, Error::HttpClient { purpose: "readiness probe", .. }));
        assert!(err.to_string().starts_with("failed to build readiness probe HTTP client"));
    }

    #[tokio::test]
    async fn refused_connection_is_not_ready() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = HttpProbe::new(Duration::from_millis(500)).unwrap();
        assert!(!probe.ready(&HealthCheck::new(format!("http://127.0.0.1:{port}/health"))).await);
    }
}
