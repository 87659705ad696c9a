//! HTTP client for the model registry service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;
use url::Url;

use crate::domain::{EntryPatch, NewEntry, RegistryEntry};
use crate::error::{Error, RegistryError, Result};
use crate::port::outbound::registry::Registry;

/// Collection path under the registry base URL.
const MODELS_PATH: &str = "api/models";

/// [`Registry`] over the registry's REST API.
///
/// Every request carries the management token as a bearer credential.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: Client,
    base: Url,
    token: String,
}

impl HttpRegistry {
    /// # Errors
    ///
    /// Returns [`RegistryError::Url`] if `base_url` does not parse, or
    /// [`Error::HttpClient`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url).map_err(RegistryError::Url)?;
        // Keep any path prefix when joining relative paths.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| Error::HttpClient {
                purpose: "registry",
                source,
            })?;
        Ok(Self {
            client,
            base,
            token: token.into(),
        })
    }

    pub(crate) fn collection_url(&self) -> Result<Url> {
        Ok(self.base.join(MODELS_PATH).map_err(RegistryError::Url)?)
    }

    pub(crate) fn entry_url(&self, id: &str) -> Result<Url> {
        let mut url = self.collection_url()?;
        url.path_segments_mut()
            .map_err(|()| RegistryError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(id);
        Ok(url)
    }

    async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| RegistryError::Transport { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                operation,
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(response)
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn find_by_name(&self, name: &str) -> Result<Vec<RegistryEntry>> {
        let url = self.collection_url()?;
        debug!(%url, name, "Looking up registry entries");
        let entries: Vec<RegistryEntry> = self
            .send("lookup", self.client.get(url).query(&[("name", name)]))
            .await?
            .json()
            .await
            .map_err(|source| RegistryError::Transport {
                operation: "lookup",
                source,
            })?;
        // The service may match loosely; only exact names count.
        Ok(entries.into_iter().filter(|e| e.name == name).collect())
    }

    async fn create(&self, entry: &NewEntry) -> Result<RegistryEntry> {
        let url = self.collection_url()?;
        debug!(%url, name = %entry.name, "Creating registry entry");
        let created = self
            .send("create", self.client.post(url).json(entry))
            .await?
            .json()
            .await
            .map_err(|source| RegistryError::Transport {
                operation: "create",
                source,
            })?;
        Ok(created)
    }

    async fn patch(&self, id: &str, patch: &EntryPatch) -> Result<()> {
        let url = self.entry_url(id)?;
        debug!(%url, "Patching registry entry");
        self.send("patch", self.client.patch(url).json(patch)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn registry(base: &str) -> HttpRegistry {
        HttpRegistry::new(base, "mgmt", Duration::from_secs(1)).unwrap()
    }

    /// Serve exactly one request with a fixed status and JSON body.
    ///
    /// Resolves to the raw request, body included.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (base, handle)
    }

    #[tokio::test]
    async fn lookup_sends_token_and_name_and_keeps_exact_matches() {
        let (base, server) = serve_once(
            "200 OK",
            r#"[
                {"id": "1", "name": "llama", "upstream_url": "http://a/v1"},
                {"id": "2", "name": "llama-70b", "upstream_url": "http://b/v1"}
            ]"#,
        )
        .await;

        let entries = registry(&base).find_by_name("llama").await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "1");
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/models?name=llama "), "{request}");
        assert!(
            request.to_lowercase().contains("authorization: bearer mgmt"),
            "{request}"
        );
    }

    #[tokio::test]
    async fn create_posts_full_entry() {
        let (base, server) = serve_once(
            "201 Created",
            r#"{"id": "new-1", "name": "m", "upstream_url": "http://h:1/v1", "api_key": "k", "provider": "openai"}"#,
        )
        .await;

        let created = registry(&base)
            .create(&NewEntry {
                name: "m".to_string(),
                upstream_url: "http://h:1/v1".to_string(),
                api_key: "k".to_string(),
                provider: "openai".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(created.id, "new-1");
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/models "), "{request}");
        assert!(request.contains(r#""provider":"openai""#), "{request}");
        assert!(request.contains(r#""name":"m""#), "{request}");
    }

    #[tokio::test]
    async fn patch_targets_entry_path() {
        let (base, server) = serve_once("200 OK", "{}").await;

        registry(&base)
            .patch(
                "abc-123",
                &EntryPatch {
                    upstream_url: "http://h:2/v1".to_string(),
                    api_key: "fresh".to_string(),
                },
            )
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("PATCH /api/models/abc-123 "), "{request}");
        assert!(request.contains(r#""api_key":"fresh""#), "{request}");
        assert!(
            request.to_lowercase().contains("authorization: bearer mgmt"),
            "{request}"
        );
    }

    #[tokio::test]
    async fn rejected_request_maps_to_status_error() {
        let (base, server) = serve_once("403 Forbidden", r#"{"error":"bad token"}"#).await;

        let err = registry(&base)
            .patch(
                "abc-123",
                &EntryPatch {
                    upstream_url: "http://h:2/v1".to_string(),
                    api_key: "k".to_string(),
                },
            )
            .await
            .unwrap_err();

        match err {
            Error::Registry(RegistryError::Status {
                operation,
                status,
                body,
            }) => {
                assert_eq!(operation, "patch");
                assert_eq!(status, 403);
                assert!(body.contains("bad token"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[test]
    fn urls_join_under_base_path() {
        let r = registry("http://registry.local:3000");
        assert_eq!(
            r.collection_url().unwrap().as_str(),
            "http://registry.local:3000/api/models"
        );

        let prefixed = registry("https://gw.example.com/llm");
        assert_eq!(
            prefixed.collection_url().unwrap().as_str(),
            "https://gw.example.com/llm/api/models"
        );
        assert_eq!(
            prefixed.entry_url("abc-123").unwrap().as_str(),
            "https://gw.example.com/llm/api/models/abc-123"
        );
    }

    #[test]
    fn entry_ids_are_escaped() {
        let r = registry("http://registry.local/");
        assert_eq!(
            r.entry_url("a/b").unwrap().as_str(),
            "http://registry.local/api/models/a%2Fb"
        );
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert!(HttpRegistry::new("not a url", "t", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn entries_tolerate_unknown_and_missing_fields() {
        let json = r#"[
            {"id": "1", "name": "M", "upstream_url": "http://h/v1", "created_at": "x"},
            {"id": "2", "name": "M", "upstream_url": "http://h/v1", "api_key": "k", "provider": "openai"}
        ]"#;
        let entries: Vec<RegistryEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].api_key, "");
        assert_eq!(entries[1].provider, "openai");
    }

    #[test]
    fn patch_body_only_carries_endpoint_and_key() {
        let body = serde_json::to_value(EntryPatch {
            upstream_url: "http://h:1/v1".to_string(),
            api_key: "k".to_string(),
        })
        .unwrap();
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["api_key", "upstream_url"]);
    }
}
