//! Readiness and port-liveness probes.

use async_trait::async_trait;

use crate::domain::Credential;

/// One readiness check: an URL and an optional bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub url: String,
    pub token: Option<Credential>,
}

impl HealthCheck {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: Credential) -> Self {
        self.token = Some(token);
        self
    }
}

/// A single readiness attempt against an HTTP endpoint.
///
/// Any outcome other than a definitive success (refused connection,
/// timeout, non-success status) is reported as `false`.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn ready(&self, check: &HealthCheck) -> bool;
}

/// A single point-in-time check of whether a local TCP port accepts
/// connections.
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// `true` when something accepted a connection on `port`.
    async fn in_use(&self, port: u16) -> bool;
}
