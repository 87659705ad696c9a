//! TCP port liveness probe.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::port::outbound::probe::PortProbe;

/// Treats a port as in use when a loopback connection succeeds within the
/// timeout. Refusals, errors and timeouts all mean free.
#[derive(Debug, Clone, Copy)]
pub struct TcpPortProbe {
    timeout: Duration,
}

impl TcpPortProbe {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PortProbe for TcpPortProbe {
    async fn in_use(&self, port: u16) -> bool {
        matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(("127.0.0.1", port))).await,
            Ok(Ok(_))
        )
    }
}
