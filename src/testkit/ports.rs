//! Port probe over a fixed set of busy ports.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::port::outbound::probe::PortProbe;

/// Reports exactly the configured ports as in use.
#[derive(Debug, Default)]
pub struct SetPortProbe {
    busy: HashSet<u16>,
}

impl SetPortProbe {
    pub fn busy(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            busy: ports.into_iter().collect(),
        }
    }

    /// Every port is free.
    pub fn idle() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortProbe for SetPortProbe {
    async fn in_use(&self, port: u16) -> bool {
        self.busy.contains(&port)
    }
}
