//! Scripted readiness probe.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::port::outbound::probe::{HealthCheck, Probe};

/// A probe whose URLs become ready after a fixed number of calls.
///
/// A URL scripted with `n` reports ready from its `n`-th call onwards.
/// URLs without a script use the fallback threshold, if any, and are
/// otherwise never ready.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    thresholds: HashMap<String, u32>,
    fallback: Option<u32>,
    calls: Mutex<HashMap<String, u32>>,
    tokens: Mutex<HashMap<String, Option<String>>>,
}

impl ScriptedProbe {
    /// Nothing is ever ready.
    pub fn never() -> Self {
        Self::default()
    }

    /// Everything is ready on the first call.
    pub fn always() -> Self {
        Self::ready_after_any(1)
    }

    /// Every URL is ready from its `n`-th call.
    pub fn ready_after_any(n: u32) -> Self {
        Self {
            fallback: Some(n),
            ..Self::default()
        }
    }

    pub fn ready_after(url: impl Into<String>, n: u32) -> Self {
        Self::never().with_ready_after(url, n)
    }

    #[must_use]
    pub fn with_ready_after(mut self, url: impl Into<String>, n: u32) -> Self {
        self.thresholds.insert(url.into(), n);
        self
    }

    /// Number of probes made against `url`.
    pub fn calls(&self, url: &str) -> u32 {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }

    /// Total probes across all URLs.
    pub fn total_calls(&self) -> u32 {
        self.calls.lock().values().sum()
    }

    /// Bearer token sent with the last probe of `url`.
    pub fn last_token(&self, url: &str) -> Option<String> {
        self.tokens.lock().get(url).cloned().flatten()
    }

    /// Every URL probed so far.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.calls.lock().keys().cloned().collect();
        urls.sort();
        urls
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn ready(&self, check: &HealthCheck) -> bool {
        let count = {
            let mut calls = self.calls.lock();
            let count = calls.entry(check.url.clone()).or_insert(0);
            *count += 1;
            *count
        };
        self.tokens.lock().insert(
            check.url.clone(),
            check.token.as_ref().map(|t| t.expose().to_string()),
        );
        match self.thresholds.get(&check.url).copied().or(self.fallback) {
            Some(threshold) => count >= threshold,
            None => false,
        }
    }
}
