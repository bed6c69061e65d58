//! Single-domain reachability probe.
//!
//! The only signal used is "did any response arrive before the timeout".
//! Status codes and bodies are ignored: many walled-garden hosts answer
//! cross-origin requests with opaque or error responses, and those still
//! prove the path is open.

use crate::client::http::{HttpTransport, Method, RequestSpec};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Reachability of one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeStatus {
    /// Not probed yet, or first probe still running.
    Checking,
    /// Some response arrived.
    Reachable,
    /// Timed out or failed before any response.
    Blocked,
}

/// A domain the portal depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
    /// Host name, e.g. `fonts.gstatic.com`.
    pub domain: String,
    /// What the domain is for, shown next to its status.
    pub label: String,
}

impl ProbeTarget {
    /// Create a target.
    pub fn new(domain: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            label: label.into(),
        }
    }
}

/// Current status of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainProbe {
    /// Host name; stable identity across cycles.
    pub domain: String,
    /// Display label.
    pub label: String,
    /// Latest status.
    pub status: ProbeStatus,
    /// When `status` was last set by a probe.
    pub checked_at: Option<DateTime<Utc>>,
}

impl DomainProbe {
    /// Entry awaiting its first probe.
    pub fn checking(target: &ProbeTarget) -> Self {
        Self {
            domain: target.domain.clone(),
            label: target.label.clone(),
            status: ProbeStatus::Checking,
            checked_at: None,
        }
    }
}

/// One best-effort reachability check.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Probe `domain`; never fails, only reports.
    async fn probe(&self, domain: &str) -> ProbeStatus;
}

/// Probe that issues a bare GET to `https://<domain>/`.
pub struct HttpReachabilityProbe {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl HttpReachabilityProbe {
    /// Create a probe with a bounded per-domain timeout.
    pub fn new(transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }
}

/// URL probed for a domain; full URLs pass through.
pub fn probe_url(domain: &str) -> String {
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{}/", domain)
    }
}

#[async_trait]
impl ReachabilityProbe for HttpReachabilityProbe {
    async fn probe(&self, domain: &str) -> ProbeStatus {
        let url = probe_url(domain);
        let request = RequestSpec {
            method: Method::Get,
            headers: Vec::new(),
            body: None,
        };
        let outcome = tokio::time::timeout(
            self.timeout,
            self.transport.execute(&url, &request, self.timeout),
        )
        .await;

        match outcome {
            Ok(Ok(response)) => {
                debug!(domain, status = response.status, "probe answered");
                ProbeStatus::Reachable
            }
            Ok(Err(error)) => {
                debug!(domain, error = %error, "probe failed");
                ProbeStatus::Blocked
            }
            Err(_) => {
                debug!(domain, "probe timed out");
                ProbeStatus::Blocked
            }
        }
    }
}
