//! Ordered-fallback request client.
//!
//! One logical request, many possible network paths. Paths are tried in
//! configured order on every call; the first path that yields any HTTP
//! response wins, including 4xx/5xx responses. Only transport failures
//! (refused, DNS, timeout) move on to the next path.

use crate::client::http::{HttpResponse, HttpTransport, RequestSpec};
use crate::client::path::PathTemplate;
use crate::config::PortalConfig;
use crate::errors::{TransportError, TransportErrorKind};
use crate::PortalError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sends one logical request through an ordered list of network paths.
#[derive(Clone)]
pub struct FallbackRequestClient {
    paths: Vec<PathTemplate>,
    transport: Arc<dyn HttpTransport>,
    attempt_timeout: Duration,
}

impl FallbackRequestClient {
    /// Create a client over a non-empty path list.
    pub fn new(
        paths: Vec<PathTemplate>,
        transport: Arc<dyn HttpTransport>,
        attempt_timeout: Duration,
    ) -> Result<Self, PortalError> {
        if paths.is_empty() {
            return Err(PortalError::ConfigError(
                "fallback client needs at least one path".to_string(),
            ));
        }
        Ok(Self {
            paths,
            transport,
            attempt_timeout,
        })
    }

    /// Create a client from the configured path list and attempt timeout.
    pub fn from_config(
        config: &PortalConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, PortalError> {
        Self::new(
            config.fallback_paths.clone(),
            transport,
            config.attempt_timeout(),
        )
    }

    /// Send `request` to `target_url`.
    ///
    /// # Errors
    /// `AllPathsUnreachable` when every path failed at the transport level,
    /// carrying the last transport error. HTTP error statuses are not errors
    /// here; they come back as the `Ok` response.
    pub async fn send(
        &self,
        target_url: &str,
        request: &RequestSpec,
    ) -> Result<HttpResponse, PortalError> {
        let mut last_error = None;

        for (attempt, path) in self.paths.iter().enumerate() {
            let url = path.wrap(target_url);
            let outcome = tokio::time::timeout(
                self.attempt_timeout,
                self.transport.execute(&url, request, self.attempt_timeout),
            )
            .await
            .unwrap_or_else(|_| {
                Err(TransportError::timeout(format!(
                    "no response within {:?}",
                    self.attempt_timeout
                )))
            });

            match outcome {
                Ok(response) => {
                    debug!(
                        path = path.label(),
                        attempt,
                        status = response.status,
                        "response received"
                    );
                    return Ok(response);
                }
                Err(error) => {
                    warn!(path = path.label(), attempt, error = %error, "path failed");
                    last_error = Some(error);
                }
            }
        }

        Err(PortalError::AllPathsUnreachable {
            attempts: self.paths.len(),
            last_error: last_error.unwrap_or_else(|| {
                TransportError::new(TransportErrorKind::Other, "no paths attempted")
            }),
        })
    }

    /// Configured paths, in priority order.
    pub fn paths(&self) -> &[PathTemplate] {
        &self.paths
    }

    /// Per-attempt timeout.
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Underlying transport.
    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.transport)
    }
}
