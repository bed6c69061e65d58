//! Gateway logon hand-off.
//!
//! The gateway grants access when the device issues
//! `GET http://<uamip>:<uamport>/logon?username=<u>&password=<p>`.
//! Parameter names, order and method are fixed by the gateway software.

use crate::client::http::{HttpTransport, Method, RequestSpec};
use crate::flow::credentials::Credentials;
use crate::uam::params::NetworkAccessParameters;
use crate::PortalError;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// A ready-to-follow gateway logon request.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayLogon {
    url: Url,
}

impl std::fmt::Debug for GatewayLogon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The query carries the password.
        f.debug_struct("GatewayLogon")
            .field("endpoint", &self.endpoint())
            .finish()
    }
}

impl GatewayLogon {
    /// Build the logon URL for these gateway parameters and credentials.
    pub fn build(
        params: &NetworkAccessParameters,
        credentials: &Credentials,
    ) -> Result<Self, PortalError> {
        let base = format!(
            "http://{}:{}/logon",
            params.gateway_ip, params.gateway_port
        );
        let mut url = Url::parse(&base).map_err(|e| {
            PortalError::ConfigError(format!("Invalid gateway address {}: {}", base, e))
        })?;
        url.query_pairs_mut()
            .append_pair("username", credentials.identifier())
            .append_pair("password", credentials.secret());
        Ok(Self { url })
    }

    /// Full URL including credentials; navigate here.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Always GET.
    pub fn method(&self) -> &'static str {
        "GET"
    }

    /// URL without the query, safe to log.
    pub fn endpoint(&self) -> String {
        let mut bare = self.url.clone();
        bare.set_query(None);
        bare.to_string()
    }

    /// Fire the logon at the gateway and ignore the outcome.
    ///
    /// The gateway intercepts the request and usually answers with a
    /// redirect or drops the connection once access opens, so neither
    /// response nor failure says anything reliable.
    pub async fn dispatch(&self, transport: &dyn HttpTransport, timeout: Duration) {
        info!(endpoint = %self.endpoint(), "submitting gateway logon");
        let request = RequestSpec {
            method: Method::Get,
            headers: Vec::new(),
            body: None,
        };
        match transport.execute(self.url(), &request, timeout).await {
            Ok(response) => debug!(status = response.status, "gateway answered logon"),
            Err(error) => debug!(error = %error, "gateway logon not answered"),
        }
    }
}
