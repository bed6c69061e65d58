//! Subscriber API calls.
//!
//! Every call goes through the [`FallbackRequestClient`]. HTTP-level errors
//! become `Rejected`, unusable success bodies become `Malformed`, and
//! transport failures surface unchanged as `AllPathsUnreachable`.

use crate::client::fallback::FallbackRequestClient;
use crate::client::http::RequestSpec;
use crate::config::PortalConfig;
use crate::protocol::models::{
    LoginPayload, RegistrationPayload, ResponseBody, TokenResponse, UsageResponse, VerifyPayload,
};
use crate::PortalError;
use tracing::debug;

/// Endpoint paths relative to the API base URL.
pub mod endpoints {
    /// Registration.
    pub const REGISTER: &str = "";
    /// Login; returns a bearer token.
    pub const LOGIN: &str = "token/";
    /// Quota usage.
    pub const USAGE: &str = "usage/";
    /// Request a one-time code.
    pub const OTP_REQUEST: &str = "phone/token/";
    /// Verify a one-time code.
    pub const OTP_VERIFY: &str = "phone/verify/";
}

/// Flow step names used in errors and logs.
pub mod steps {
    /// Registration.
    pub const REGISTER: &str = "registration";
    /// Login.
    pub const LOGIN: &str = "login";
    /// Usage lookup.
    pub const USAGE: &str = "usage lookup";
    /// One-time code request.
    pub const OTP_REQUEST: &str = "verification code request";
    /// One-time code verification.
    pub const OTP_VERIFY: &str = "verification";
}

/// Message shown when the server gives no readable detail.
fn generic_message(step: &'static str) -> &'static str {
    match step {
        steps::REGISTER => "Registration failed.",
        steps::LOGIN => "Invalid login details.",
        steps::OTP_VERIFY => "Invalid verification code.",
        steps::OTP_REQUEST => "Could not send a verification code.",
        _ => "Could not read your data balance.",
    }
}

/// Client for the remote subscriber-management API.
#[derive(Clone)]
pub struct SubscriberApi {
    client: FallbackRequestClient,
    base_url: String,
}

impl SubscriberApi {
    /// Create an API client rooted at `config.api_base_url`.
    pub fn new(config: &PortalConfig, client: FallbackRequestClient) -> Self {
        Self {
            client,
            base_url: config.api_base_url.clone(),
        }
    }

    fn url(&self, relative: &str) -> String {
        format!("{}{}", self.base_url, relative)
    }

    /// Send, then split the outcome into success body or classified error.
    async fn call(
        &self,
        step: &'static str,
        relative: &str,
        request: RequestSpec,
    ) -> Result<ResponseBody, PortalError> {
        let response = self.client.send(&self.url(relative), &request).await?;
        let body = ResponseBody::parse(&response);
        debug!(step, status = response.status, "api response");

        if response.is_success() {
            return Ok(body);
        }

        Err(PortalError::Rejected {
            step,
            status: response.status,
            detail: body
                .detail(response.status)
                .unwrap_or_else(|| generic_message(step).to_string()),
        })
    }

    /// Success body must be JSON.
    fn require_json(
        step: &'static str,
        body: ResponseBody,
    ) -> Result<ResponseBody, PortalError> {
        match body {
            ResponseBody::Text(text) => Err(PortalError::Malformed {
                step,
                detail: if text.trim().is_empty() {
                    "empty response body".to_string()
                } else {
                    text
                },
            }),
            json => Ok(json),
        }
    }

    fn bearer_from(step: &'static str, body: ResponseBody) -> Result<String, PortalError> {
        let body = Self::require_json(step, body)?;
        body.decode::<TokenResponse>()
            .and_then(|t| t.bearer().map(String::from))
            .ok_or(PortalError::MissingToken { step })
    }

    /// Register an account; returns the session token.
    pub async fn register(&self, payload: &RegistrationPayload) -> Result<String, PortalError> {
        let body = self
            .call(
                steps::REGISTER,
                endpoints::REGISTER,
                RequestSpec::post_json(payload)?,
            )
            .await?;
        Self::bearer_from(steps::REGISTER, body)
    }

    /// Log in; returns the session token.
    pub async fn login(&self, payload: &LoginPayload) -> Result<String, PortalError> {
        let body = self
            .call(steps::LOGIN, endpoints::LOGIN, RequestSpec::post_json(payload)?)
            .await?;
        Self::bearer_from(steps::LOGIN, body)
    }

    /// Fetch quota usage for the session.
    pub async fn usage(&self, token: &str) -> Result<UsageResponse, PortalError> {
        let body = self
            .call(steps::USAGE, endpoints::USAGE, RequestSpec::get().bearer(token))
            .await?;
        let body = Self::require_json(steps::USAGE, body)?;
        body.decode::<UsageResponse>()
            .ok_or_else(|| PortalError::Malformed {
                step: steps::USAGE,
                detail: "usage response has an unexpected shape".to_string(),
            })
    }

    /// Ask the API to send a one-time code to the account's phone.
    pub async fn request_otp(&self, token: &str) -> Result<(), PortalError> {
        self.call(
            steps::OTP_REQUEST,
            endpoints::OTP_REQUEST,
            RequestSpec::post_empty().bearer(token),
        )
        .await
        .map(|_| ())
    }

    /// Verify a one-time code.
    pub async fn verify_otp(&self, token: &str, code: &str) -> Result<(), PortalError> {
        let payload = VerifyPayload {
            code: code.to_string(),
        };
        self.call(
            steps::OTP_VERIFY,
            endpoints::OTP_VERIFY,
            RequestSpec::post_json(&payload)?.bearer(token),
        )
        .await
        .map(|_| ())
    }
}
