//! Auth flow controller - the main public API for Portalwarden.
//!
//! The `AuthFlowController` drives the portal flow:
//! - Registration, then one-time-code verification
//! - Login, then entitlement lookup
//! - Gateway logon once access is authorized
//!
//! Every remote call goes through the fallback client. Failures leave the
//! flow in the state it was in before the call and are recorded as a single
//! [`FlowError`]; transport failures additionally flag the network as
//! blocked and ask diagnostics for a fresh cycle.

use crate::client::fallback::FallbackRequestClient;
use crate::client::http::HttpTransport;
use crate::config::{OperatorSettings, PortalConfig};
use crate::diagnostics::monitor::DiagnosticsMonitor;
use crate::errors::ErrorKind;
use crate::flow::credentials::{Credentials, RegistrationProfile};
use crate::flow::state::{transition, FlowEvent, FlowState};
use crate::policy::entitlement::EntitlementRecord;
use crate::protocol::api::{steps, SubscriberApi};
use crate::uam::logon::GatewayLogon;
use crate::uam::params::NetworkAccessParameters;
use crate::PortalError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// The one message shown to the user after a failed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowError {
    /// Failure class.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// True when no network path reached the API.
    pub network_blocked: bool,
    /// Allow-list settings to offer for copying; only for blocked networks.
    pub operator_settings: Option<OperatorSettings>,
}

impl FlowError {
    fn from_error(error: &PortalError, config: &PortalConfig) -> Self {
        let message = match error {
            PortalError::PasswordMismatch => "Passwords do not match.".to_string(),
            PortalError::Rejected { detail, .. } => detail.clone(),
            PortalError::AllPathsUnreachable { .. } => format!(
                "Cannot reach the account server. The hotspot may be blocking it; \
                 make sure these domains are allowed: {}",
                config.walled_garden_csv()
            ),
            PortalError::Malformed { detail, .. } => {
                format!("The account server sent an unexpected response: {}", detail)
            }
            other => other.to_string(),
        };
        let network_blocked = error.is_network_blocked();
        Self {
            kind: error.kind(),
            message,
            network_blocked,
            operator_settings: network_blocked.then(|| config.operator_settings()),
        }
    }
}

/// Point-in-time view for rendering.
#[derive(Debug, Clone)]
pub struct FlowSnapshot {
    /// Current state.
    pub state: FlowState,
    /// Last failure, cleared when a new step starts.
    pub error: Option<FlowError>,
    /// Non-fatal information for the user.
    pub notice: Option<String>,
    /// Latest entitlement evaluation.
    pub entitlement: Option<EntitlementRecord>,
    /// Credentials to pre-fill the login form with.
    pub login_prefill: Option<Credentials>,
    /// Whether a submission is in flight.
    pub submitting: bool,
}

#[derive(Debug)]
struct Session {
    state: FlowState,
    token: Option<String>,
    active: Option<Credentials>,
    registered: Option<Credentials>,
    login_prefill: Option<Credentials>,
    entitlement: Option<EntitlementRecord>,
    error: Option<FlowError>,
    notice: Option<String>,
}

impl Session {
    fn new() -> Self {
        Self {
            state: FlowState::Login,
            token: None,
            active: None,
            registered: None,
            login_prefill: None,
            entitlement: None,
            error: None,
            notice: None,
        }
    }

    fn apply(&mut self, event: FlowEvent) -> Result<FlowState, PortalError> {
        let next = transition(self.state, event)?;
        info!(from = self.state.name(), to = next.name(), "flow transition");
        self.state = next;
        Ok(next)
    }

    fn require(&self, state: FlowState, action: &'static str) -> Result<(), PortalError> {
        if self.state == state {
            Ok(())
        } else {
            Err(PortalError::InvalidTransition {
                state: self.state.name(),
                action,
            })
        }
    }

    fn clear_session(&mut self) {
        self.token = None;
        self.active = None;
        self.entitlement = None;
    }
}

/// Clears the in-flight flag when the submission ends, even if its future is dropped.
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Captive-portal auth flow.
///
/// Create one per portal launch. Share it behind an `Arc` between the UI
/// and anything else that reads its state.
pub struct AuthFlowController {
    config: PortalConfig,
    api: SubscriberApi,
    transport: Arc<dyn HttpTransport>,
    network: NetworkAccessParameters,
    diagnostics: Option<Arc<DiagnosticsMonitor>>,
    session: Mutex<Session>,
    submitting: AtomicBool,
}

impl AuthFlowController {
    /// Create a controller for one portal launch.
    ///
    /// `launch_query` is the query string the gateway opened the portal with;
    /// it is parsed once here.
    ///
    /// # Errors
    /// Returns an error if configuration validation fails.
    pub fn new(
        config: PortalConfig,
        launch_query: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, PortalError> {
        config.validate()?;
        let client = FallbackRequestClient::from_config(&config, Arc::clone(&transport))?;
        let api = SubscriberApi::new(&config, client);
        let network = NetworkAccessParameters::extract(launch_query, &config.gateway);
        info!(
            gateway_ip = %network.gateway_ip,
            gateway_port = %network.gateway_port,
            "portal flow started"
        );

        Ok(Self {
            config,
            api,
            transport,
            network,
            diagnostics: None,
            session: Mutex::new(Session::new()),
            submitting: AtomicBool::new(false),
        })
    }

    /// Attach a diagnostics monitor to refresh after transport failures.
    ///
    /// The refresh request only wakes a running loop: start it with
    /// [`DiagnosticsMonitor::spawn`] when the flow starts, or use
    /// [`spawn_diagnostics`](Self::spawn_diagnostics).
    pub fn with_diagnostics(mut self, monitor: Arc<DiagnosticsMonitor>) -> Self {
        self.diagnostics = Some(monitor);
        self
    }

    /// Start the attached monitor's loop on the current runtime.
    ///
    /// Returns `None` when no monitor is attached.
    pub fn spawn_diagnostics(&self) -> Option<JoinHandle<()>> {
        self.diagnostics.as_ref().map(DiagnosticsMonitor::spawn)
    }

    /// Current state.
    pub async fn state(&self) -> FlowState {
        self.session.lock().await.state
    }

    /// Everything a UI needs to render.
    pub async fn snapshot(&self) -> FlowSnapshot {
        let session = self.session.lock().await;
        FlowSnapshot {
            state: session.state,
            error: session.error.clone(),
            notice: session.notice.clone(),
            entitlement: session.entitlement.clone(),
            login_prefill: session.login_prefill.clone(),
            submitting: self.is_submitting(),
        }
    }

    /// Whether a submission is in flight.
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Gateway parameters parsed from the launch URL.
    pub fn network_parameters(&self) -> &NetworkAccessParameters {
        &self.network
    }

    /// Allow-list settings for operators.
    pub fn operator_settings(&self) -> OperatorSettings {
        self.config.operator_settings()
    }

    /// Current configuration.
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    fn begin_submit(&self) -> Result<SubmitGuard<'_>, PortalError> {
        self.submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PortalError::SubmissionInFlight)?;
        Ok(SubmitGuard(&self.submitting))
    }

    /// Enter a step: check the state, clear the previous message.
    async fn enter(&self, state: FlowState, action: &'static str) -> Result<(), PortalError> {
        let mut session = self.session.lock().await;
        session.require(state, action)?;
        session.error = None;
        session.notice = None;
        Ok(())
    }

    /// Record a failed step and hand the error back.
    async fn fail(&self, error: PortalError) -> PortalError {
        let flow_error = FlowError::from_error(&error, &self.config);
        warn!(kind = ?flow_error.kind, error = %error, "flow step failed");

        if flow_error.network_blocked {
            if let Some(monitor) = &self.diagnostics {
                monitor.request_refresh();
            }
        }

        self.session.lock().await.error = Some(flow_error);
        error
    }

    /// Move between the login and registration forms.
    pub async fn show_registration(&self) -> Result<FlowState, PortalError> {
        self.navigate(FlowEvent::ShowRegistration).await
    }

    /// Move back from registration to the login form.
    pub async fn show_login(&self) -> Result<FlowState, PortalError> {
        self.navigate(FlowEvent::ShowLogin).await
    }

    async fn navigate(&self, event: FlowEvent) -> Result<FlowState, PortalError> {
        if self.is_submitting() {
            return Err(PortalError::SubmissionInFlight);
        }
        let mut session = self.session.lock().await;
        let next = session.apply(event)?;
        session.error = None;
        session.notice = None;
        Ok(next)
    }

    /// Submit the registration form.
    ///
    /// Passwords are compared locally first; a mismatch never reaches the
    /// network. On success the session token is stored, a one-time code is
    /// requested with it, and the flow moves to `OtpVerification`.
    pub async fn submit_registration(
        &self,
        profile: &RegistrationProfile,
    ) -> Result<FlowState, PortalError> {
        let _guard = self.begin_submit()?;
        self.enter(FlowState::Registration, "register").await?;

        if let Err(e) = profile.validate() {
            return Err(self.fail(e).await);
        }

        let payload = profile.payload(self.config.plan_id.as_deref());
        let token = match self.api.register(&payload).await {
            Ok(token) => token,
            Err(e) => return Err(self.fail(e).await),
        };
        info!(identifier = %payload.username, "account registered");

        // The code request must only follow a registration that returned a token.
        let notice = match self.api.request_otp(&token).await {
            Ok(()) => None,
            Err(e) if e.is_network_blocked() => return Err(self.fail(e).await),
            Err(e) => {
                warn!(error = %e, "verification code request rejected");
                Some(format!(
                    "Your account was created but the verification code could not be sent ({}). \
                     Request a new code.",
                    e
                ))
            }
        };

        let mut session = self.session.lock().await;
        let next = session.apply(FlowEvent::Registered)?;
        let credentials = profile.credentials();
        session.token = Some(token);
        session.active = Some(credentials.clone());
        session.registered = Some(credentials);
        session.entitlement = None;
        session.notice = notice;
        Ok(next)
    }

    /// Ask for another one-time code.
    pub async fn resend_otp(&self) -> Result<FlowState, PortalError> {
        let _guard = self.begin_submit()?;
        self.enter(FlowState::OtpVerification, "resend code").await?;
        let token = self.current_token(steps::OTP_REQUEST).await?;

        if let Err(e) = self.api.request_otp(&token).await {
            return Err(self.fail(e).await);
        }

        let mut session = self.session.lock().await;
        session.notice = Some("A new verification code has been sent.".to_string());
        Ok(session.state)
    }

    /// Submit the one-time code.
    ///
    /// On success the flow moves to `Login`, pre-filled with the
    /// registration credentials.
    pub async fn submit_otp(&self, code: &str) -> Result<FlowState, PortalError> {
        let _guard = self.begin_submit()?;
        self.enter(FlowState::OtpVerification, "verify code").await?;
        let token = self.current_token(steps::OTP_VERIFY).await?;

        if let Err(e) = self.api.verify_otp(&token, code.trim()).await {
            return Err(self.fail(e).await);
        }

        let mut session = self.session.lock().await;
        let next = session.apply(FlowEvent::OtpVerified)?;
        session.login_prefill = session.registered.clone();
        Ok(next)
    }

    async fn current_token(&self, step: &'static str) -> Result<String, PortalError> {
        let token = self.session.lock().await.token.clone();
        match token {
            Some(token) => Ok(token),
            None => Err(self.fail(PortalError::MissingToken { step }).await),
        }
    }

    /// Submit the login form.
    ///
    /// A successful login replaces any previous token, then the usage lookup
    /// decides between `Authorized` and `NoEntitlement`. A failed lookup
    /// discards the new token and returns to `Login`.
    pub async fn submit_login(&self, credentials: &Credentials) -> Result<FlowState, PortalError> {
        let _guard = self.begin_submit()?;
        {
            let mut session = self.session.lock().await;
            session.require(FlowState::Login, "log in")?;
            session.error = None;
            session.notice = None;
            // A fresh login never reuses the previous session's token.
            session.clear_session();
        }

        let token = match self.api.login(&credentials.login_payload()).await {
            Ok(token) => token,
            Err(e) => return Err(self.fail(e).await),
        };
        info!(identifier = %credentials.identifier(), "logged in");

        // State only moves once the lookup has settled, and then in one
        // locked section, so a dropped submission leaves the flow in `Login`.
        let lookup = self.api.usage(&token).await;

        let mut session = self.session.lock().await;
        session.apply(FlowEvent::LoggedIn)?;
        let usage = match lookup {
            Ok(usage) => usage,
            Err(e) => {
                session.apply(FlowEvent::LookupFailed)?;
                drop(session);
                return Err(self.fail(e).await);
            }
        };

        let record = EntitlementRecord::from_usage(&usage, self.config.data_floor_bytes);
        let decision = record.decision();
        info!(?decision, remaining_mb = %record.remaining_mb(), "entitlement evaluated");

        let next = session.apply(FlowEvent::Entitlement(decision))?;
        session.token = Some(token);
        session.active = Some(credentials.clone());
        session.entitlement = Some(record);
        Ok(next)
    }

    /// Leave `NoEntitlement` for a fresh login.
    pub async fn switch_account(&self) -> Result<FlowState, PortalError> {
        let mut session = self.session.lock().await;
        let next = session.apply(FlowEvent::SwitchAccount)?;
        session.clear_session();
        session.login_prefill = None;
        session.error = None;
        session.notice = None;
        Ok(next)
    }

    /// Build the gateway logon for the active credentials and end the flow.
    ///
    /// The caller navigates to [`GatewayLogon::url`]; use
    /// [`activate_and_dispatch`](Self::activate_and_dispatch) to issue it directly.
    pub async fn activate(&self) -> Result<GatewayLogon, PortalError> {
        let mut session = self.session.lock().await;
        session.require(FlowState::Authorized, "activate")?;
        let credentials = session
            .active
            .clone()
            .ok_or(PortalError::MissingToken { step: "activation" })?;

        let logon = GatewayLogon::build(&self.network, &credentials)?;
        session.apply(FlowEvent::Activate)?;
        Ok(logon)
    }

    /// Activate and fire the logon at the gateway, best effort.
    pub async fn activate_and_dispatch(&self) -> Result<GatewayLogon, PortalError> {
        let logon = self.activate().await?;
        logon
            .dispatch(self.transport.as_ref(), self.config.attempt_timeout())
            .await;
        Ok(logon)
    }
}
