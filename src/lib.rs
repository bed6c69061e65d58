//! # Portalwarden
//!
//! **Captive-portal client for hotspot gateways behind a walled garden.**
//!
//! Portalwarden drives a subscriber through registration, one-time-code
//! verification, login and entitlement checks against a remote account API,
//! then hands the authorized credentials to the local UAM gateway.
//!
//! ## Features
//!
//! - **Fallback request paths** - every API call tries a configured list of
//!   relays and the direct route, in order, until one answers
//! - **Explicit flow state machine** - only listed transitions are possible
//! - **Data entitlement check** - accounts below the data floor are refused
//! - **Walled-garden diagnostics** - periodic, concurrent reachability probes
//! - **UAM parameter extraction** - gateway address recovered from the launch URL
//!
//! ## Quickstart
//!
//! ```no_run
//! use portalwarden::{AuthFlowController, Credentials, PortalConfig, ReqwestTransport};
//! use std::sync::Arc;
//!
//! async fn run() -> Result<(), portalwarden::PortalError> {
//!     let config = PortalConfig {
//!         api_base_url: "https://accounts.example.com/api/v1/radius/organization/hotspot/account/"
//!             .to_string(),
//!         ..PortalConfig::default()
//!     };
//!     let transport = Arc::new(ReqwestTransport::new(&config.user_agent)?);
//!     let flow = AuthFlowController::new(config, "uamip=10.1.0.1&uamport=3990", transport)?;
//!
//!     flow.submit_login(&Credentials::new("0821234567", "secret")).await?;
//!     let logon = flow.activate().await?;
//!     println!("open {}", logon.url());
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! - Validation failures never reach the network
//! - HTTP errors from the API are final for that step; no other path is tried
//! - Only when every path fails to answer is the network reported as blocked,
//!   together with the domains the operator must allow
//!
//! See [`PortalConfig`] for configuration.

#![deny(warnings)]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/portalwarden/0.1.0")]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Transport layer
pub mod client;

// Protocol layer
pub mod protocol;

// Policy layer
pub mod policy;

// Gateway hand-off
pub mod uam;

// Walled-garden diagnostics
pub mod diagnostics;

// Flow controller (main public API)
pub mod flow;

// Re-exports for public API
pub use client::fallback::FallbackRequestClient;
pub use client::http::{HttpTransport, ReqwestTransport};
pub use client::path::PathTemplate;
pub use clock::{Clock, SystemClock};
pub use config::{OperatorSettings, PortalConfig};
pub use diagnostics::monitor::DiagnosticsMonitor;
pub use diagnostics::probe::{DomainProbe, ProbeStatus, ProbeTarget, ReachabilityProbe};
pub use errors::{ErrorKind, PortalError, TransportError};
pub use flow::controller::{AuthFlowController, FlowError, FlowSnapshot};
pub use flow::credentials::{Credentials, RegistrationProfile};
pub use flow::state::FlowState;
pub use policy::entitlement::{EntitlementDecision, EntitlementRecord};
pub use uam::logon::GatewayLogon;
pub use uam::params::NetworkAccessParameters;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
