//! Portal login example.
//!
//! Logs in against the configured account API, checks the data balance and
//! sends the logon to the gateway.
//!
//! # Running
//!
//! ```bash
//! export PORTAL_USERNAME="0821234567"
//! export PORTAL_PASSWORD="your-password"
//! export PORTAL_LAUNCH_QUERY="uamip=10.1.0.1&uamport=3990"   # optional
//! cargo run --example portal_login
//! ```
//!
//! Settings are read from the platform config directory
//! (`portalwarden/portal.json`) when present, defaults otherwise.

use portalwarden::{
    AuthFlowController, Credentials, FlowState, PortalConfig, PortalError, ReqwestTransport,
};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let username = std::env::var("PORTAL_USERNAME").expect("Set PORTAL_USERNAME environment variable");
    let password = std::env::var("PORTAL_PASSWORD").expect("Set PORTAL_PASSWORD environment variable");
    let launch_query = std::env::var("PORTAL_LAUNCH_QUERY").unwrap_or_default();

    let config = match PortalConfig::load("portalwarden") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let flow = match ReqwestTransport::new(&config.user_agent)
        .and_then(|t| AuthFlowController::new(config, &launch_query, Arc::new(t)))
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Setup error: {}", e);
            std::process::exit(1);
        }
    };

    let gateway = flow.network_parameters();
    println!("Gateway: {}:{}", gateway.gateway_ip, gateway.gateway_port);

    match flow.submit_login(&Credentials::new(&username, password)).await {
        Ok(FlowState::Authorized) => {
            if let Some(record) = flow.snapshot().await.entitlement {
                println!("✓ Access granted ({} MB remaining)", record.remaining_mb());
            }
            // Issue the logon ourselves; its full URL carries the password
            // and is not printed.
            match flow.activate_and_dispatch().await {
                Ok(logon) => println!("  Logon sent to {}", logon.endpoint()),
                Err(e) => eprintln!("Activation failed: {}", e),
            }
        }
        Ok(FlowState::NoEntitlement) => {
            println!("✗ No data left on this account");
        }
        Ok(other) => println!("Unexpected state: {:?}", other),
        Err(e) => {
            match &e {
                PortalError::Rejected { detail, .. } => {
                    eprintln!("Login refused: {}", detail);
                }
                PortalError::AllPathsUnreachable { .. } => {
                    // The hotspot is probably blocking the account API.
                    let settings = flow.operator_settings();
                    eprintln!("Account server unreachable through every path.");
                    eprintln!("Ask the operator to allow: {}", settings.uam_allowed);
                }
                _ => {
                    eprintln!("Login error: {}", e);
                }
            }
            std::process::exit(1);
        }
    }
}
