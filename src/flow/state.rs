//! Flow states and the pure transition function.

use crate::policy::entitlement::EntitlementDecision;
use crate::PortalError;
use serde::Serialize;

/// Where the user is in the portal flow. Exactly one is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowState {
    /// Registration form.
    Registration,
    /// Waiting for the one-time code.
    OtpVerification,
    /// Login form; the starting state.
    Login,
    /// Login succeeded and the usage lookup settled; passed through while
    /// its outcome is applied.
    EntitlementCheck,
    /// Account has no usable data.
    NoEntitlement,
    /// Ready to open the gateway.
    Authorized,
    /// Gateway logon issued; the flow is over.
    Activated,
}

impl FlowState {
    /// Stable name for errors and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Registration => "Registration",
            Self::OtpVerification => "OtpVerification",
            Self::Login => "Login",
            Self::EntitlementCheck => "EntitlementCheck",
            Self::NoEntitlement => "NoEntitlement",
            Self::Authorized => "Authorized",
            Self::Activated => "Activated",
        }
    }
}

/// Something that happened; input to [`transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    /// User opened the registration form.
    ShowRegistration,
    /// User went back to the login form.
    ShowLogin,
    /// Registration succeeded and a one-time code was requested.
    Registered,
    /// One-time code accepted.
    OtpVerified,
    /// Login returned a token.
    LoggedIn,
    /// Usage lookup failed after login.
    LookupFailed,
    /// Usage lookup evaluated.
    Entitlement(EntitlementDecision),
    /// User chose to log in with another account.
    SwitchAccount,
    /// User opened the gateway.
    Activate,
}

impl FlowEvent {
    /// Action name for errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::ShowRegistration => "show registration",
            Self::ShowLogin => "show login",
            Self::Registered => "complete registration",
            Self::OtpVerified => "verify code",
            Self::LoggedIn => "log in",
            Self::LookupFailed => "abandon usage lookup",
            Self::Entitlement(_) => "apply entitlement",
            Self::SwitchAccount => "switch account",
            Self::Activate => "activate",
        }
    }
}

/// Next state for `event` in `state`, or `InvalidTransition`.
pub fn transition(state: FlowState, event: FlowEvent) -> Result<FlowState, PortalError> {
    use EntitlementDecision::*;
    use FlowEvent as E;
    use FlowState as S;

    let next = match (state, event) {
        (S::Login, E::ShowRegistration) => S::Registration,
        (S::Registration, E::ShowLogin) => S::Login,
        (S::Registration, E::Registered) => S::OtpVerification,
        (S::OtpVerification, E::OtpVerified) => S::Login,
        (S::Login, E::LoggedIn) => S::EntitlementCheck,
        (S::EntitlementCheck, E::LookupFailed) => S::Login,
        (S::EntitlementCheck, E::Entitlement(Unmetered | HasData)) => S::Authorized,
        (S::EntitlementCheck, E::Entitlement(Exhausted)) => S::NoEntitlement,
        (S::NoEntitlement, E::SwitchAccount) => S::Login,
        (S::Authorized, E::Activate) => S::Activated,
        _ => {
            return Err(PortalError::InvalidTransition {
                state: state.name(),
                action: event.name(),
            })
        }
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_path() {
        let s = transition(FlowState::Login, FlowEvent::ShowRegistration).unwrap();
        let s = transition(s, FlowEvent::Registered).unwrap();
        assert_eq!(s, FlowState::OtpVerification);
        let s = transition(s, FlowEvent::OtpVerified).unwrap();
        assert_eq!(s, FlowState::Login);
    }

    #[test]
    fn entitlement_outcomes() {
        let check = FlowState::EntitlementCheck;
        assert_eq!(
            transition(check, FlowEvent::Entitlement(EntitlementDecision::Unmetered)).unwrap(),
            FlowState::Authorized
        );
        assert_eq!(
            transition(check, FlowEvent::Entitlement(EntitlementDecision::HasData)).unwrap(),
            FlowState::Authorized
        );
        assert_eq!(
            transition(check, FlowEvent::Entitlement(EntitlementDecision::Exhausted)).unwrap(),
            FlowState::NoEntitlement
        );
        assert_eq!(
            transition(check, FlowEvent::LookupFailed).unwrap(),
            FlowState::Login
        );
    }

    #[test]
    fn switch_account_returns_to_login() {
        assert_eq!(
            transition(FlowState::NoEntitlement, FlowEvent::SwitchAccount).unwrap(),
            FlowState::Login
        );
    }

    #[test]
    fn activation_is_terminal() {
        let s = transition(FlowState::Authorized, FlowEvent::Activate).unwrap();
        assert_eq!(s, FlowState::Activated);
        for event in [
            FlowEvent::ShowLogin,
            FlowEvent::ShowRegistration,
            FlowEvent::LoggedIn,
            FlowEvent::SwitchAccount,
            FlowEvent::Activate,
        ] {
            assert!(transition(s, event).is_err());
        }
    }

    #[test]
    fn invalid_transition_names_state_and_action() {
        let err = transition(FlowState::Login, FlowEvent::Activate).unwrap_err();
        assert!(matches!(
            err,
            PortalError::InvalidTransition { state: "Login", action: "activate" }
        ));
    }

    #[test]
    fn otp_cannot_be_skipped() {
        assert!(transition(FlowState::Registration, FlowEvent::OtpVerified).is_err());
        assert!(transition(FlowState::Login, FlowEvent::Registered).is_err());
    }
}
