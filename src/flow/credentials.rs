//! User-supplied credentials and registration profile.
//!
//! Held in memory for one session attempt only. `Debug` output never
//! includes secrets.

use crate::protocol::models::{LoginPayload, RegistrationPayload, REGISTRATION_METHOD};
use crate::PortalError;
use std::fmt;

/// Phone-number identifier and password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    /// Create credentials; the identifier is whitespace-trimmed.
    pub fn new(identifier: impl AsRef<str>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.as_ref().trim().to_string(),
            secret: secret.into(),
        }
    }

    /// Phone-number identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Password.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub(crate) fn login_payload(&self) -> LoginPayload {
        LoginPayload {
            username: self.identifier.clone(),
            password: self.secret.clone(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// Everything the registration form collects.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegistrationProfile {
    /// Phone number; also the username.
    pub identifier: String,
    /// Contact email.
    pub email: String,
    /// Password.
    pub secret: String,
    /// Password confirmation; must equal `secret`.
    pub secret_confirm: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Plan to subscribe to; the configured plan when `None`.
    pub plan_id: Option<String>,
}

impl RegistrationProfile {
    /// Local checks that run before any network call.
    pub fn validate(&self) -> Result<(), PortalError> {
        if self.secret != self.secret_confirm {
            return Err(PortalError::PasswordMismatch);
        }
        Ok(())
    }

    /// Credentials this profile will log in with.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.identifier, self.secret.clone())
    }

    pub(crate) fn payload(&self, default_plan: Option<&str>) -> RegistrationPayload {
        let phone = self.identifier.trim().to_string();
        RegistrationPayload {
            username: phone.clone(),
            email: self.email.trim().to_string(),
            password1: self.secret.clone(),
            password2: self.secret_confirm.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone_number: phone,
            method: REGISTRATION_METHOD.to_string(),
            plan_pricing: self
                .plan_id
                .clone()
                .or_else(|| default_plan.map(String::from)),
        }
    }
}

impl fmt::Debug for RegistrationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationProfile")
            .field("identifier", &self.identifier)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("plan_id", &self.plan_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> RegistrationProfile {
        RegistrationProfile {
            identifier: " 0821234567 ".to_string(),
            email: "user@example.com".to_string(),
            secret: "s3cret".to_string(),
            secret_confirm: "s3cret".to_string(),
            first_name: "Thandi".to_string(),
            last_name: "M".to_string(),
            plan_id: None,
        }
    }

    #[test]
    fn identifier_is_trimmed() {
        let creds = Credentials::new("  0821234567\n", "pw");
        assert_eq!(creds.identifier(), "0821234567");
        assert_eq!(creds.secret(), "pw");
    }

    #[test]
    fn debug_hides_secret() {
        let creds = Credentials::new("0821234567", "hunter2");
        assert!(!format!("{:?}", creds).contains("hunter2"));
        let mut p = profile();
        p.secret = "hunter2".to_string();
        assert!(!format!("{:?}", p).contains("hunter2"));
    }

    #[test]
    fn mismatch_fails_validation() {
        let mut p = profile();
        p.secret_confirm = "other".to_string();
        assert!(matches!(p.validate(), Err(PortalError::PasswordMismatch)));
    }

    #[test]
    fn payload_uses_phone_as_username() {
        let payload = profile().payload(Some("plan-a"));
        assert_eq!(payload.username, "0821234567");
        assert_eq!(payload.phone_number, "0821234567");
        assert_eq!(payload.method, "mobile_phone");
        assert_eq!(payload.plan_pricing.as_deref(), Some("plan-a"));
    }

    #[test]
    fn explicit_plan_wins() {
        let mut p = profile();
        p.plan_id = Some("plan-b".to_string());
        assert_eq!(p.payload(Some("plan-a")).plan_pricing.as_deref(), Some("plan-b"));
    }

    #[test]
    fn profile_credentials() {
        let creds = profile().credentials();
        assert_eq!(creds.identifier(), "0821234567");
        assert_eq!(creds.secret(), "s3cret");
    }
}
