//! Subscriber API payloads and lenient response parsing.

use crate::client::http::HttpResponse;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Registration method the API expects for phone-number accounts.
pub const REGISTRATION_METHOD: &str = "mobile_phone";

/// Body of `POST <base>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationPayload {
    /// Account username; the phone number.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Password.
    pub password1: String,
    /// Password confirmation.
    pub password2: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Phone number; same as `username`.
    pub phone_number: String,
    /// Always [`REGISTRATION_METHOD`].
    pub method: String,
    /// Plan identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_pricing: Option<String>,
}

/// Body of `POST <base>token/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginPayload {
    /// Phone number.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Body of `POST <base>phone/verify/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyPayload {
    /// One-time code.
    pub code: String,
}

/// Token-bearing response from registration or login.
///
/// Deployments disagree on the field name, so all three are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    token_key: Option<String>,
}

impl TokenResponse {
    /// First non-empty of `token`, `key`, `token_key`.
    pub fn bearer(&self) -> Option<&str> {
        [&self.token, &self.key, &self.token_key]
            .into_iter()
            .filter_map(|t| t.as_deref())
            .find(|t| !t.is_empty())
    }
}

/// One quota check: allotted `value` and consumed `result`, in bytes.
///
/// RADIUS check values travel as strings (`"3000000000"`), counters as
/// numbers; both forms are accepted, and `null` reads as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UsageCheck {
    /// Allotted bytes.
    #[serde(default, deserialize_with = "lenient_bytes")]
    pub value: u64,
    /// Consumed bytes.
    #[serde(default, deserialize_with = "lenient_bytes")]
    pub result: u64,
}

/// Byte count from a number, a numeric string or `null`. Negatives clamp to zero.
fn lenient_bytes<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    fn from_float<E: de::Error>(f: f64) -> Result<u64, E> {
        if f.is_finite() {
            Ok(f.max(0.0) as u64)
        } else {
            Err(E::custom(format!("byte count is not finite: {}", f)))
        }
    }

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(bytes) => Ok(bytes),
            None => from_float(n.as_f64().unwrap_or(0.0)),
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            match trimmed.parse::<u64>() {
                Ok(bytes) => Ok(bytes),
                Err(_) => trimmed
                    .parse::<f64>()
                    .map_err(|_| de::Error::custom(format!("byte count is not numeric: {:?}", s)))
                    .and_then(from_float),
            }
        }
        Some(other) => Err(de::Error::custom(format!(
            "byte count has unexpected type: {}",
            other
        ))),
    }
}

/// Body of `GET <base>usage/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageResponse {
    /// Quota checks; empty or absent means no quota.
    #[serde(default)]
    pub checks: Option<Vec<UsageCheck>>,
}

/// A response body: JSON when it parses, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Parsed JSON.
    Json(Value),
    /// Anything that is not JSON, including an empty body.
    Text(String),
}

impl ResponseBody {
    /// Parse without failing.
    pub fn parse(response: &HttpResponse) -> Self {
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(response.text().into_owned()),
        }
    }

    /// Deserialize JSON bodies into `T`; `None` for text or mismatched shapes.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Option<T> {
        match self {
            Self::Json(value) => serde_json::from_value(value.clone()).ok(),
            Self::Text(_) => None,
        }
    }

    /// Human-readable detail, falling back to `Status <code>` for empty text.
    pub fn detail(&self, status: u16) -> Option<String> {
        match self {
            Self::Json(value) => error_detail(value),
            Self::Text(text) if text.trim().is_empty() => Some(format!("Status {}", status)),
            Self::Text(text) => Some(text.trim().to_string()),
        }
    }
}

/// Pull a message out of a Django-REST-style error body.
///
/// Order: `detail`, then `non_field_errors`, then per-field errors as
/// `field: message` joined with `; `.
pub fn error_detail(value: &Value) -> Option<String> {
    let object = value.as_object()?;

    if let Some(detail) = object.get("detail").and_then(messages) {
        return Some(detail);
    }
    if let Some(errors) = object.get("non_field_errors").and_then(messages) {
        return Some(errors);
    }

    let fields: Vec<String> = object
        .iter()
        .filter_map(|(field, v)| messages(v).map(|m| format!("{}: {}", field, m)))
        .collect();
    if fields.is_empty() {
        None
    } else {
        Some(fields.join("; "))
    }
}

fn messages(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        _ => None,
    }
}
