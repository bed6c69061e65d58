//! Network path templates.
//!
//! A path turns the URL the caller wants into the URL actually dialled:
//! either unchanged, or handed to a relay that forwards it.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Public relay used by the default path list.
pub const DEFAULT_RELAY_PREFIX: &str = "https://corsproxy.io/?";

fn default_encode() -> bool {
    true
}

/// One way of reaching a target URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathTemplate {
    /// Dial the target as-is.
    Direct,
    /// Append the target to a relay prefix, URL-encoded unless `encode` is false.
    Relay {
        /// Relay URL the target is appended to.
        prefix: String,
        /// Whether to URL-encode the target first.
        #[serde(default = "default_encode")]
        encode: bool,
    },
}

impl PathTemplate {
    /// A relay that URL-encodes the target.
    pub fn relay(prefix: impl Into<String>) -> Self {
        Self::Relay {
            prefix: prefix.into(),
            encode: true,
        }
    }

    /// The URL to dial for `target`.
    pub fn wrap(&self, target: &str) -> String {
        match self {
            Self::Direct => target.to_string(),
            Self::Relay { prefix, encode: true } => {
                let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
                format!("{}{}", prefix, encoded)
            }
            Self::Relay {
                prefix,
                encode: false,
            } => format!("{}{}", prefix, target),
        }
    }

    /// Short name for logs.
    pub fn label(&self) -> &str {
        match self {
            Self::Direct => "direct",
            Self::Relay { prefix, .. } => prefix,
        }
    }

    /// Relay first, then direct.
    pub fn default_list() -> Vec<Self> {
        vec![Self::relay(DEFAULT_RELAY_PREFIX), Self::Direct]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_is_identity() {
        assert_eq!(
            PathTemplate::Direct.wrap("https://api.example.com/token/"),
            "https://api.example.com/token/"
        );
    }

    #[test]
    fn relay_encodes_target() {
        let path = PathTemplate::relay("https://relay.example/?");
        assert_eq!(
            path.wrap("https://api.example.com/token/"),
            "https://relay.example/?https%3A%2F%2Fapi.example.com%2Ftoken%2F"
        );
    }

    #[test]
    fn relay_without_encoding_appends_raw() {
        let path = PathTemplate::Relay {
            prefix: "https://relay.example/raw/".to_string(),
            encode: false,
        };
        assert_eq!(
            path.wrap("https://api.example.com/usage/"),
            "https://relay.example/raw/https://api.example.com/usage/"
        );
    }

    #[test]
    fn deserializes_tagged_forms() {
        let paths: Vec<PathTemplate> = serde_json::from_str(
            r#"[{"kind": "relay", "prefix": "https://relay.example/?"}, {"kind": "direct"}]"#,
        )
        .unwrap();
        assert_eq!(
            paths,
            vec![PathTemplate::relay("https://relay.example/?"), PathTemplate::Direct]
        );
    }

    #[test]
    fn default_list_tries_relay_before_direct() {
        let paths = PathTemplate::default_list();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].label(), DEFAULT_RELAY_PREFIX);
        assert_eq!(paths[1], PathTemplate::Direct);
    }
}
