//! Portalwarden configuration.

use crate::client::path::PathTemplate;
use crate::diagnostics::probe::ProbeTarget;
use crate::PortalError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default gateway address used when the launch URL carries none.
pub const DEFAULT_GATEWAY_IP: &str = "192.168.182.1";

/// Default gateway UAM port used when the launch URL carries none.
pub const DEFAULT_GATEWAY_PORT: &str = "3990";

/// Remaining-data floor: balances at or below this many bytes are not usable.
pub const DEFAULT_DATA_FLOOR_BYTES: u64 = 50 * 1024;

/// File name looked up under the platform config directory.
pub const CONFIG_FILE_NAME: &str = "portal.json";

static DEFAULT_WALLED_GARDEN: Lazy<Vec<ProbeTarget>> = Lazy::new(|| {
    [
        ("tmanscript.github.io", "Portal host"),
        ("github.io", "GitHub Pages"),
        ("esm.sh", "Module CDN"),
        ("cdn.tailwindcss.com", "Stylesheet CDN"),
        ("fonts.googleapis.com", "Font API"),
        ("fonts.gstatic.com", "Font files"),
        ("corsproxy.io", "Request relay"),
        ("device.onetel.co.za", "Subscriber API"),
    ]
    .into_iter()
    .map(|(domain, label)| ProbeTarget::new(domain, label))
    .collect()
});

/// Gateway address used for the final logon hand-off when the launch URL is silent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayDefaults {
    /// Gateway IP (`uamip`).
    pub ip: String,
    /// Gateway UAM port (`uamport`).
    pub port: String,
}

impl Default for GatewayDefaults {
    fn default() -> Self {
        Self {
            ip: DEFAULT_GATEWAY_IP.to_string(),
            port: DEFAULT_GATEWAY_PORT.to_string(),
        }
    }
}

/// Values an operator pastes into the hotspot gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorSettings {
    /// Page the gateway redirects unauthenticated clients to (`uamhomepage`).
    pub portal_url: Option<String>,
    /// Comma-separated walled-garden list (`uamallowed`).
    pub uam_allowed: String,
}

/// Configuration for the captive-portal client.
///
/// Everything that was a hard-wired constant in a browser portal lives here so
/// tests and deployments can substitute their own endpoints and relay paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Subscriber API base URL, ending in `/`.
    pub api_base_url: String,

    /// Ordered network paths tried for every API call.
    pub fallback_paths: Vec<PathTemplate>,

    /// Per-path attempt timeout, in milliseconds.
    pub attempt_timeout_ms: u64,

    /// Per-domain probe timeout, in milliseconds.
    pub probe_timeout_ms: u64,

    /// Seconds between automatic diagnostics cycles.
    pub diagnostics_interval_secs: u64,

    /// Gateway address fallback for the logon hand-off.
    pub gateway: GatewayDefaults,

    /// Domains the portal depends on; probed by diagnostics and advertised to operators.
    pub walled_garden: Vec<ProbeTarget>,

    /// Remaining-data floor in bytes.
    pub data_floor_bytes: u64,

    /// Plan identifier sent with registrations that do not name one.
    pub plan_id: Option<String>,

    /// Public URL of the portal page itself.
    pub portal_url: Option<String>,

    /// User-Agent sent on API calls and probes.
    pub user_agent: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://device.onetel.co.za/api/v1/radius/organization/default/account/"
                .to_string(),
            fallback_paths: PathTemplate::default_list(),
            attempt_timeout_ms: 8_000,
            probe_timeout_ms: 5_000,
            diagnostics_interval_secs: 30,
            gateway: GatewayDefaults::default(),
            walled_garden: DEFAULT_WALLED_GARDEN.clone(),
            data_floor_bytes: DEFAULT_DATA_FLOOR_BYTES,
            plan_id: None,
            portal_url: None,
            user_agent: format!("portalwarden/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PortalConfig {
    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), PortalError> {
        if self.api_base_url.is_empty() {
            return Err(PortalError::ConfigError(
                "api_base_url cannot be empty".to_string(),
            ));
        }
        if !self.api_base_url.ends_with('/') {
            return Err(PortalError::ConfigError(format!(
                "api_base_url must end with '/', got {}",
                self.api_base_url
            )));
        }
        if self.fallback_paths.is_empty() {
            return Err(PortalError::ConfigError(
                "fallback_paths must list at least one path".to_string(),
            ));
        }
        if self.attempt_timeout_ms == 0 || self.probe_timeout_ms == 0 {
            return Err(PortalError::ConfigError(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.diagnostics_interval_secs == 0 {
            return Err(PortalError::ConfigError(
                "diagnostics_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.gateway.ip.is_empty() || self.gateway.port.is_empty() {
            return Err(PortalError::ConfigError(
                "gateway ip and port cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: &Path) -> Result<Self, PortalError> {
        let json = fs::read_to_string(path)
            .map_err(|e| PortalError::ConfigIO(format!("Failed to read config: {}", e)))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| PortalError::ConfigIO(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<config_dir>/<namespace>/portal.json`, or defaults when it does not exist.
    pub fn load(namespace: &str) -> Result<Self, PortalError> {
        let path = Self::default_path(namespace)?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Path of the config file for a namespace.
    pub fn default_path(namespace: &str) -> Result<PathBuf, PortalError> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| PortalError::ConfigIO("Could not find config directory".to_string()))?;
        Ok(base_dir.join(namespace).join(CONFIG_FILE_NAME))
    }

    /// Per-path attempt timeout.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Per-domain probe timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Interval between automatic diagnostics cycles.
    pub fn diagnostics_interval(&self) -> Duration {
        Duration::from_secs(self.diagnostics_interval_secs)
    }

    /// The walled garden as the gateway's `uamallowed` string.
    pub fn walled_garden_csv(&self) -> String {
        self.walled_garden
            .iter()
            .map(|t| t.domain.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Settings to show an operator when the portal cannot reach its API.
    pub fn operator_settings(&self) -> OperatorSettings {
        OperatorSettings {
            portal_url: self.portal_url.clone(),
            uam_allowed: self.walled_garden_csv(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        assert!(PortalConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_fallback_paths_rejected() {
        let config = PortalConfig {
            fallback_paths: vec![],
            ..PortalConfig::default()
        };
        assert!(matches!(config.validate(), Err(PortalError::ConfigError(_))));
    }

    #[test]
    fn base_url_without_trailing_slash_rejected() {
        let config = PortalConfig {
            api_base_url: "https://api.example.com/account".to_string(),
            ..PortalConfig::default()
        };
        assert!(matches!(config.validate(), Err(PortalError::ConfigError(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = PortalConfig {
            attempt_timeout_ms: 0,
            ..PortalConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn walled_garden_csv_keeps_order() {
        let config = PortalConfig {
            walled_garden: vec![
                ProbeTarget::new("a.example", "A"),
                ProbeTarget::new("b.example", "B"),
            ],
            portal_url: Some("https://portal.example/".to_string()),
            ..PortalConfig::default()
        };
        let settings = config.operator_settings();
        assert_eq!(settings.uam_allowed, "a.example,b.example");
        assert_eq!(settings.portal_url.as_deref(), Some("https://portal.example/"));
    }

    #[test]
    fn default_walled_garden_includes_relay() {
        let csv = PortalConfig::default().walled_garden_csv();
        assert!(csv.contains("corsproxy.io"));
    }

    #[test]
    fn from_file_fills_missing_fields_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{"api_base_url": "https://api.example.com/", "attempt_timeout_ms": 2500}"#,
        )
        .unwrap();

        let config = PortalConfig::from_file(&path).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com/");
        assert_eq!(config.attempt_timeout(), Duration::from_millis(2500));
        assert_eq!(config.gateway, GatewayDefaults::default());
        assert_eq!(config.data_floor_bytes, DEFAULT_DATA_FLOOR_BYTES);
    }

    #[test]
    fn from_file_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{"fallback_paths": []}"#).unwrap();

        assert!(matches!(
            PortalConfig::from_file(&path),
            Err(PortalError::ConfigError(_))
        ));
    }

    #[test]
    fn from_file_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = PortalConfig::from_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(PortalError::ConfigIO(_))));
    }
}
