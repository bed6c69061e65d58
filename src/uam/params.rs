//! Gateway session parameters from the portal launch URL.
//!
//! The gateway redirects the device to the portal with `uamip`, `uamport`
//! and `challenge` in the query string. Some gateways instead wrap their
//! own URL in a `loginurl` parameter; values found there win over the
//! outer query, which wins over the configured defaults.

use crate::config::GatewayDefaults;
use serde::Serialize;
use std::collections::HashMap;
use url::{form_urlencoded, Url};

/// Query parameter that carries the gateway's nested login URL.
pub const REDIRECT_TARGET_PARAM: &str = "loginurl";

/// Gateway address and session challenge. Parsed once, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkAccessParameters {
    /// Gateway IP (`uamip`).
    pub gateway_ip: String,
    /// Gateway UAM port (`uamport`).
    pub gateway_port: String,
    /// Session challenge (`challenge`), possibly empty.
    pub challenge: String,
}

impl NetworkAccessParameters {
    /// Defaults only.
    pub fn from_defaults(defaults: &GatewayDefaults) -> Self {
        Self {
            gateway_ip: defaults.ip.clone(),
            gateway_port: defaults.port.clone(),
            challenge: String::new(),
        }
    }

    /// Extract from a launch query string (with or without a leading `?`).
    pub fn extract(query: &str, defaults: &GatewayDefaults) -> Self {
        let outer = parse_query(query.trim_start_matches('?'));
        let nested = outer
            .get(REDIRECT_TARGET_PARAM)
            .and_then(|target| nested_query(target))
            .unwrap_or_default();

        let pick = |name: &str, fallback: &str| -> String {
            nested
                .get(name)
                .or_else(|| outer.get(name))
                .cloned()
                .unwrap_or_else(|| fallback.to_string())
        };

        Self {
            gateway_ip: pick("uamip", &defaults.ip),
            gateway_port: pick("uamport", &defaults.port),
            challenge: pick("challenge", ""),
        }
    }

    /// Extract from a full launch URL.
    pub fn extract_from_url(launch_url: &str, defaults: &GatewayDefaults) -> Self {
        match Url::parse(launch_url) {
            Ok(url) => Self::extract(url.query().unwrap_or_default(), defaults),
            Err(e) => {
                tracing::debug!(error = %e, "launch URL does not parse, using defaults");
                Self::from_defaults(defaults)
            }
        }
    }
}

/// First value wins; empty values count as absent.
fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    params
}

/// Query parameters of the nested URL, tolerating one extra level of encoding.
/// Any failure yields `None` and the caller falls back to the outer query.
fn nested_query(target: &str) -> Option<HashMap<String, String>> {
    let url = Url::parse(target).ok().or_else(|| {
        let decoded: String = form_urlencoded::parse(format!("v={}", target).as_bytes())
            .map(|(_, v)| v.into_owned())
            .next()?;
        Url::parse(&decoded).ok()
    })?;
    Some(parse_query(url.query().unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> GatewayDefaults {
        GatewayDefaults::default()
    }

    #[test]
    fn empty_query_gives_defaults() {
        let params = NetworkAccessParameters::extract("", &defaults());
        assert_eq!(params, NetworkAccessParameters::from_defaults(&defaults()));
        assert_eq!(params.gateway_ip, "192.168.182.1");
        assert_eq!(params.gateway_port, "3990");
    }

    #[test]
    fn only_uamip_keeps_default_port_and_empty_challenge() {
        let params = NetworkAccessParameters::extract("uamip=10.0.0.1", &defaults());
        assert_eq!(params.gateway_ip, "10.0.0.1");
        assert_eq!(params.gateway_port, "3990");
        assert_eq!(params.challenge, "");
    }

    #[test]
    fn outer_query_values_used() {
        let params = NetworkAccessParameters::extract(
            "?uamip=10.1.0.1&uamport=4990&challenge=abcdef",
            &defaults(),
        );
        assert_eq!(params.gateway_ip, "10.1.0.1");
        assert_eq!(params.gateway_port, "4990");
        assert_eq!(params.challenge, "abcdef");
    }

    #[test]
    fn nested_redirect_target_overrides_outer() {
        let nested = "http://10.2.0.1:3990/prelogin?uamip=10.2.0.1&uamport=8080&challenge=c0ffee";
        let encoded: String = form_urlencoded::byte_serialize(nested.as_bytes()).collect();
        let query = format!("uamport=3990&uamip=10.9.9.9&loginurl={}", encoded);

        let params = NetworkAccessParameters::extract(&query, &defaults());

        assert_eq!(params.gateway_port, "8080");
        assert_eq!(params.gateway_ip, "10.2.0.1");
        assert_eq!(params.challenge, "c0ffee");
    }

    #[test]
    fn nested_missing_values_fall_back_to_outer() {
        let nested = "http://gw.local/prelogin?uamport=8080";
        let encoded: String = form_urlencoded::byte_serialize(nested.as_bytes()).collect();
        let query = format!("uamip=10.3.0.1&loginurl={}", encoded);

        let params = NetworkAccessParameters::extract(&query, &defaults());

        assert_eq!(params.gateway_ip, "10.3.0.1");
        assert_eq!(params.gateway_port, "8080");
        assert_eq!(params.challenge, "");
    }

    #[test]
    fn double_encoded_redirect_target_is_decoded() {
        let nested = "http://gw.local/prelogin?uamport=7000";
        let once: String = form_urlencoded::byte_serialize(nested.as_bytes()).collect();
        let twice: String = form_urlencoded::byte_serialize(once.as_bytes()).collect();

        let params = NetworkAccessParameters::extract(&format!("loginurl={}", twice), &defaults());

        assert_eq!(params.gateway_port, "7000");
    }

    #[test]
    fn undecodable_redirect_target_is_ignored() {
        let params = NetworkAccessParameters::extract(
            "uamip=10.4.0.1&loginurl=%25%25not-a-url",
            &defaults(),
        );
        assert_eq!(params.gateway_ip, "10.4.0.1");
        assert_eq!(params.gateway_port, "3990");
    }

    #[test]
    fn custom_defaults_apply() {
        let custom = GatewayDefaults {
            ip: "172.16.0.1".to_string(),
            port: "80".to_string(),
        };
        let params = NetworkAccessParameters::extract("challenge=x", &custom);
        assert_eq!(params.gateway_ip, "172.16.0.1");
        assert_eq!(params.gateway_port, "80");
        assert_eq!(params.challenge, "x");
    }

    #[test]
    fn full_launch_url() {
        let params = NetworkAccessParameters::extract_from_url(
            "https://portal.example/?res=notyet&uamip=10.5.0.1&uamport=3991",
            &defaults(),
        );
        assert_eq!(params.gateway_ip, "10.5.0.1");
        assert_eq!(params.gateway_port, "3991");
    }

    #[test]
    fn unparseable_launch_url_gives_defaults() {
        let params = NetworkAccessParameters::extract_from_url("not a url", &defaults());
        assert_eq!(params, NetworkAccessParameters::from_defaults(&defaults()));
    }
}
