use log::{debug, info};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BE_ORIGIN: &str = "https://bobple-be.onrender.com";
pub const DEFAULT_PROXY_PREFIX: &str = "/_be";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStoreKind {
    Keyring,
    File,
    Memory,
}

impl SessionStoreKind {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "file" => SessionStoreKind::File,
            "memory" => SessionStoreKind::Memory,
            _ => SessionStoreKind::Keyring,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base as configured; may be empty.
    pub api_base_url: String,
    /// WebSocket base as configured; empty means derive from the REST base.
    pub ws_base_url: String,
    pub debug: bool,
    pub proxy_mode: bool,
    pub proxy_prefix: String,
    pub be_origin: String,
    pub chat_poll_interval: Duration,
    pub connect_timeout: Duration,
    pub session_store: SessionStoreKind,
    pub session_file: PathBuf,
    pub log_level: String,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok());
        info!("[CONFIG] REST base: {}", config.rest_base());
        info!("[CONFIG] WebSocket base: {}", config.ws_base());
        debug!("[CONFIG] {:?}", config);
        config
    }

    /// Builds the configuration from any key lookup. The first non-empty of
    /// each alias list wins.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|k| lookup(k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };
        let truthy = |v: Option<String>| v.map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);

        let debug = truthy(first(&["BOBPLE_DEBUG", "NEXT_PUBLIC_DEBUG"]));
        let default_level = if debug { "debug" } else { "info" };

        Self {
            api_base_url: first(&["API_BASE_URL", "NEXT_PUBLIC_API_URL"]).unwrap_or_default(),
            ws_base_url: first(&["WS_BASE_URL", "NEXT_PUBLIC_WS_URL"]).unwrap_or_default(),
            debug,
            proxy_mode: truthy(first(&["PROXY_MODE"])),
            proxy_prefix: first(&["PROXY_PREFIX"]).unwrap_or_else(|| DEFAULT_PROXY_PREFIX.to_string()),
            be_origin: first(&["BE_ORIGIN"]).unwrap_or_else(|| DEFAULT_BE_ORIGIN.to_string()),
            chat_poll_interval: Duration::from_millis(
                first(&["CHAT_POLL_INTERVAL_MS"])
                    .and_then(|v| v.parse::<u64>().ok())
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            connect_timeout: Duration::from_secs(
                first(&["HTTP_CONNECT_TIMEOUT_SECS"]).and_then(|v| v.parse().ok()).unwrap_or(10),
            ),
            session_store: first(&["SESSION_STORE"])
                .map(|v| SessionStoreKind::parse(&v))
                .unwrap_or(SessionStoreKind::Keyring),
            session_file: first(&["SESSION_FILE"])
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data").join("session.json")),
            log_level: first(&["LOG_LEVEL"]).unwrap_or_else(|| default_level.to_string()),
        }
    }

    /// Configuration pointing at one backend, used by tests and embedders.
    pub fn for_base(api_base_url: &str) -> Self {
        let mut config = Self::from_lookup(|_| None);
        config.api_base_url = api_base_url.to_string();
        config.session_store = SessionStoreKind::Memory;
        config
    }

    /// Base every REST path is joined to.
    ///
    /// In proxy mode requests go to `<api base><proxy prefix>`, which the
    /// front server forwards to the backend origin; with no api base the
    /// prefix sits on the backend origin. Outside proxy mode an empty base
    /// calls the backend origin directly.
    pub fn rest_base(&self) -> String {
        let origin = if self.api_base_url.is_empty() { &self.be_origin } else { &self.api_base_url };
        if self.proxy_mode {
            join_path(origin, &self.proxy_prefix)
        } else {
            origin.clone()
        }
    }

    /// WebSocket base; derived from the REST base by swapping the scheme
    /// when not configured.
    pub fn ws_base(&self) -> String {
        let base = if self.ws_base_url.is_empty() {
            let rest = if self.api_base_url.is_empty() { self.be_origin.clone() } else { self.api_base_url.clone() };
            http_to_ws(&rest)
        } else {
            self.ws_base_url.clone()
        };
        base.trim_end_matches('/').to_string()
    }
}

/// Joins a base and a path with exactly one `/`. An empty base keeps the path.
pub fn join_path(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn http_to_ws(url: &str) -> String {
    match url.get(..4) {
        Some(scheme) if scheme.eq_ignore_ascii_case("http") => format!("ws{}", &url[4..]),
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ClientConfig {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ClientConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn join_path_uses_single_slash() {
        assert_eq!(join_path("http://a/", "/api/x"), "http://a/api/x");
        assert_eq!(join_path("http://a", "api/x"), "http://a/api/x");
        assert_eq!(join_path("", "/api/x"), "/api/x");
    }

    #[test]
    fn ws_base_is_derived_from_api_base() {
        let c = config(&[("API_BASE_URL", "https://api.example.com/")]);
        assert_eq!(c.ws_base(), "wss://api.example.com");
        let c = config(&[("NEXT_PUBLIC_API_URL", "http://localhost:3000"), ("WS_BASE_URL", "ws://chat:9000/")]);
        assert_eq!(c.ws_base(), "ws://chat:9000");
    }

    #[test]
    fn proxy_mode_routes_through_prefix() {
        let c = config(&[("API_BASE_URL", "http://front:3000"), ("PROXY_MODE", "true")]);
        assert_eq!(c.rest_base(), "http://front:3000/_be");
        let c = config(&[("PROXY_MODE", "true")]);
        assert_eq!(c.rest_base(), format!("{}/_be", DEFAULT_BE_ORIGIN));
        let c = config(&[("PROXY_MODE", "1"), ("BE_ORIGIN", "http://be:8080/"), ("PROXY_PREFIX", "/proxy")]);
        assert_eq!(c.rest_base(), "http://be:8080/proxy");
        let c = config(&[]);
        assert_eq!(c.rest_base(), DEFAULT_BE_ORIGIN);
    }

    #[test]
    fn debug_flag_lowers_default_log_level() {
        let c = config(&[("NEXT_PUBLIC_DEBUG", "1")]);
        assert!(c.debug);
        assert_eq!(c.log_level, "debug");
        assert_eq!(c.chat_poll_interval, Duration::from_millis(3500));
        assert_eq!(c.session_store, SessionStoreKind::Keyring);
    }

    #[test]
    fn zero_poll_interval_keeps_default() {
        let c = config(&[("CHAT_POLL_INTERVAL_MS", "0"), ("SESSION_STORE", "file")]);
        assert_eq!(c.chat_poll_interval, Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
        assert_eq!(c.session_store, SessionStoreKind::File);
    }
}
