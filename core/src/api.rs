//! Connection settings for a Tableau Server REST endpoint.
//!
//! `Api` is a plain value: the server address, the REST API version, the
//! boundary token used for `multipart/mixed` uploads, and the auth token the
//! server hands back on sign-in. Nothing here validates the server URL; a
//! malformed address only shows up when the caller executes a request.

use std::env;
use std::time::Duration;

use tracing::debug;

pub const API_VERSION: &str = "2.0";
pub const DEFAULT_SERVER: &str = "http://localhost:8000";
pub const BOUNDARY_STRING: &str = "813e3160-3c95-11e5-a151-feff819cdc9f";
pub const CRLF: &str = "\r\n";

/// Suggested transport timeouts for whoever executes the requests.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const READ_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

pub const SERVER_ENV: &str = "TABLEAU_SERVER";
pub const VERSION_ENV: &str = "TABLEAU_API_VERSION";
pub const BOUNDARY_ENV: &str = "TABLEAU_BOUNDARY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Api {
    pub server: String,
    pub version: String,
    pub boundary: String,
    pub auth_token: Option<String>,
}

impl Api {
    /// Build a configuration, dropping a single trailing slash from `server`.
    pub fn new(server: &str, version: &str, boundary: &str) -> Self {
        let server = server.strip_suffix('/').unwrap_or(server);
        Self {
            server: server.to_string(),
            version: version.to_string(),
            boundary: boundary.to_string(),
            auth_token: None,
        }
    }

    /// The localhost preset.
    pub fn default_api() -> Self {
        Self::new(DEFAULT_SERVER, API_VERSION, BOUNDARY_STRING)
    }

    /// Read `TABLEAU_SERVER`, `TABLEAU_API_VERSION` and `TABLEAU_BOUNDARY`,
    /// falling back to the localhost preset for anything unset.
    pub fn from_env() -> Self {
        let server = env_or(SERVER_ENV, DEFAULT_SERVER);
        let version = env_or(VERSION_ENV, API_VERSION);
        let boundary = env_or(BOUNDARY_ENV, BOUNDARY_STRING);
        debug!(%server, %version, "loaded api configuration from environment");
        Self::new(&server, &version, &boundary)
    }

    /// Root of every REST path: `{server}/api/{version}`.
    pub fn base_url(&self) -> String {
        format!("{}/api/{}", self.server, self.version)
    }

    pub fn set_auth_token(&mut self, token: impl Into<String>) {
        self.auth_token = Some(token.into());
    }

    pub fn clear_auth_token(&mut self) {
        self.auth_token = None;
    }

    pub fn is_signed_in(&self) -> bool {
        self.auth_token.is_some()
    }
}

impl Default for Api {
    fn default() -> Self {
        Self::default_api()
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_api_points_at_localhost() {
        let api = Api::default_api();
        assert_eq!(api.server, "http://localhost:8000");
        assert_eq!(api.version, "2.0");
        assert_eq!(api.boundary, BOUNDARY_STRING);
        assert!(api.auth_token.is_none());
        assert_eq!(api, Api::default());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let with = Api::new("http://tableau.example.com/", "2.3", "b");
        let without = Api::new("http://tableau.example.com", "2.3", "b");
        assert_eq!(with, without);
        assert_eq!(with.server, "http://tableau.example.com");
    }

    #[test]
    fn only_one_trailing_slash_is_stripped() {
        let api = Api::new("http://host//", API_VERSION, BOUNDARY_STRING);
        assert_eq!(api.server, "http://host/");
    }

    #[test]
    fn malformed_server_is_kept_verbatim() {
        let api = Api::new("not a url", API_VERSION, BOUNDARY_STRING);
        assert_eq!(api.server, "not a url");
    }

    #[test]
    fn base_url_includes_version() {
        let api = Api::new("https://bi.example.com/", "3.4", BOUNDARY_STRING);
        assert_eq!(api.base_url(), "https://bi.example.com/api/3.4");
    }

    #[test]
    fn auth_token_lifecycle() {
        let mut api = Api::default_api();
        api.set_auth_token("abc");
        assert!(api.is_signed_in());
        assert_eq!(api.auth_token.as_deref(), Some("abc"));
        api.clear_auth_token();
        assert!(!api.is_signed_in());
    }

    #[test]
    fn env_or_falls_back_for_unset_keys() {
        assert_eq!(
            env_or("TABLEAU_CORE_TEST_SURELY_UNSET", "fallback"),
            "fallback"
        );
    }
}
