//! Keychain session opener.
//!
//! Opens the remote keychain in an OS-mediated browser session and waits
//! for the redirect back to the app:
//!
//! - `<keychain_url><path>?callback_uri=<callback>&<path params>`
//! - callback is `<app_scheme>://<callback_host><path>`
//!
//! The platform primitive sits behind [`AuthSessionBackend`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use keychain_types::{encode_component, KeychainError, Result, SessionResult};

pub mod scripted;

pub use scripted::{OpenedSession, ScriptedBackend, ScriptedReply};

/// Session opener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub keychain_url: String,
    pub app_scheme: String,
    pub callback_host: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keychain_url: "https://x.cartridge.gg/".into(),
            app_scheme: "controller".into(),
            callback_host: "keychain".into(),
        }
    }
}

/// Per-call options for the browser session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOptions {
    /// Do not share cookies with the system browser.
    pub prefer_ephemeral_session: bool,
}

/// OS "open URL and wait for redirect" capability.
///
/// Implementations resolve once the session ends: `Success` when the OS
/// matched `callback_uri`, `Cancel`/`Dismiss` when the user or the OS
/// closed the sheet. An `Err` means the session could not be started.
#[async_trait]
pub trait AuthSessionBackend: Send + Sync {
    async fn open_auth_session(
        &self,
        url: &Url,
        callback_uri: &str,
        options: OpenOptions,
    ) -> Result<SessionResult>;
}

/// Builds keychain URLs and drives one browser round trip per call.
pub struct KeychainSession {
    base_url: String,
    app_scheme: String,
    callback_host: String,
    backend: Arc<dyn AuthSessionBackend>,
}

impl KeychainSession {
    /// Validate `config` and bind it to `backend`.
    pub fn new(config: SessionConfig, backend: Arc<dyn AuthSessionBackend>) -> Result<Self> {
        let base = Url::parse(&config.keychain_url)
            .map_err(|e| KeychainError::InvalidConfig(format!("keychain_url: {}", e)))?;
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(KeychainError::InvalidConfig(format!(
                "keychain_url must be an absolute http(s) url: {}",
                config.keychain_url
            )));
        }
        if config.app_scheme.is_empty() {
            return Err(KeychainError::InvalidConfig("app_scheme is empty".into()));
        }
        Ok(Self {
            base_url: config.keychain_url.trim_end_matches('/').to_string(),
            app_scheme: config.app_scheme,
            callback_host: config.callback_host,
            backend,
        })
    }

    /// Callback URI the OS should match for `path` (query stripped).
    pub fn callback_uri(&self, path: &str) -> String {
        let (route, _) = split_path(path);
        format!("{}://{}{}", self.app_scheme, self.callback_host, route)
    }

    /// Full keychain URL for `path`, whose query must already be encoded.
    pub fn request_url(&self, path: &str) -> Result<Url> {
        let (route, query) = split_path(path);
        let mut url = Url::parse(&format!("{}{}", self.base_url, route))
            .map_err(|e| KeychainError::InvalidUrl(e.to_string()))?;

        let callback = encode_component(&self.callback_uri(path));
        let mut full_query = format!("callback_uri={}", callback);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            full_query.push('&');
            full_query.push_str(query);
        }
        url.set_query(Some(&full_query));
        Ok(url)
    }

    /// Open `path` in an auth session and wait for it to end.
    ///
    /// No retry happens here; a cancelled session is returned as is.
    pub async fn open(&self, path: &str, options: OpenOptions) -> Result<SessionResult> {
        let url = self.request_url(path)?;
        let callback_uri = self.callback_uri(path);
        tracing::debug!(
            route = split_path(path).0,
            ephemeral = options.prefer_ephemeral_session,
            "opening keychain session"
        );

        let result = self
            .backend
            .open_auth_session(&url, &callback_uri, options)
            .await?;

        match &result {
            SessionResult::Success { .. } => tracing::debug!("keychain session completed"),
            SessionResult::Cancel => tracing::warn!("keychain session cancelled"),
            SessionResult::Dismiss => tracing::warn!("keychain session dismissed"),
        }
        Ok(result)
    }
}

/// Split `"/execute?calls=.."` into `("/execute", Some("calls=.."))`.
fn split_path(path: &str) -> (&str, Option<&str>) {
    let (route, query) = match path.split_once('?') {
        Some((route, query)) => (route, Some(query)),
        None => (path, None),
    };
    if route.is_empty() {
        ("/", query)
    } else {
        (route, query)
    }
}
