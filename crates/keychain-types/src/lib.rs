//! Shared types for the keychain bridge: data model, errors, codecs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod callback;
pub mod chain_id;
pub mod query;

pub use callback::CallbackParams;
pub use chain_id::ChainId;
pub use query::{encode_component, QueryBuilder};

/// Keychain bridge error types.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// The browser session ended by cancel or dismiss.
    #[error("User cancelled")]
    UserCancelled,

    /// A required callback field was absent or empty.
    #[error("{0} not found")]
    MissingField(&'static str),

    #[error("no account found")]
    NoAccount,

    #[error("capability not implemented: {0}")]
    UnsupportedCapability(String),

    #[error("connector not found: {0}")]
    ConnectorNotFound(String),

    /// Intentional stub on the wallet surface.
    #[error("{0} is not supported yet")]
    NotSupported(&'static str),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("auth session failed: {0}")]
    Session(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KeychainError {
    /// True when the user closed the browser sheet; callers usually stay quiet.
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}

/// Result type for keychain operations.
pub type Result<T> = std::result::Result<T, KeychainError>;

/// One accepted network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    #[serde(rename = "rpcUrl")]
    pub rpc_url: String,
}

impl Chain {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self { rpc_url: rpc_url.into() }
    }
}

/// Session permission descriptor, forwarded to the keychain untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Policies(pub serde_json::Value);

impl Default for Policies {
    fn default() -> Self {
        Self(serde_json::Value::Object(Default::default()))
    }
}

/// Outbound contract invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub contract_address: String,
    pub entrypoint: String,
    #[serde(default = "empty_calldata")]
    pub calldata: serde_json::Value,
}

fn empty_calldata() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

/// Domain-separated message to be signed by the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: serde_json::Value,
    pub primary_type: String,
    pub domain: serde_json::Value,
    pub message: serde_json::Value,
}

/// Signature felts returned by the keychain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(pub Vec<String>);

/// Result of a successful `execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeResult {
    pub transaction_hash: String,
}

/// Terminal state of one browser auth session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionResult {
    /// `url` is the matched callback URI with the response query appended.
    Success { url: String },
    Cancel,
    Dismiss,
}

impl SessionResult {
    /// Returns the redirect URL, or `UserCancelled` for cancel/dismiss.
    pub fn into_redirect(self) -> Result<String> {
        match self {
            Self::Success { url } => Ok(url),
            Self::Cancel | Self::Dismiss => Err(KeychainError::UserCancelled),
        }
    }
}
