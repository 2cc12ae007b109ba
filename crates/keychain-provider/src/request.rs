//! Capability dispatch for `KeychainProvider::request`.

use serde::{Deserialize, Serialize};

use keychain_types::{KeychainError, Result, Signature, TypedData};

pub const SIGN_TYPED_DATA: &str = "wallet_signTypedData";

/// Generic request as issued by the wallet framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestCall {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RequestCall {
    pub fn new(kind: impl Into<String>, params: serde_json::Value) -> Self {
        Self { kind: kind.into(), params }
    }
}

/// Capabilities the keychain bridge handles.
#[derive(Debug, Clone, PartialEq)]
pub enum WalletRequest {
    SignTypedData(TypedData),
}

impl WalletRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SignTypedData(_) => SIGN_TYPED_DATA,
        }
    }
}

impl TryFrom<RequestCall> for WalletRequest {
    type Error = KeychainError;

    fn try_from(call: RequestCall) -> Result<Self> {
        match call.kind.as_str() {
            SIGN_TYPED_DATA => Ok(Self::SignTypedData(serde_json::from_value(call.params)?)),
            _ => Err(KeychainError::UnsupportedCapability(call.kind)),
        }
    }
}

/// Result of a handled capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WalletResponse {
    Signature(Signature),
}
