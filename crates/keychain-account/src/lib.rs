//! Keychain-backed account.
//!
//! - `execute`: `/execute?calls=..` -> `transaction_hash`
//! - `sign_message`: `/sign-message?typedData=..` -> `signature`

use std::sync::Arc;

use async_trait::async_trait;

use keychain_session::{KeychainSession, OpenOptions};
use keychain_types::{
    Call, CallbackParams, ChainId, InvokeResult, KeychainError, Result, Signature, TypedData,
};

pub mod codec;

/// Account surface handed to the UI layer.
#[async_trait]
pub trait WalletAccount: Send + Sync {
    fn address(&self) -> &str;
    fn chain_id(&self) -> ChainId;
    async fn execute(&self, calls: CallBatch) -> Result<InvokeResult>;
    async fn sign_message(&self, typed_data: &TypedData) -> Result<Signature>;
}

/// One call or an ordered list of calls.
#[derive(Debug, Clone, PartialEq)]
pub struct CallBatch(pub Vec<Call>);

impl From<Call> for CallBatch {
    fn from(call: Call) -> Self {
        Self(vec![call])
    }
}

impl From<Vec<Call>> for CallBatch {
    fn from(calls: Vec<Call>) -> Self {
        Self(calls)
    }
}

impl From<&[Call]> for CallBatch {
    fn from(calls: &[Call]) -> Self {
        Self(calls.to_vec())
    }
}

/// Account bound to one authenticated address for its whole lifetime.
///
/// Fields are read-only after construction; concurrent `execute` and
/// `sign_message` calls each open their own browser session.
pub struct KeychainAccount {
    address: String,
    chain_id: ChainId,
    rpc_url: String,
    session: Arc<KeychainSession>,
}

impl std::fmt::Debug for KeychainAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeychainAccount")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("rpc_url", &self.rpc_url)
            .finish()
    }
}

impl KeychainAccount {
    /// Bind an account; empty `address` or `rpc_url` is rejected.
    pub fn new(
        address: impl Into<String>,
        chain_id: ChainId,
        rpc_url: impl Into<String>,
        session: Arc<KeychainSession>,
    ) -> Result<Self> {
        let address = address.into();
        let rpc_url = rpc_url.into();
        if address.is_empty() {
            return Err(KeychainError::MissingField("address"));
        }
        if rpc_url.is_empty() {
            return Err(KeychainError::MissingField("rpc_url"));
        }
        Ok(Self { address, chain_id, rpc_url, session })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Ask the keychain to execute `calls` in order.
    ///
    /// A cancelled session is not retried; the caller resubmits.
    pub async fn execute(&self, calls: impl Into<CallBatch>) -> Result<InvokeResult> {
        let CallBatch(calls) = calls.into();
        if calls.is_empty() {
            return Err(KeychainError::MissingField("calls"));
        }

        let path = format!("/execute?{}", codec::encode_calls(&calls)?);
        tracing::debug!(address = %self.address, calls = calls.len(), "execute");

        let redirect = self
            .session
            .open(&path, OpenOptions::default())
            .await?
            .into_redirect()?;
        let params = CallbackParams::parse(&redirect)?;
        let transaction_hash = params.require("transaction_hash")?.to_string();

        tracing::info!(%transaction_hash, "transaction submitted");
        Ok(InvokeResult { transaction_hash })
    }

    /// Ask the keychain to sign `typed_data`.
    pub async fn sign_message(&self, typed_data: &TypedData) -> Result<Signature> {
        let path = format!("/sign-message?{}", codec::encode_typed_data(typed_data)?);
        tracing::debug!(
            address = %self.address,
            primary_type = %typed_data.primary_type,
            "sign message"
        );

        let redirect = self
            .session
            .open(&path, OpenOptions::default())
            .await?
            .into_redirect()?;
        let params = CallbackParams::parse(&redirect)?;
        let signature = serde_json::from_str(params.require("signature")?)?;
        Ok(signature)
    }
}

#[async_trait]
impl WalletAccount for KeychainAccount {
    fn address(&self) -> &str {
        KeychainAccount::address(self)
    }

    fn chain_id(&self) -> ChainId {
        KeychainAccount::chain_id(self)
    }

    async fn execute(&self, calls: CallBatch) -> Result<InvokeResult> {
        KeychainAccount::execute(self, calls).await
    }

    async fn sign_message(&self, typed_data: &TypedData) -> Result<Signature> {
        KeychainAccount::sign_message(self, typed_data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keychain_session::{ScriptedBackend, ScriptedReply, SessionConfig};
    use serde_json::json;
    use url::Url;

    fn account(backend: Arc<ScriptedBackend>) -> KeychainAccount {
        let session = KeychainSession::new(SessionConfig::default(), backend).unwrap();
        KeychainAccount::new("0xabc", ChainId::from(1u64), "A", Arc::new(session)).unwrap()
    }

    fn transfer(to: &str) -> Call {
        Call {
            contract_address: "0x1".into(),
            entrypoint: "transfer".into(),
            calldata: json!([to]),
        }
    }

    fn mail() -> TypedData {
        TypedData {
            types: json!({ "Mail": [{ "name": "contents", "type": "felt" }] }),
            primary_type: "Mail".into(),
            domain: json!({ "name": "arcade", "version": "1" }),
            message: json!({ "contents": "0x1" }),
        }
    }

    #[tokio::test]
    async fn test_execute_returns_transaction_hash() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(ScriptedReply::success([("transaction_hash", "0xdeadbeef")]));
        let acc = account(backend.clone());

        let call = Call {
            contract_address: "0x1".into(),
            entrypoint: "transfer".into(),
            calldata: json!([]),
        };
        let result = acc.execute(vec![call.clone()]).await.unwrap();
        assert_eq!(result.transaction_hash, "0xdeadbeef");

        let opened = backend.opened();
        let url = Url::parse(&opened[0].url).unwrap();
        assert_eq!(url.path(), "/execute");
        assert_eq!(codec::decode_calls(url.query().unwrap()).unwrap(), vec![call]);
        assert!(!opened[0].options.prefer_ephemeral_session);
    }

    #[tokio::test]
    async fn test_execute_preserves_call_order() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(ScriptedReply::success([("transaction_hash", "0x2")]));
        let acc = account(backend.clone());

        let calls = vec![transfer("0xa"), transfer("0xb")];
        acc.execute(calls.clone()).await.unwrap();

        let url = Url::parse(&backend.opened()[0].url).unwrap();
        let sent: Vec<_> = url
            .query_pairs()
            .filter(|(k, _)| k == "calls")
            .map(|(_, v)| serde_json::from_str::<Call>(&v).unwrap())
            .collect();
        assert_eq!(sent, calls);
    }

    #[tokio::test]
    async fn test_execute_single_call() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(ScriptedReply::success([("transaction_hash", "0x3")]));
        let acc = account(backend);
        assert_eq!(acc.execute(transfer("0xa")).await.unwrap().transaction_hash, "0x3");
    }

    #[tokio::test]
    async fn test_execute_dismiss_is_cancellation() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(ScriptedReply::Dismiss);
        let acc = account(backend);

        let err = acc.execute(transfer("0xa")).await.unwrap_err();
        assert!(err.is_user_cancelled());
        assert_eq!(err.to_string(), "User cancelled");
        assert_eq!(acc.address(), "0xabc");
        assert_eq!(acc.rpc_url(), "A");
    }

    #[tokio::test]
    async fn test_execute_missing_hash() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(ScriptedReply::success([("status", "ok")]));
        let acc = account(backend);

        let err = acc.execute(transfer("0xa")).await.unwrap_err();
        assert_eq!(err.to_string(), "transaction_hash not found");
    }

    #[tokio::test]
    async fn test_execute_empty_batch_opens_nothing() {
        let backend = Arc::new(ScriptedBackend::new());
        let acc = account(backend.clone());
        assert!(acc.execute(Vec::new()).await.is_err());
        assert!(backend.opened().is_empty());
    }

    #[tokio::test]
    async fn test_sign_message() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(ScriptedReply::success([("signature", r#"["0x11","0x22"]"#)]));
        let acc = account(backend.clone());

        let sig = acc.sign_message(&mail()).await.unwrap();
        assert_eq!(sig, Signature(vec!["0x11".into(), "0x22".into()]));

        let url = Url::parse(&backend.opened()[0].url).unwrap();
        assert_eq!(url.path(), "/sign-message");
        assert_eq!(
            codec::decode_typed_data(url.query().unwrap()).unwrap(),
            Some(mail())
        );
    }

    #[tokio::test]
    async fn test_sign_message_failures() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(ScriptedReply::success([("address", "0xabc")]));
        backend.push(ScriptedReply::Cancel);
        backend.push(ScriptedReply::success([("signature", "not json")]));
        let acc = account(backend);

        let err = acc.sign_message(&mail()).await.unwrap_err();
        assert_eq!(err.to_string(), "signature not found");
        assert!(acc.sign_message(&mail()).await.unwrap_err().is_user_cancelled());
        assert!(matches!(
            acc.sign_message(&mail()).await,
            Err(KeychainError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(ScriptedReply::success([("transaction_hash", "0x4")]));
        let acc: Arc<dyn WalletAccount> = Arc::new(account(backend));

        assert_eq!(acc.address(), "0xabc");
        assert_eq!(acc.chain_id(), ChainId::from(1u64));
        let result = acc.execute(transfer("0xa").into()).await.unwrap();
        assert_eq!(result.transaction_hash, "0x4");
    }

    #[test]
    fn test_new_rejects_empty_fields() {
        let session = Arc::new(
            KeychainSession::new(SessionConfig::default(), Arc::new(ScriptedBackend::new()))
                .unwrap(),
        );
        assert!(KeychainAccount::new("", ChainId::from(1u64), "A", session.clone()).is_err());
        assert!(KeychainAccount::new("0xabc", ChainId::from(1u64), "", session).is_err());
    }
}
