//! Wallet provider backed by the remote keychain.
//!
//! Two states: disconnected (no account) and connected. `connect` is the
//! only way in, `disconnect` the only way out.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use keychain_account::KeychainAccount;
use keychain_session::{KeychainSession, OpenOptions};
use keychain_types::{
    CallbackParams, Chain, ChainId, KeychainError, Policies, QueryBuilder, Result,
};

pub mod request;

pub use request::{RequestCall, WalletRequest, WalletResponse, SIGN_TYPED_DATA};

/// Provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Accepted networks; the first one is used for the connect handshake.
    pub chains: Vec<Chain>,
    pub default_chain_id: Option<String>,
    pub policies: Policies,
}

/// Events declared by the wallet capability surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged,
    NetworkChanged,
}

/// Callback type for provider events.
pub type ProviderEventHandler = Box<dyn Fn(ProviderEvent) + Send + Sync>;

/// Wallet provider holding the configured chains and the current account.
pub struct KeychainProvider {
    chains: Vec<Chain>,
    default_chain_id: Option<ChainId>,
    policies: Policies,
    session: Arc<KeychainSession>,
    account: RwLock<Option<Arc<KeychainAccount>>>,
}

impl std::fmt::Debug for KeychainProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeychainProvider")
            .field("chains", &self.chains)
            .field("default_chain_id", &self.default_chain_id)
            .field("account", &self.account())
            .finish()
    }
}

impl KeychainProvider {
    /// Validate `config`; at least one chain with an rpc url is required.
    pub fn new(config: ProviderConfig, session: Arc<KeychainSession>) -> Result<Self> {
        if config.chains.is_empty() {
            return Err(KeychainError::InvalidConfig("at least one chain is required".into()));
        }
        if let Some(chain) = config.chains.iter().find(|c| c.rpc_url.is_empty()) {
            return Err(KeychainError::InvalidConfig(format!("empty rpc url in {:?}", chain)));
        }
        let default_chain_id = config
            .default_chain_id
            .as_deref()
            .map(ChainId::parse)
            .transpose()?;

        Ok(Self {
            chains: config.chains,
            default_chain_id,
            policies: config.policies,
            session,
            account: RwLock::new(None),
        })
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn default_chain_id(&self) -> Option<ChainId> {
        self.default_chain_id
    }

    pub fn policies(&self) -> &Policies {
        &self.policies
    }

    /// Current account, if connected.
    pub fn account(&self) -> Option<Arc<KeychainAccount>> {
        self.account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True while an account is held.
    pub fn is_connected(&self) -> bool {
        self.account().is_some()
    }

    /// Authenticate through the keychain and store a fresh account.
    ///
    /// The browser session is ephemeral unless an account is already held,
    /// so a login after `disconnect` never reuses a stale cookie. On any
    /// failure the provider state is left untouched.
    pub async fn connect(&self) -> Result<Arc<KeychainAccount>> {
        let rpc_url = &self.chains[0].rpc_url;
        let query = QueryBuilder::new()
            .append("policies", &serde_json::to_string(&self.policies)?)
            .append("rpc_url", rpc_url)
            .finish();

        let options = OpenOptions {
            prefer_ephemeral_session: !self.is_connected(),
        };
        let redirect = self
            .session
            .open(&format!("/?{}", query), options)
            .await?
            .into_redirect()?;

        let params = CallbackParams::parse(&redirect)?;
        let address = params.require("address")?;
        let chain_id = params.require("chain_id")?;
        let rpc_url = params.require("rpc_url")?;

        let account = Arc::new(KeychainAccount::new(
            address,
            ChainId::parse(chain_id)?,
            rpc_url,
            self.session.clone(),
        )?);

        *self.account.write().unwrap_or_else(PoisonError::into_inner) = Some(account.clone());
        tracing::info!(address, chain_id, "keychain connected");
        Ok(account)
    }

    /// Drop the current account. Idempotent.
    pub fn disconnect(&self) {
        let previous = self
            .account
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(account) = previous {
            tracing::info!(address = account.address(), "keychain disconnected");
        }
    }

    /// Route a generic wallet request to the capability that handles it.
    pub async fn request(&self, call: RequestCall) -> Result<WalletResponse> {
        let request = WalletRequest::try_from(call)?;
        let account = self.account().ok_or(KeychainError::NoAccount)?;
        tracing::debug!(kind = request.kind(), "wallet request");

        match request {
            WalletRequest::SignTypedData(typed_data) => {
                let signature = account.sign_message(&typed_data).await?;
                Ok(WalletResponse::Signature(signature))
            }
        }
    }

    /// Event subscriptions are accepted but never fire.
    pub fn on(&self, event: ProviderEvent, _handler: ProviderEventHandler) {
        tracing::debug!(?event, "provider events are not delivered");
    }

    pub fn off(&self, event: ProviderEvent) {
        tracing::debug!(?event, "provider events are not delivered");
    }

    /// Silent reconnect; not supported yet.
    pub async fn probe(&self) -> Result<Arc<KeychainAccount>> {
        Err(KeychainError::NotSupported("probe"))
    }

    /// Chain switching; not supported yet.
    pub async fn switch_starknet_chain(&self, _chain_id: ChainId) -> Result<bool> {
        Err(KeychainError::NotSupported("switch_starknet_chain"))
    }

    /// Chain registration; not supported yet.
    pub async fn add_starknet_chain(&self, _chain: Chain) -> Result<bool> {
        Err(KeychainError::NotSupported("add_starknet_chain"))
    }

    /// Keychain logout; not supported yet.
    pub async fn logout(&self) -> Result<()> {
        Err(KeychainError::NotSupported("logout"))
    }
}
