//! Connector adapter exposing the keychain provider to the app's wallet
//! framework, plus the factory that builds the provider/connector pair.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use keychain_account::WalletAccount;
use keychain_provider::{KeychainProvider, ProviderConfig};
use keychain_session::{AuthSessionBackend, KeychainSession, SessionConfig};
use keychain_types::{ChainId, KeychainError, Result};

/// Identifier the wallet framework uses to look this connector up.
pub const KEYCHAIN_CONNECTOR_ID: &str = "controller";
pub const KEYCHAIN_CONNECTOR_NAME: &str = "Controller";

const KEYCHAIN_ICON: &str = "https://x.cartridge.gg/favicon.svg";

/// Icon URLs per color scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorIcon {
    pub dark: String,
    pub light: String,
}

/// What `connect` hands back to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorData {
    pub account: String,
    pub chain_id: ChainId,
}

/// App-wide wallet connector interface.
#[async_trait]
pub trait WalletConnector: Send + Sync + 'static {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn icon(&self) -> &ConnectorIcon;
    fn available(&self) -> bool;
    async fn ready(&self) -> Result<bool>;
    async fn connect(&self) -> Result<ConnectorData>;
    async fn disconnect(&self) -> Result<()>;
    async fn account(&self) -> Result<Arc<dyn WalletAccount>>;
    async fn chain_id(&self) -> Result<ChainId>;

    /// Concrete connector access for `from_connectors`-style lookups.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Connector backed by a [`KeychainProvider`].
pub struct KeychainConnector {
    provider: Arc<KeychainProvider>,
    icon: ConnectorIcon,
}

impl std::fmt::Debug for KeychainConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeychainConnector")
            .field("id", &KEYCHAIN_CONNECTOR_ID)
            .field("provider", &self.provider)
            .finish()
    }
}

impl KeychainConnector {
    /// Wrap `provider`; the connector shares its account state.
    pub fn new(provider: Arc<KeychainProvider>) -> Self {
        Self {
            provider,
            icon: ConnectorIcon {
                dark: KEYCHAIN_ICON.into(),
                light: KEYCHAIN_ICON.into(),
            },
        }
    }

    /// Provider this connector delegates to.
    pub fn provider(&self) -> &Arc<KeychainProvider> {
        &self.provider
    }

    /// Find the keychain connector among the framework's connectors.
    pub fn from_connectors(connectors: &[Arc<dyn WalletConnector>]) -> Result<Arc<Self>> {
        connectors
            .iter()
            .find(|c| c.id() == KEYCHAIN_CONNECTOR_ID)
            .and_then(|c| c.clone().as_any().downcast::<Self>().ok())
            .ok_or_else(|| KeychainError::ConnectorNotFound(KEYCHAIN_CONNECTOR_ID.into()))
    }
}

#[async_trait]
impl WalletConnector for KeychainConnector {
    fn id(&self) -> &str {
        KEYCHAIN_CONNECTOR_ID
    }

    fn name(&self) -> &str {
        KEYCHAIN_CONNECTOR_NAME
    }

    fn icon(&self) -> &ConnectorIcon {
        &self.icon
    }

    fn available(&self) -> bool {
        true
    }

    // No readiness probe exists yet.
    async fn ready(&self) -> Result<bool> {
        Ok(true)
    }

    async fn connect(&self) -> Result<ConnectorData> {
        let account = self.provider.connect().await?;
        Ok(ConnectorData {
            account: account.address().to_string(),
            chain_id: account.chain_id(),
        })
    }

    async fn disconnect(&self) -> Result<()> {
        self.provider.disconnect();
        Ok(())
    }

    async fn account(&self) -> Result<Arc<dyn WalletAccount>> {
        let account: Arc<dyn WalletAccount> =
            self.provider.account().ok_or(KeychainError::NoAccount)?;
        Ok(account)
    }

    async fn chain_id(&self) -> Result<ChainId> {
        let account = self.provider.account().ok_or(KeychainError::NoAccount)?;
        Ok(account.chain_id())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Provider/connector pair owned by the app's composition root.
#[derive(Debug, Clone)]
pub struct Keychain {
    pub provider: Arc<KeychainProvider>,
    pub connector: Arc<KeychainConnector>,
}

/// Build one provider and its connector around `backend`.
pub fn keychain(
    session_config: SessionConfig,
    provider_config: ProviderConfig,
    backend: Arc<dyn AuthSessionBackend>,
) -> Result<Keychain> {
    let session = Arc::new(KeychainSession::new(session_config, backend)?);
    let provider = Arc::new(KeychainProvider::new(provider_config, session)?);
    let connector = Arc::new(KeychainConnector::new(provider.clone()));
    tracing::debug!(id = KEYCHAIN_CONNECTOR_ID, "keychain connector ready");
    Ok(Keychain { provider, connector })
}
