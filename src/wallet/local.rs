use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::WalletError;
use crate::model::Network;

use super::{WalletAsset, WalletProvider};

/// A wallet backed by a local private key and per-network JSON-RPC endpoints.
///
/// Behaves like a browser wallet extension: accounts must be requested before
/// `eth_accounts` reports them, and only registered networks can be switched to.
pub struct LocalWallet {
    signer: Option<PrivateKeySigner>,
    networks: RwLock<HashMap<u64, Network>>,
    active: RwLock<u64>,
    authorised: AtomicBool,
    assets: Vec<WalletAsset>,
}

impl LocalWallet {
    /// `signer == None` models a missing wallet: every request fails with
    /// `ProviderUnavailable`.
    pub fn new(signer: Option<PrivateKeySigner>, active: Network) -> Self {
        let chain_id = active.chain_id;
        let mut networks = HashMap::new();
        networks.insert(chain_id, active);
        LocalWallet {
            signer,
            networks: RwLock::new(networks),
            active: RwLock::new(chain_id),
            authorised: AtomicBool::new(false),
            assets: Vec::new(),
        }
    }

    pub fn from_private_key(private_key: &str, active: Network) -> Result<Self, WalletError> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| WalletError::Transport(format!("invalid private key: {e}")))?;
        Ok(Self::new(Some(signer), active))
    }

    /// Assets reported by `wallet_getAssets`. Without any, the call is unsupported.
    pub fn with_assets(mut self, assets: Vec<WalletAsset>) -> Self {
        self.assets = assets;
        self
    }

    /// Treat the account as already authorised, as a wallet does for a
    /// previously approved site.
    pub fn pre_authorised(self) -> Self {
        self.authorised.store(true, Ordering::SeqCst);
        self
    }

    pub fn signer(&self) -> Result<&PrivateKeySigner, WalletError> {
        self.signer.as_ref().ok_or(WalletError::ProviderUnavailable)
    }

    /// The network the wallet currently points at.
    pub async fn active_network(&self) -> Result<Network, WalletError> {
        let chain_id = *self.active.read().await;
        self.networks
            .read()
            .await
            .get(&chain_id)
            .cloned()
            .ok_or(WalletError::UnrecognizedChain(chain_id))
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        let signer = self.signer()?;
        if self.authorised.load(Ordering::SeqCst) {
            Ok(vec![signer.address()])
        } else {
            Ok(Vec::new())
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let signer = self.signer()?;
        self.authorised.store(true, Ordering::SeqCst);
        info!(account = %signer.address(), "Account authorised");
        Ok(vec![signer.address()])
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        self.signer()?;
        let network = self.active_network().await?;
        let url = network
            .rpc_url
            .parse::<reqwest::Url>()
            .map_err(|e| WalletError::Transport(format!("invalid rpc url {}: {e}", network.rpc_url)))?;
        let provider = ProviderBuilder::new().connect_http(url);
        let id = provider
            .get_chain_id()
            .await
            .map_err(|e| WalletError::Transport(format!("eth_chainId on {network}: {e}")))?;
        debug!(chain_id = id, network = %network.name, "eth_chainId");
        Ok(id)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.signer()?;
        if !self.networks.read().await.contains_key(&chain_id) {
            return Err(WalletError::UnrecognizedChain(chain_id));
        }
        *self.active.write().await = chain_id;
        info!("Switched wallet to chain {chain_id:#x}");
        Ok(())
    }

    async fn add_chain(&self, network: &Network) -> Result<(), WalletError> {
        self.signer()?;
        info!(network = %network, rpc = %network.rpc_url, "Registering network");
        self.networks
            .write()
            .await
            .insert(network.chain_id, network.clone());
        Ok(())
    }

    async fn get_assets(&self) -> Result<Vec<WalletAsset>, WalletError> {
        self.signer()?;
        if self.assets.is_empty() {
            return Err(WalletError::Unsupported("wallet_getAssets"));
        }
        Ok(self.assets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anvil's first dev account.
    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn wallet() -> LocalWallet {
        LocalWallet::from_private_key(TEST_KEY, Network::ethereum()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_signer_is_unavailable() {
        let w = LocalWallet::new(None, Network::sepolia());
        assert!(matches!(
            w.request_accounts().await,
            Err(WalletError::ProviderUnavailable)
        ));
        assert!(matches!(w.accounts().await, Err(WalletError::ProviderUnavailable)));
    }

    #[tokio::test]
    async fn test_accounts_empty_until_requested() {
        let w = wallet();
        assert!(w.accounts().await.unwrap().is_empty());
        let requested = w.request_accounts().await.unwrap();
        assert_eq!(w.accounts().await.unwrap(), requested);
    }

    #[tokio::test]
    async fn test_switch_requires_registration() {
        let w = wallet();
        let sepolia = Network::sepolia();
        assert!(matches!(
            w.switch_chain(sepolia.chain_id).await,
            Err(WalletError::UnrecognizedChain(11_155_111))
        ));
        w.add_chain(&sepolia).await.unwrap();
        w.switch_chain(sepolia.chain_id).await.unwrap();
        assert_eq!(w.active_network().await.unwrap(), sepolia);
    }

    #[tokio::test]
    async fn test_get_assets_unsupported_without_list() {
        let w = wallet();
        assert!(matches!(
            w.get_assets().await,
            Err(WalletError::Unsupported("wallet_getAssets"))
        ));
        let w = wallet().with_assets(vec![WalletAsset::erc20(Address::repeat_byte(7))]);
        assert_eq!(w.get_assets().await.unwrap().len(), 1);
    }
}
