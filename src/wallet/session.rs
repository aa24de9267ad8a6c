use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::WalletError;
use crate::model::Network;

use super::WalletProvider;

/// The single active wallet connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub address: Address,
    pub chain_id: u64,
}

/// Chain-id mismatch, carrying the remediation the caller can trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkMismatch {
    pub expected: Network,
    pub actual: u64,
}

impl NetworkMismatch {
    /// Ask the wallet to switch to the expected network, registering it first
    /// when the wallet does not know it. The interrupted operation is not retried.
    pub async fn remediate(&self, provider: &dyn WalletProvider) -> Result<(), WalletError> {
        switch_network(provider, &self.expected).await
    }
}

/// Why [`WalletSession::ensure_network`] did not pass.
#[derive(Debug)]
pub enum NetworkCheckError {
    /// The wallet is on another chain.
    Mismatch(NetworkMismatch),
    /// The wallet could not report its chain.
    Provider(WalletError),
}

impl From<NetworkCheckError> for WalletError {
    fn from(e: NetworkCheckError) -> Self {
        match e {
            NetworkCheckError::Mismatch(m) => m.into(),
            NetworkCheckError::Provider(e) => e,
        }
    }
}

impl From<NetworkMismatch> for WalletError {
    fn from(m: NetworkMismatch) -> Self {
        WalletError::WrongNetwork {
            expected: m.expected.chain_id,
            actual: m.actual,
        }
    }
}

impl WalletSession {
    /// Prompt for accounts and record the current chain.
    pub async fn connect(provider: &dyn WalletProvider) -> Result<Self, WalletError> {
        let accounts = provider.request_accounts().await?;
        Self::from_accounts(provider, &accounts).await
    }

    /// Resume a session the wallet already authorised, without prompting.
    pub async fn restore(provider: &dyn WalletProvider) -> Result<Option<Self>, WalletError> {
        let accounts = provider.accounts().await?;
        if accounts.is_empty() {
            return Ok(None);
        }
        Self::from_accounts(provider, &accounts).await.map(Some)
    }

    async fn from_accounts(
        provider: &dyn WalletProvider,
        accounts: &[Address],
    ) -> Result<Self, WalletError> {
        let address = *accounts.first().ok_or(WalletError::NoAccounts)?;
        let chain_id = provider.chain_id().await?;
        info!(account = %address, "Connected on chain {chain_id:#x}");
        Ok(WalletSession { address, chain_id })
    }

    /// Refresh the chain id and compare it against `expected`.
    ///
    /// A wallet that cannot report its chain fails the check; the last known
    /// chain id is never trusted in its place.
    pub async fn ensure_network(
        &mut self,
        provider: &dyn WalletProvider,
        expected: &Network,
    ) -> Result<(), NetworkCheckError> {
        let chain_id = provider.chain_id().await.map_err(|e| {
            warn!("eth_chainId failed: {e}");
            NetworkCheckError::Provider(e)
        })?;
        self.chain_id = chain_id;
        if chain_id == expected.chain_id {
            Ok(())
        } else {
            Err(NetworkCheckError::Mismatch(NetworkMismatch {
                expected: expected.clone(),
                actual: chain_id,
            }))
        }
    }
}

/// `wallet_switchEthereumChain`, falling back to `wallet_addEthereumChain`
/// plus a second switch when the chain is unknown to the wallet.
pub async fn switch_network(
    provider: &dyn WalletProvider,
    network: &Network,
) -> Result<(), WalletError> {
    match provider.switch_chain(network.chain_id).await {
        Ok(()) => Ok(()),
        Err(WalletError::UnrecognizedChain(_)) => {
            info!("Wallet does not know {network}; registering it");
            provider.add_chain(network).await?;
            provider.switch_chain(network.chain_id).await
        }
        Err(e) => Err(e),
    }
}
