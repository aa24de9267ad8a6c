pub mod local;
pub mod session;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::model::Network;

pub use local::LocalWallet;
pub use session::{NetworkCheckError, NetworkMismatch, WalletSession};

/// An asset the wallet reports as held (`wallet_getAssets`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletAsset {
    /// Asset standard, e.g. "ERC20" or "NATIVE".
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl WalletAsset {
    pub fn erc20(address: Address) -> Self {
        WalletAsset {
            kind: "ERC20".into(),
            address: Some(address),
            symbol: None,
        }
    }

    /// ERC-20 contract address, if this asset is one.
    pub fn erc20_address(&self) -> Option<Address> {
        if self.kind.eq_ignore_ascii_case("erc20") {
            self.address
        } else {
            None
        }
    }
}

/// The wallet capability surface, one method per provider request.
///
/// Every call may suspend indefinitely while the user decides in the wallet UI.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// `eth_accounts`: accounts already authorised, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// `eth_requestAccounts`: prompt the user to authorise accounts.
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// `eth_chainId`.
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// `wallet_switchEthereumChain`. Fails with `UnrecognizedChain` when the
    /// wallet does not know the chain.
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// `wallet_addEthereumChain`.
    async fn add_chain(&self, network: &Network) -> Result<(), WalletError>;

    /// `wallet_getAssets`. Optional; providers without it return `Unsupported`.
    async fn get_assets(&self) -> Result<Vec<WalletAsset>, WalletError>;
}
