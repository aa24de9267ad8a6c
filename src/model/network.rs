use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};

/// An EVM network the client can trade on.
///
/// The router and WETH addresses are fixed per network: every swap goes
/// through `router` along a two-hop path anchored on `weth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Human-readable network name (e.g. "sepolia").
    pub name: String,
    /// EVM chain ID.
    pub chain_id: u64,
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Block explorer base URL, offered to the wallet when registering the network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Symbol of the native currency.
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    /// Uniswap V2 style router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<Address>,
    /// Wrapped native token used as the swap path anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weth: Option<Address>,
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

/// Native currency decimals on every supported network.
pub const NATIVE_DECIMALS: u8 = 18;

// ── Methods ──────────────────────────────────────────────────────────

impl Network {
    /// Chain ID in the `0x`-prefixed hex form wallets report from `eth_chainId`.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// Replace the RPC endpoint, keeping everything else.
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Whether swaps can be routed on this network.
    pub fn supports_swaps(&self) -> bool {
        self.router.is_some() && self.weth.is_some()
    }
}

// ── Convenience constructors ─────────────────────────────────────────

impl Network {
    /// Sepolia testnet, the default target network.
    pub fn sepolia() -> Self {
        Network {
            name: "sepolia".into(),
            chain_id: 11_155_111,
            rpc_url: "https://rpc.sepolia.org".into(),
            explorer_url: Some("https://sepolia.etherscan.io".into()),
            native_symbol: default_native_symbol(),
            router: Some(address!("C532a74256D3Db42D0Bf7a0400fEFDbad7694008")),
            weth: Some(address!("5f207d42F869fd1c71d7f0f81a2A67Fc20FF7323")),
        }
    }

    pub fn ethereum() -> Self {
        Network {
            name: "ethereum".into(),
            chain_id: 1,
            rpc_url: "https://eth.llamarpc.com".into(),
            explorer_url: Some("https://etherscan.io".into()),
            native_symbol: default_native_symbol(),
            router: Some(address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D")),
            weth: Some(address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")),
        }
    }

    /// Look up a built-in network by name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "sepolia" => Some(Self::sepolia()),
            "ethereum" | "mainnet" => Some(Self::ethereum()),
            _ => None,
        }
    }

    /// Custom network with no router configured.
    pub fn custom(name: impl Into<String>, chain_id: u64, rpc_url: impl Into<String>) -> Self {
        Network {
            name: name.into(),
            chain_id,
            rpc_url: rpc_url.into(),
            explorer_url: None,
            native_symbol: default_native_symbol(),
            router: None,
            weth: None,
        }
    }
}

// ── Display ──────────────────────────────────────────────────────────

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id_hex())
    }
}
