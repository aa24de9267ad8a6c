#![allow(dead_code)]

use alloy::node_bindings::Anvil;
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::sol;

use rebalance_flow::model::{Network, TokenEntry, TokenSnapshot};

// ── Test-only contract interfaces ────────────────────────────────────

sol! {
    #[sol(rpc)]
    contract IERC20Test {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

// ── Fork context ─────────────────────────────────────────────────────

pub struct ForkContext {
    pub _anvil: alloy::node_bindings::AnvilInstance,
    pub rpc_url: String,
    pub wallet_address: Address,
    pub private_key: String,
}

/// Spawn an Anvil fork of the given chain. `anvil` must be on PATH.
pub fn spawn_fork(fork_url: &str, chain_id: u64) -> ForkContext {
    let anvil = Anvil::new().fork(fork_url).chain_id(chain_id).spawn();

    let rpc_url = anvil.endpoint();
    let wallet_address = anvil.addresses()[0];
    let private_key = hex::encode(anvil.keys()[0].to_bytes());

    ForkContext {
        _anvil: anvil,
        rpc_url,
        wallet_address,
        private_key,
    }
}

/// Mainnet descriptor pointed at the fork.
pub fn fork_network(ctx: &ForkContext) -> Network {
    Network::ethereum().with_rpc_url(ctx.rpc_url.clone())
}

// ── Funding and queries ──────────────────────────────────────────────

/// Fund native ETH via anvil_setBalance.
pub async fn fund_eth(rpc_url: &str, addr: Address, amount: U256) {
    let provider = ProviderBuilder::new().connect_http(rpc_url.parse().unwrap());
    let _: () = provider
        .raw_request("anvil_setBalance".into(), (addr, amount))
        .await
        .expect("anvil_setBalance failed");
}

/// Query ERC20 balance.
pub async fn balance_of(rpc_url: &str, token: Address, account: Address) -> U256 {
    let provider = ProviderBuilder::new().connect_http(rpc_url.parse().unwrap());
    IERC20Test::new(token, &provider)
        .balanceOf(account)
        .call()
        .await
        .expect("balanceOf call failed")
}

/// Query ERC20 allowance.
pub async fn allowance_of(rpc_url: &str, token: Address, owner: Address, spender: Address) -> U256 {
    let provider = ProviderBuilder::new().connect_http(rpc_url.parse().unwrap());
    IERC20Test::new(token, &provider)
        .allowance(owner, spender)
        .call()
        .await
        .expect("allowance call failed")
}

/// Snapshot with native ETH plus one ERC-20.
pub fn snapshot_with(symbol: &str, token: Address, decimals: u8, balance: f64) -> TokenSnapshot {
    let mut snap = TokenSnapshot::new();
    snap.insert(
        "ETH",
        TokenEntry {
            symbol: String::new(),
            address: None,
            balance: 10.0,
            decimals: 18,
        },
    );
    snap.insert(
        symbol,
        TokenEntry {
            symbol: String::new(),
            address: Some(token),
            balance,
            decimals,
        },
    );
    snap
}
