use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse};
use alloy::primitives::utils::parse_units;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use tracing::debug;

use crate::error::{SwapError, USER_REJECTED_CODE};
use crate::model::Network;

use super::SwapRouter;

// ── Contract interfaces ────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IUniswapV2Router02 {
        function swapExactETHForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable returns (uint256[] memory amounts);
        function swapExactTokensForETH(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
    }
}

// ── Utility functions ──────────────────────────────────────────────

/// Convert a decimal token amount to base units.
///
/// Goes through the shortest decimal text of `amount`, so `1.1` converts
/// exactly. Digits past `decimals` are truncated.
pub fn to_token_units(amount: f64, decimals: u8) -> Result<U256, SwapError> {
    let text = amount.to_string();
    if !amount.is_finite() || amount < 0.0 {
        return Err(SwapError::InvalidAmount(text, "not a non-negative number".into()));
    }
    parse_units(&text, decimals)
        .map(Into::<U256>::into)
        .map_err(|e| SwapError::InvalidAmount(text, e.to_string()))
}

/// Convert base units back to a decimal amount.
pub fn from_token_units(units: U256, decimals: u8) -> f64 {
    let divisor = 10f64.powi(decimals as i32);
    units.saturating_to::<u128>() as f64 / divisor
}

/// Format an address for display (shortened).
pub fn short_addr(addr: &Address) -> String {
    let s = format!("{addr}");
    if s.len() > 10 {
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    } else {
        s
    }
}

fn classify(err: alloy::contract::Error) -> SwapError {
    if let alloy::contract::Error::TransportError(e) = &err {
        if let Some(payload) = e.as_error_resp() {
            if payload.code == USER_REJECTED_CODE {
                return SwapError::Rejected(payload.message.to_string());
            }
        }
    }
    SwapError::Rpc(err.to_string())
}

/// Wait for the provider's receipt and turn a failed status into `Reverted`.
async fn confirm(pending: PendingTransactionBuilder<Ethereum>) -> Result<TxHash, SwapError> {
    let hash = *pending.tx_hash();
    debug!(tx = %hash, "submitted");
    let receipt = pending
        .get_receipt()
        .await
        .map_err(|e| SwapError::Rpc(format!("receipt for {hash}: {e}")))?;
    if !receipt.status() {
        return Err(SwapError::Reverted(receipt.transaction_hash()));
    }
    Ok(receipt.transaction_hash())
}

// ── Router ─────────────────────────────────────────────────────────

/// Uniswap V2 style router reached over JSON-RPC, signing with a local key.
pub struct EvmRouter {
    signer: PrivateKeySigner,
    rpc_url: String,
    router: Address,
    weth: Address,
}

impl EvmRouter {
    pub fn new(network: &Network, signer: PrivateKeySigner) -> Result<Self, SwapError> {
        let router = network.router.ok_or(SwapError::NoRouter)?;
        let weth = network.weth.ok_or(SwapError::NoRouter)?;
        Ok(EvmRouter {
            signer,
            rpc_url: network.rpc_url.clone(),
            router,
            weth,
        })
    }

    fn provider(&self) -> Result<impl Provider + Clone, SwapError> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let url = self
            .rpc_url
            .parse::<reqwest::Url>()
            .map_err(|e| SwapError::Rpc(format!("invalid rpc url {}: {e}", self.rpc_url)))?;
        Ok(ProviderBuilder::new().wallet(wallet).connect_http(url))
    }
}

#[async_trait]
impl SwapRouter for EvmRouter {
    fn router_address(&self) -> Address {
        self.router
    }

    fn weth_address(&self) -> Address {
        self.weth
    }

    fn account(&self) -> Address {
        self.signer.address()
    }

    async fn allowance(&self, token: Address) -> Result<U256, SwapError> {
        let provider = self.provider()?;
        IERC20::new(token, &provider)
            .allowance(self.account(), self.router)
            .call()
            .await
            .map_err(classify)
    }

    async fn approve(&self, token: Address, amount: U256) -> Result<TxHash, SwapError> {
        let provider = self.provider()?;
        let pending = IERC20::new(token, &provider)
            .approve(self.router, amount)
            .send()
            .await
            .map_err(classify)?;
        confirm(pending).await
    }

    async fn swap_exact_eth_for_tokens(
        &self,
        value: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        deadline: U256,
    ) -> Result<TxHash, SwapError> {
        let provider = self.provider()?;
        let pending = IUniswapV2Router02::new(self.router, &provider)
            .swapExactETHForTokens(amount_out_min, path, self.account(), deadline)
            .value(value)
            .send()
            .await
            .map_err(classify)?;
        confirm(pending).await
    }

    async fn swap_exact_tokens_for_eth(
        &self,
        amount_in: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        deadline: U256,
    ) -> Result<TxHash, SwapError> {
        let provider = self.provider()?;
        let pending = IUniswapV2Router02::new(self.router, &provider)
            .swapExactTokensForETH(amount_in, amount_out_min, path, self.account(), deadline)
            .send()
            .await
            .map_err(classify)?;
        confirm(pending).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_units() {
        assert_eq!(
            to_token_units(5.0, 18).unwrap(),
            U256::from(5_000_000_000_000_000_000u128)
        );
        assert_eq!(to_token_units(1.5, 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(from_token_units(U256::from(2_500_000u64), 6), 2.5);
    }

    #[test]
    fn test_token_units_exact_for_non_binary_decimals() {
        assert_eq!(
            to_token_units(1.1, 18).unwrap(),
            U256::from(1_100_000_000_000_000_000u128)
        );
        assert_eq!(
            to_token_units(123.456789, 18).unwrap(),
            U256::from(123_456_789_000_000_000_000u128)
        );
        assert_eq!(to_token_units(0.1, 6).unwrap(), U256::from(100_000u64));
    }

    #[test]
    fn test_token_units_rejects_non_finite() {
        assert!(matches!(
            to_token_units(f64::NAN, 18),
            Err(SwapError::InvalidAmount(..))
        ));
        assert!(matches!(
            to_token_units(f64::INFINITY, 6),
            Err(SwapError::InvalidAmount(..))
        ));
    }

    #[test]
    fn test_short_addr() {
        let addr = Network::sepolia().router.unwrap();
        assert_eq!(short_addr(&addr).to_lowercase(), "0xc532...4008");
    }

    #[test]
    fn test_router_requires_configured_addresses() {
        let signer: PrivateKeySigner =
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                .parse()
                .unwrap();
        let custom = Network::custom("anvil", 31337, "http://127.0.0.1:8545");
        assert!(matches!(
            EvmRouter::new(&custom, signer.clone()),
            Err(SwapError::NoRouter)
        ));
        let router = EvmRouter::new(&Network::sepolia(), signer).unwrap();
        assert_eq!(router.weth_address(), Network::sepolia().weth.unwrap());
    }
}
