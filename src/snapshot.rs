//! Token Snapshot detection.

use alloy::primitives::Address;
use tracing::{debug, info, warn};

use crate::backend::PlannerBackend;
use crate::backend::types::DetectTokensRequest;
use crate::error::DetectionError;
use crate::model::{PriceMap, TokenSnapshot};
use crate::wallet::{WalletProvider, WalletSession};

/// Price assumed for the native currency when the backend sends none.
pub const FALLBACK_NATIVE_PRICE: f64 = 3500.0;
/// Price assumed for every other token when the backend sends none.
pub const FALLBACK_TOKEN_PRICE: f64 = 1.0;

/// A freshly detected snapshot with the prices that came with it.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedPortfolio {
    pub snapshot: TokenSnapshot,
    pub prices: PriceMap,
    /// Whether `prices` came from the backend rather than the fallbacks.
    pub live_prices: bool,
}

/// Token addresses to ask the backend about: the wallet's ERC-20 assets
/// (best effort) followed by the custom list, deduplicated in first-seen order.
pub async fn candidate_addresses(
    wallet: &dyn WalletProvider,
    custom_tokens: &[Address],
) -> Vec<Address> {
    let assets = match wallet.get_assets().await {
        Ok(assets) => assets,
        Err(e) => {
            debug!("wallet_getAssets unavailable, continuing without it: {e}");
            Vec::new()
        }
    };

    let mut addresses: Vec<Address> = Vec::new();
    for addr in assets
        .iter()
        .filter_map(|a| a.erc20_address())
        .chain(custom_tokens.iter().copied())
    {
        if !addresses.contains(&addr) {
            addresses.push(addr);
        }
    }
    addresses
}

/// Detect current holdings for the session's account.
///
/// On error nothing is returned, so the caller's previous snapshot stays as is.
pub async fn detect(
    wallet: &dyn WalletProvider,
    backend: &dyn PlannerBackend,
    session: &WalletSession,
    custom_tokens: &[Address],
) -> Result<DetectedPortfolio, DetectionError> {
    let addresses = candidate_addresses(wallet, custom_tokens).await;
    let req = DetectTokensRequest {
        wallet_address: session.address.to_checksum(None),
        token_addresses: addresses.iter().map(|a| a.to_checksum(None)).collect(),
    };
    let response = backend.detect_tokens(&req).await?;

    let mut snapshot = TokenSnapshot::new();
    for (symbol, entry) in response.tokens.iter() {
        if !entry.balance.is_finite() || entry.balance < 0.0 {
            return Err(DetectionError::InvalidBalance {
                symbol: symbol.to_string(),
                balance: entry.balance,
            });
        }
        snapshot.insert(symbol, entry.clone());
    }

    let (prices, live_prices) = match response.prices {
        Some(prices) => (sanitize_prices(prices), true),
        None => (fallback_prices(&snapshot), false),
    };

    info!(
        tokens = snapshot.len(),
        candidates = addresses.len(),
        live_prices,
        "Detected portfolio"
    );
    Ok(DetectedPortfolio {
        snapshot,
        prices,
        live_prices,
    })
}

/// Zero out prices that are NaN, infinite or negative.
pub fn sanitize_prices(mut prices: PriceMap) -> PriceMap {
    for (symbol, price) in prices.iter_mut() {
        if !price.is_finite() || *price < 0.0 {
            warn!(%symbol, price = *price, "Ignoring invalid price");
            *price = 0.0;
        }
    }
    prices
}

/// Placeholder prices for a snapshot the backend did not price.
pub fn fallback_prices(snapshot: &TokenSnapshot) -> PriceMap {
    snapshot
        .iter()
        .map(|(symbol, entry)| {
            let price = if entry.is_native() || symbol == "ETH" {
                FALLBACK_NATIVE_PRICE
            } else {
                FALLBACK_TOKEN_PRICE
            };
            (symbol.to_string(), price)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TokenEntry;

    #[test]
    fn test_invalid_prices_are_zeroed() {
        let prices = PriceMap::from([
            ("ETH".to_string(), 3500.0),
            ("NAN".to_string(), f64::NAN),
            ("NEG".to_string(), -2.0),
            ("INF".to_string(), f64::INFINITY),
        ]);
        let prices = sanitize_prices(prices);
        assert_eq!(prices["ETH"], 3500.0);
        assert_eq!(prices["NAN"], 0.0);
        assert_eq!(prices["NEG"], 0.0);
        assert_eq!(prices["INF"], 0.0);
    }

    #[test]
    fn test_fallback_prices() {
        let mut snap = TokenSnapshot::new();
        snap.insert(
            "ETH",
            TokenEntry {
                symbol: String::new(),
                address: None,
                balance: 1.0,
                decimals: 18,
            },
        );
        snap.insert(
            "TOKA",
            TokenEntry {
                symbol: String::new(),
                address: Some(Address::repeat_byte(1)),
                balance: 5.0,
                decimals: 6,
            },
        );
        let prices = fallback_prices(&snap);
        assert_eq!(prices["ETH"], 3500.0);
        assert_eq!(prices["TOKA"], 1.0);
    }
}
