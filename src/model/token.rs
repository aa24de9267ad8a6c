use std::collections::BTreeMap;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::network::NATIVE_DECIMALS;

/// Unit price per token symbol. Zero when unknown.
pub type PriceMap = BTreeMap<String, f64>;

/// Percentage of total portfolio value per token symbol.
pub type AllocationMap = BTreeMap<String, f64>;

/// One held token. `address` is `None` for the native currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEntry {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub address: Option<Address>,
    pub balance: f64,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    NATIVE_DECIMALS
}

impl TokenEntry {
    /// Whether this entry is the chain's native currency rather than an ERC-20.
    pub fn is_native(&self) -> bool {
        self.address.is_none_or(|a| a == Address::ZERO)
    }
}

/// Token holdings keyed by symbol, replaced wholesale on every detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSnapshot {
    tokens: BTreeMap<String, TokenEntry>,
}

impl TokenSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. The map key always wins over `entry.symbol`.
    pub fn insert(&mut self, symbol: impl Into<String>, mut entry: TokenEntry) {
        let symbol = symbol.into();
        entry.symbol = symbol.clone();
        self.tokens.insert(symbol, entry);
    }

    pub fn get(&self, symbol: &str) -> Option<&TokenEntry> {
        self.tokens.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.tokens.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TokenEntry)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Value of one token at the given prices. Missing prices count as zero.
    pub fn value_of(&self, symbol: &str, prices: &PriceMap) -> f64 {
        self.tokens
            .get(symbol)
            .map(|t| t.balance * prices.get(symbol).copied().unwrap_or(0.0))
            .unwrap_or(0.0)
    }

    /// Total portfolio value at the given prices.
    pub fn total_value(&self, prices: &PriceMap) -> f64 {
        self.tokens
            .keys()
            .map(|symbol| self.value_of(symbol, prices))
            .sum()
    }

    /// Current allocation in percent of total value.
    ///
    /// When the portfolio is worth nothing (all prices unknown or all balances
    /// zero) every token gets an equal `100 / N` share.
    pub fn current_allocation(&self, prices: &PriceMap) -> AllocationMap {
        let total = self.total_value(prices);
        let n = self.tokens.len() as f64;
        self.tokens
            .keys()
            .map(|symbol| {
                let pct = if total > 0.0 {
                    self.value_of(symbol, prices) / total * 100.0
                } else {
                    100.0 / n
                };
                (symbol.clone(), pct)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(balance: f64) -> TokenEntry {
        TokenEntry {
            symbol: String::new(),
            address: None,
            balance,
            decimals: 18,
        }
    }

    fn snapshot(entries: &[(&str, f64)]) -> TokenSnapshot {
        let mut snap = TokenSnapshot::new();
        for (symbol, balance) in entries {
            snap.insert(*symbol, entry(*balance));
        }
        snap
    }

    #[test]
    fn test_allocation_sums_to_100() {
        let snap = snapshot(&[("ETH", 1.0), ("TOKA", 100.0), ("TOKB", 7.5)]);
        let prices: PriceMap = [("ETH", 3500.0), ("TOKA", 1.0), ("TOKB", 13.0)]
            .into_iter()
            .map(|(s, p)| (s.to_string(), p))
            .collect();

        let alloc = snap.current_allocation(&prices);
        let sum: f64 = alloc.values().sum();
        assert!((sum - 100.0).abs() < 1e-9, "sum={sum}");
        assert!((alloc["ETH"] - 3500.0 / 3697.5 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_value_splits_equally() {
        let snap = snapshot(&[("A", 0.0), ("B", 5.0), ("C", 2.0), ("D", 1.0)]);
        let alloc = snap.current_allocation(&PriceMap::new());
        for pct in alloc.values() {
            assert_eq!(*pct, 25.0);
        }
    }

    #[test]
    fn test_missing_price_counts_as_zero() {
        let snap = snapshot(&[("ETH", 2.0), ("ODD", 1_000.0)]);
        let prices: PriceMap = [("ETH".to_string(), 100.0)].into_iter().collect();
        assert_eq!(snap.total_value(&prices), 200.0);
        let alloc = snap.current_allocation(&prices);
        assert_eq!(alloc["ETH"], 100.0);
        assert_eq!(alloc["ODD"], 0.0);
    }

    #[test]
    fn test_insert_normalizes_symbol() {
        let mut snap = TokenSnapshot::new();
        let mut e = entry(1.0);
        e.symbol = "WRONG".into();
        snap.insert("RIGHT", e);
        assert_eq!(snap.get("RIGHT").map(|t| t.symbol.as_str()), Some("RIGHT"));
        assert!(snap.get("RIGHT").is_some_and(TokenEntry::is_native));
    }

    #[test]
    fn test_deserialize_backend_tokens() {
        let json = r#"{
            "ETH": {"address": null, "decimals": 18, "balance": 1.5, "symbol": "ETH"},
            "TOKA": {"address": "0x5f207d42f869fd1c71d7f0f81a2a67fc20ff7323", "balance": 100, "coingecko_id": "x"}
        }"#;
        let snap: TokenSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.len(), 2);
        let toka = snap.get("TOKA").unwrap();
        assert_eq!(toka.decimals, 18);
        assert!(!toka.is_native());
    }
}
