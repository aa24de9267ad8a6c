use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InvalidAllocationError;

use super::token::{AllocationMap, TokenSnapshot};

/// Default tolerance, in percentage points, for the targets summing to 100.
pub const DEFAULT_EPSILON: f64 = 0.01;

/// User-edited target percentages per token symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationRequest {
    targets: BTreeMap<String, f64>,
}

impl AllocationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill from the current allocation, rounded to 3 decimals.
    pub fn from_current(current: &AllocationMap) -> Self {
        let targets = current
            .iter()
            .map(|(symbol, pct)| (symbol.clone(), (pct * 1000.0).round() / 1000.0))
            .collect();
        AllocationRequest { targets }
    }

    pub fn set(&mut self, symbol: impl Into<String>, percent: f64) {
        self.targets.insert(symbol.into(), percent);
    }

    pub fn remove(&mut self, symbol: &str) -> Option<f64> {
        self.targets.remove(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.targets.get(symbol).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn total(&self) -> f64 {
        self.targets.values().sum()
    }

    pub fn targets(&self) -> &BTreeMap<String, f64> {
        &self.targets
    }

    /// Holds iff every target is a finite number `>= 0` and the targets sum
    /// to 100 within `epsilon`.
    pub fn is_valid(&self, epsilon: f64) -> bool {
        self.validate(epsilon).is_ok()
    }

    pub fn validate(&self, epsilon: f64) -> Result<(), InvalidAllocationError> {
        if self.targets.is_empty() {
            return Err(InvalidAllocationError::Empty);
        }
        for (symbol, &value) in &self.targets {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidAllocationError::InvalidPercent {
                    symbol: symbol.clone(),
                    value,
                });
            }
        }
        let total = self.total();
        if (total - 100.0).abs() >= epsilon {
            return Err(InvalidAllocationError::BadTotal { total, epsilon });
        }
        Ok(())
    }

    /// `validate` plus: every targeted symbol must be held.
    pub fn validate_against(
        &self,
        snapshot: &TokenSnapshot,
        epsilon: f64,
    ) -> Result<(), InvalidAllocationError> {
        self.validate(epsilon)?;
        if let Some(unknown) = self.targets.keys().find(|s| !snapshot.contains(s)) {
            return Err(InvalidAllocationError::UnknownToken(unknown.clone()));
        }
        Ok(())
    }

    /// Keep targets for symbols still held; prefill from `current` when
    /// nothing survives.
    pub fn reconcile(&mut self, snapshot: &TokenSnapshot, current: &AllocationMap) {
        self.targets.retain(|symbol, _| snapshot.contains(symbol));
        if self.targets.is_empty() {
            *self = Self::from_current(current);
        }
    }

    /// Replace every target with a parsed allocation.
    ///
    /// Symbols not held are dropped and returned so the caller can warn.
    pub fn apply_parsed(
        &mut self,
        parsed: &BTreeMap<String, f64>,
        snapshot: &TokenSnapshot,
    ) -> Vec<String> {
        self.targets.clear();
        let mut unknown = Vec::new();
        for (symbol, &pct) in parsed {
            if snapshot.contains(symbol) {
                self.targets.insert(symbol.clone(), pct);
            } else {
                unknown.push(symbol.clone());
            }
        }
        unknown
    }
}

/// Parses `ETH=50,TOKA=50` (whitespace tolerated, `%` suffix allowed).
impl FromStr for AllocationRequest {
    type Err = InvalidAllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut request = AllocationRequest::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (symbol, pct) = part
                .split_once('=')
                .ok_or_else(|| InvalidAllocationError::Parse(part.to_string()))?;
            let symbol = symbol.trim();
            let pct: f64 = pct
                .trim()
                .trim_end_matches('%')
                .parse()
                .map_err(|_| InvalidAllocationError::Parse(part.to_string()))?;
            if symbol.is_empty() {
                return Err(InvalidAllocationError::Parse(part.to_string()));
            }
            request.set(symbol, pct);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::token::TokenEntry;

    fn request(entries: &[(&str, f64)]) -> AllocationRequest {
        let mut r = AllocationRequest::new();
        for (s, p) in entries {
            r.set(*s, *p);
        }
        r
    }

    fn held(symbols: &[&str]) -> TokenSnapshot {
        let mut snap = TokenSnapshot::new();
        for s in symbols {
            snap.insert(
                *s,
                TokenEntry {
                    symbol: String::new(),
                    address: None,
                    balance: 1.0,
                    decimals: 18,
                },
            );
        }
        snap
    }

    #[test]
    fn test_valid_allocation() {
        assert!(request(&[("ETH", 50.0), ("TOKA", 50.0)]).is_valid(DEFAULT_EPSILON));
        assert!(request(&[("ETH", 33.333), ("A", 33.333), ("B", 33.334)]).is_valid(0.01));
        assert!(request(&[("ETH", 100.0), ("A", 0.0)]).is_valid(0.01));
    }

    #[test]
    fn test_total_outside_epsilon() {
        let r = request(&[("ETH", 50.0), ("TOKA", 49.95)]);
        assert!(matches!(
            r.validate(0.01),
            Err(InvalidAllocationError::BadTotal { .. })
        ));
        // Same targets pass under the looser tolerance.
        assert!(r.is_valid(0.1));
    }

    #[test]
    fn test_negative_and_nan_rejected() {
        let r = request(&[("ETH", 110.0), ("TOKA", -10.0)]);
        assert_eq!(
            r.validate(0.01),
            Err(InvalidAllocationError::InvalidPercent {
                symbol: "TOKA".into(),
                value: -10.0
            })
        );
        assert!(!request(&[("ETH", f64::NAN)]).is_valid(0.01));
        assert_eq!(
            AllocationRequest::new().validate(0.01),
            Err(InvalidAllocationError::Empty)
        );
    }

    #[test]
    fn test_validate_against_snapshot() {
        let r = request(&[("ETH", 50.0), ("NOPE", 50.0)]);
        assert_eq!(
            r.validate_against(&held(&["ETH", "TOKA"]), 0.01),
            Err(InvalidAllocationError::UnknownToken("NOPE".into()))
        );
    }

    #[test]
    fn test_parse() {
        let r: AllocationRequest = "ETH=50, TOKA = 25%,USDC=25".parse().unwrap();
        assert_eq!(r.get("TOKA"), Some(25.0));
        assert_eq!(r.len(), 3);
        assert!("ETH:50".parse::<AllocationRequest>().is_err());
        assert!("ETH=lots".parse::<AllocationRequest>().is_err());
    }

    #[test]
    fn test_apply_parsed_drops_unknown() {
        let mut r = request(&[("ETH", 100.0)]);
        let parsed: BTreeMap<String, f64> = [("TOKA".to_string(), 60.0), ("XYZ".to_string(), 40.0)]
            .into_iter()
            .collect();
        let unknown = r.apply_parsed(&parsed, &held(&["ETH", "TOKA"]));
        assert_eq!(unknown, vec!["XYZ".to_string()]);
        assert_eq!(r.get("ETH"), None);
        assert_eq!(r.get("TOKA"), Some(60.0));
    }

    #[test]
    fn test_reconcile_prefills_when_empty() {
        let snap = held(&["ETH", "TOKA"]);
        let current: AllocationMap = [("ETH".to_string(), 97.22222), ("TOKA".to_string(), 2.77778)]
            .into_iter()
            .collect();

        let mut r = request(&[("GONE", 100.0)]);
        r.reconcile(&snap, &current);
        assert_eq!(r.get("ETH"), Some(97.222));
        assert_eq!(r.get("TOKA"), Some(2.778));

        let mut kept = request(&[("ETH", 40.0), ("GONE", 60.0)]);
        kept.reconcile(&snap, &current);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.get("ETH"), Some(40.0));
    }
}
