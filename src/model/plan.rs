use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::token::{AllocationMap, PriceMap};

/// Direction of a rebalance action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Spend native currency to acquire the token.
    Buy,
    /// Swap the token for native currency.
    Sell,
    /// Anything the planner sends that is neither; never executed.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionKind::Buy => "buy",
            ActionKind::Sell => "sell",
            ActionKind::Unknown => "unknown",
        };
        f.pad(s)
    }
}

/// One step of a plan as received from the planner.
///
/// `amount` is kept as raw JSON: the planner may send a number, a numeric
/// string, or nothing at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceAction {
    pub token: String,
    pub action: ActionKind,
    #[serde(default)]
    pub amount: serde_json::Value,
    #[serde(default)]
    pub percentage_change: Option<f64>,
}

impl RebalanceAction {
    pub fn new(token: impl Into<String>, action: ActionKind, amount: f64) -> Self {
        RebalanceAction {
            token: token.into(),
            action,
            amount: serde_json::json!(amount),
            percentage_change: None,
        }
    }

    /// The amount as a finite decimal, if it is one.
    pub fn parsed_amount(&self) -> Option<f64> {
        let value = match &self.amount {
            serde_json::Value::Number(n) => n.as_f64()?,
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }
}

/// Planner output. Actions execute in array order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RebalancePlan {
    #[serde(default, rename = "rebalance_actions")]
    pub actions: Vec<RebalanceAction>,
    #[serde(default)]
    pub current_allocation: AllocationMap,
    #[serde(default)]
    pub target_allocation: BTreeMap<String, f64>,
    #[serde(default)]
    pub token_prices: PriceMap,
    #[serde(default)]
    pub total_value: f64,
}

impl RebalancePlan {
    /// No actions means the portfolio already matches the target.
    pub fn is_balanced(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_amount_variants() {
        let mut a = RebalanceAction::new("X", ActionKind::Sell, 1.25);
        assert_eq!(a.parsed_amount(), Some(1.25));

        a.amount = serde_json::json!(" 0.5 ");
        assert_eq!(a.parsed_amount(), Some(0.5));

        a.amount = serde_json::json!("abc");
        assert_eq!(a.parsed_amount(), None);

        a.amount = serde_json::Value::Null;
        assert_eq!(a.parsed_amount(), None);

        a.amount = serde_json::json!("inf");
        assert_eq!(a.parsed_amount(), None);
    }

    #[test]
    fn test_deserialize_plan() {
        let json = r#"{
            "total_value": 3600.0,
            "current_allocation": {"ETH": 97.22, "TOKA": 2.78},
            "target_allocation": {"ETH": 50, "TOKA": 50},
            "rebalance_actions": [
                {"token": "ETH", "action": "sell", "amount": 0.4857, "percentage_change": 47.22},
                {"token": "TOKA", "action": "buy", "amount": 1700.0, "percentage_change": 47.22},
                {"token": "TOKB", "action": "hold"}
            ],
            "token_prices": {"ETH": 3500, "TOKA": 1.0}
        }"#;
        let plan: RebalancePlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.actions.len(), 3);
        assert_eq!(plan.actions[0].action, ActionKind::Sell);
        assert_eq!(plan.actions[2].action, ActionKind::Unknown);
        assert_eq!(plan.actions[2].parsed_amount(), None);
        assert_eq!(plan.token_prices["ETH"], 3500.0);
        assert!(!plan.is_balanced());
    }
}
