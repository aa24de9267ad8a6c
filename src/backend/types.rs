use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{PriceMap, RebalancePlan, TokenSnapshot};

// ── detect_tokens ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectTokensRequest {
    pub wallet_address: String,
    pub token_addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectTokensResponse {
    #[serde(default)]
    pub wallet: Option<String>,
    #[serde(default)]
    pub tokens: TokenSnapshot,
    #[serde(default)]
    pub prices: Option<PriceMap>,
    #[serde(default)]
    pub error: Option<String>,
}

// ── calculate_rebalance ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CalculateRebalanceRequest<'a> {
    pub tokens: &'a TokenSnapshot,
    pub target_allocation: &'a BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculateRebalanceResponse {
    #[serde(flatten)]
    pub plan: RebalancePlan,
    #[serde(default)]
    pub error: Option<String>,
}

// ── parse_query ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseQueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseQueryResponse {
    #[serde(default)]
    pub parsed_allocation: BTreeMap<String, f64>,
    #[serde(default)]
    pub error: Option<String>,
}

// ── portfolio-agent ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAgentRequest {
    pub user_message: String,
    pub wallet_address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioAgentResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub data: Option<AgentData>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    #[serde(default)]
    pub trending_tokens: Vec<TrendingToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingToken {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
}

/// Every backend reply may carry an `error` field instead of a payload.
pub trait ServiceReply {
    fn service_error(&self) -> Option<&str>;
}

macro_rules! impl_service_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ServiceReply for $ty {
                fn service_error(&self) -> Option<&str> {
                    self.error.as_deref()
                }
            }
        )*
    };
}

impl_service_reply!(
    DetectTokensResponse,
    CalculateRebalanceResponse,
    ParseQueryResponse,
    PortfolioAgentResponse,
);
