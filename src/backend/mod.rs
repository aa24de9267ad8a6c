pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::BackendError;

use types::{
    CalculateRebalanceRequest, CalculateRebalanceResponse, DetectTokensRequest,
    DetectTokensResponse, ParseQueryRequest, ParseQueryResponse, PortfolioAgentRequest,
    PortfolioAgentResponse, ServiceReply,
};

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5001";

/// The external planning service. One request, one response; no retries.
#[async_trait]
pub trait PlannerBackend: Send + Sync {
    /// `POST /api/detect_tokens`
    async fn detect_tokens(
        &self,
        req: &DetectTokensRequest,
    ) -> Result<DetectTokensResponse, BackendError>;

    /// `POST /api/calculate_rebalance`
    async fn calculate_rebalance(
        &self,
        req: &CalculateRebalanceRequest<'_>,
    ) -> Result<CalculateRebalanceResponse, BackendError>;

    /// `POST /api/parse_query`
    async fn parse_query(&self, query: &str) -> Result<ParseQueryResponse, BackendError>;

    /// `POST /api/portfolio-agent`
    async fn portfolio_agent(
        &self,
        req: &PortfolioAgentRequest,
    ) -> Result<PortfolioAgentResponse, BackendError>;
}

// ── HTTP client ───────────────────────────────────────────────────

pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("rebalance-flow/0.1")
            .build()?;
        Ok(BackendClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body and decode the reply.
    ///
    /// An `error` field in the body wins over the HTTP status; a non-2xx status
    /// without one is reported with the raw body.
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned + ServiceReply,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "backend request");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<R>(&text) {
            Ok(reply) => {
                if let Some(msg) = reply.service_error() {
                    return Err(BackendError::Service(msg.to_string()));
                }
                if !status.is_success() {
                    return Err(BackendError::Status {
                        status: status.as_u16(),
                        body: text,
                    });
                }
                Ok(reply)
            }
            Err(_) if !status.is_success() => Err(BackendError::Status {
                status: status.as_u16(),
                body: text,
            }),
            Err(e) => Err(BackendError::Decode(e)),
        }
    }
}

#[async_trait]
impl PlannerBackend for BackendClient {
    async fn detect_tokens(
        &self,
        req: &DetectTokensRequest,
    ) -> Result<DetectTokensResponse, BackendError> {
        self.post("/api/detect_tokens", req).await
    }

    async fn calculate_rebalance(
        &self,
        req: &CalculateRebalanceRequest<'_>,
    ) -> Result<CalculateRebalanceResponse, BackendError> {
        self.post("/api/calculate_rebalance", req).await
    }

    async fn parse_query(&self, query: &str) -> Result<ParseQueryResponse, BackendError> {
        let req = ParseQueryRequest {
            query: query.to_string(),
        };
        self.post("/api/parse_query", &req).await
    }

    async fn portfolio_agent(
        &self,
        req: &PortfolioAgentRequest,
    ) -> Result<PortfolioAgentResponse, BackendError> {
        self.post("/api/portfolio-agent", req).await
    }
}
