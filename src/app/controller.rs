use alloy::primitives::Address;
use tracing::{info, warn};

use crate::backend::PlannerBackend;
use crate::backend::types::{CalculateRebalanceRequest, PortfolioAgentRequest};
use crate::config::RebalanceSettings;
use crate::error::{PlanningError, RebalanceError, WalletError};
use crate::executor::outcome::ExecutionReport;
use crate::executor::{SwapExecutor, SwapRouter};
use crate::model::{AllocationRequest, Network, RebalancePlan};
use crate::snapshot::{self, DetectedPortfolio};
use crate::wallet::session::switch_network;
use crate::wallet::{NetworkCheckError, WalletProvider, WalletSession};

use super::render::Renderer;
use super::state::{AgentReply, AppState, Event, reduce};
use super::store::SessionStore;

/// Owns the application state and runs every flow against the wallet and
/// the backend. All state changes go through [`reduce`].
pub struct Controller {
    wallet: Box<dyn WalletProvider>,
    backend: Box<dyn PlannerBackend>,
    network: Network,
    settings: RebalanceSettings,
    state: AppState,
    renderers: Vec<Box<dyn Renderer>>,
}

impl Controller {
    pub fn new(
        wallet: Box<dyn WalletProvider>,
        backend: Box<dyn PlannerBackend>,
        network: Network,
        settings: RebalanceSettings,
    ) -> Self {
        Controller {
            wallet,
            backend,
            network,
            settings,
            state: AppState::default(),
            renderers: Vec::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderers.push(renderer);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn settings(&self) -> &RebalanceSettings {
        &self.settings
    }

    fn dispatch(&mut self, event: Event) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, event.clone());
        for renderer in &mut self.renderers {
            renderer.render(&event, &self.state);
        }
    }

    // ── Persistence ──────────────────────────────────────────────────

    pub fn load_session(&mut self, store: &SessionStore) {
        self.dispatch(Event::SessionLoaded {
            custom_tokens: store.custom_tokens.clone(),
            targets: store.last_targets.clone(),
        });
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore {
            custom_tokens: self.state.custom_tokens.clone(),
            last_targets: self.state.allocation.clone(),
            last_account: self.state.session.as_ref().map(|s| s.address),
        }
    }

    // ── Wallet session ───────────────────────────────────────────────

    /// Prompt the wallet for an account, then check the network.
    ///
    /// A missing provider or a declined prompt disables the wallet features
    /// for the rest of the session.
    pub async fn connect(&mut self) -> Result<WalletSession, RebalanceError> {
        let result = WalletSession::connect(self.wallet.as_ref()).await;
        match result {
            Ok(session) => {
                self.dispatch(Event::Connected(session.clone()));
                self.check_network().await?;
                Ok(session)
            }
            Err(e) => Err(self.wallet_failed(e)),
        }
    }

    /// Pick up an account the wallet already authorised, without prompting.
    pub async fn restore(&mut self) -> Result<Option<WalletSession>, RebalanceError> {
        let result = WalletSession::restore(self.wallet.as_ref()).await;
        match result {
            Ok(Some(session)) => {
                self.dispatch(Event::Connected(session.clone()));
                self.check_network().await?;
                Ok(Some(session))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(self.wallet_failed(e)),
        }
    }

    fn wallet_failed(&mut self, err: WalletError) -> RebalanceError {
        match &err {
            WalletError::ProviderUnavailable | WalletError::ConnectionRejected(_) => {
                if self.state.wallet_enabled {
                    self.dispatch(Event::WalletDisabled(err.to_string()));
                }
            }
            _ => self.dispatch(Event::Failed(err.to_string())),
        }
        err.into()
    }

    /// Compare the wallet's chain against the expected network.
    pub async fn check_network(&mut self) -> Result<(), RebalanceError> {
        let Some(session) = self.state.session.as_mut() else {
            return Err(RebalanceError::NotConnected);
        };
        let result = session.ensure_network(self.wallet.as_ref(), &self.network).await;
        match result {
            Ok(()) => {
                let chain_id = session.chain_id;
                self.dispatch(Event::NetworkConfirmed(chain_id));
                Ok(())
            }
            Err(NetworkCheckError::Mismatch(mismatch)) => {
                self.dispatch(Event::WrongNetwork(mismatch.clone()));
                Err(WalletError::from(mismatch).into())
            }
            Err(NetworkCheckError::Provider(e)) => Err(self.wallet_failed(e)),
        }
    }

    /// Ask the wallet to move to the expected network, registering it when
    /// unknown. The operation that hit the mismatch must be re-run by the caller.
    pub async fn switch_network(&mut self) -> Result<(), RebalanceError> {
        let result = switch_network(self.wallet.as_ref(), &self.network).await;
        if let Err(e) = result {
            return Err(self.wallet_failed(e));
        }
        self.dispatch(Event::Info(format!("Switched to {}", self.network)));
        if self.state.session.is_some() {
            self.check_network().await?;
        }
        Ok(())
    }

    /// Forget the session locally. Wallets have no disconnect request.
    pub fn disconnect(&mut self) {
        self.dispatch(Event::Disconnected);
    }

    /// The session, once the wallet is connected and on the expected network.
    async fn ready_session(&mut self) -> Result<WalletSession, RebalanceError> {
        if !self.state.wallet_enabled {
            return Err(WalletError::ProviderUnavailable.into());
        }
        if self.state.session.is_none() {
            return Err(RebalanceError::NotConnected);
        }
        self.check_network().await?;
        self.state
            .session
            .clone()
            .ok_or(RebalanceError::NotConnected)
    }

    // ── Token snapshot ───────────────────────────────────────────────

    /// Re-detect holdings. On failure the previous snapshot stays in place.
    pub async fn detect(&mut self) -> Result<DetectedPortfolio, RebalanceError> {
        let session = self.ready_session().await?;
        let result = snapshot::detect(
            self.wallet.as_ref(),
            self.backend.as_ref(),
            &session,
            &self.state.custom_tokens,
        )
        .await;
        match result {
            Ok(portfolio) => {
                self.dispatch(Event::Detected(portfolio.clone()));
                Ok(portfolio)
            }
            Err(e) => {
                self.dispatch(Event::DetectionFailed(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Track another token contract and re-detect when connected.
    pub async fn add_custom_token(&mut self, address: Address) -> Result<(), RebalanceError> {
        if self.state.custom_tokens.contains(&address) {
            self.dispatch(Event::Info(format!("Token {address} is already tracked")));
            return Ok(());
        }
        self.dispatch(Event::CustomTokenAdded(address));
        if self.state.is_connected() {
            self.detect().await?;
        }
        Ok(())
    }

    // ── Allocation ───────────────────────────────────────────────────

    pub fn set_target(&mut self, symbol: impl Into<String>, percent: f64) {
        self.dispatch(Event::TargetSet {
            symbol: symbol.into(),
            percent,
        });
    }

    pub fn set_targets(&mut self, targets: AllocationRequest) {
        self.dispatch(Event::TargetsReplaced(targets));
    }

    /// Let the backend turn free text into targets. Symbols not held are
    /// dropped with a warning and returned.
    pub async fn apply_query(&mut self, query: &str) -> Result<Vec<String>, RebalanceError> {
        let result = self.backend.parse_query(query).await;
        let parsed = match result {
            Ok(reply) => reply.parsed_allocation,
            Err(e) => {
                self.dispatch(Event::Failed(format!("Could not parse query: {e}")));
                return Err(e.into());
            }
        };

        let mut targets = self.state.allocation.clone();
        let unknown = targets.apply_parsed(&parsed, &self.state.snapshot);
        self.dispatch(Event::TargetsReplaced(targets));
        if !unknown.is_empty() {
            warn!(?unknown, "Parsed allocation names tokens not in the portfolio");
            self.dispatch(Event::Warning(format!(
                "Ignored tokens not in the portfolio: {}",
                unknown.join(", ")
            )));
        }
        Ok(unknown)
    }

    // ── Planning ─────────────────────────────────────────────────────

    /// Validate the targets locally, then ask the backend for a plan.
    /// Invalid targets never reach the backend.
    pub async fn fetch_plan(&mut self) -> Result<RebalancePlan, RebalanceError> {
        if self.state.snapshot.is_empty() {
            let err = PlanningError::EmptySnapshot;
            self.dispatch(Event::PlanningFailed(err.to_string()));
            return Err(err.into());
        }
        if let Err(e) = self
            .state
            .allocation
            .validate_against(&self.state.snapshot, self.settings.allocation_epsilon)
        {
            self.dispatch(Event::Failed(e.to_string()));
            return Err(e.into());
        }

        let req = CalculateRebalanceRequest {
            tokens: &self.state.snapshot,
            target_allocation: self.state.allocation.targets(),
        };
        let result = self.backend.calculate_rebalance(&req).await;
        match result {
            Ok(reply) => {
                info!(actions = reply.plan.actions.len(), "Received rebalance plan");
                self.dispatch(Event::PlanReceived(reply.plan.clone()));
                Ok(reply.plan)
            }
            Err(e) => {
                let err = PlanningError::from(e);
                self.dispatch(Event::PlanningFailed(err.to_string()));
                Err(err.into())
            }
        }
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Execute the current plan (fetching one if needed), then re-detect.
    ///
    /// Per-action failures are part of the report, not errors. A failing
    /// re-detection after a real run leaves the old snapshot and is only logged.
    pub async fn execute_plan(
        &mut self,
        router: &dyn SwapRouter,
        dry_run: bool,
    ) -> Result<ExecutionReport, RebalanceError> {
        let session = self.ready_session().await?;
        if router.account() != session.address {
            warn!(
                router_account = %router.account(),
                session = %session.address,
                "Signing account differs from the connected account"
            );
        }

        let plan = match self.state.plan.clone() {
            Some(plan) => plan,
            None => self.fetch_plan().await?,
        };
        let executor = SwapExecutor::new(router, self.settings.executor_settings(dry_run));
        let report = executor.execute(&plan, &self.state.snapshot).await;
        self.dispatch(Event::ExecutionFinished(report.clone()));

        if !dry_run {
            if let Err(e) = self.detect().await {
                warn!("Post-execution detection failed: {e}");
            }
        }
        Ok(report)
    }

    /// Detect, plan and execute in one pass.
    pub async fn rebalance(
        &mut self,
        router: &dyn SwapRouter,
        dry_run: bool,
    ) -> Result<ExecutionReport, RebalanceError> {
        self.detect().await?;
        self.fetch_plan().await?;
        self.execute_plan(router, dry_run).await
    }

    // ── Portfolio agent ──────────────────────────────────────────────

    pub async fn ask_agent(&mut self, message: &str) -> Result<AgentReply, RebalanceError> {
        let session = self
            .state
            .session
            .clone()
            .ok_or(RebalanceError::NotConnected)?;
        let req = PortfolioAgentRequest {
            user_message: message.to_string(),
            wallet_address: session.address.to_checksum(None),
        };
        let result = self.backend.portfolio_agent(&req).await;
        match result {
            Ok(reply) => {
                let reply = AgentReply {
                    question: message.to_string(),
                    response: reply.response,
                    trending: reply.data.map(|d| d.trending_tokens).unwrap_or_default(),
                };
                self.dispatch(Event::AgentReplied(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.dispatch(Event::Failed(format!("Portfolio agent: {e}")));
                Err(e.into())
            }
        }
    }
}
