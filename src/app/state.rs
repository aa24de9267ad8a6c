//! Application state and its pure transition function.

use alloy::primitives::Address;

use crate::backend::types::TrendingToken;
use crate::executor::outcome::ExecutionReport;
use crate::model::{AllocationMap, AllocationRequest, PriceMap, RebalancePlan, TokenSnapshot};
use crate::snapshot::{DetectedPortfolio, sanitize_prices};
use crate::wallet::{NetworkMismatch, WalletSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Last message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Everything the client tracks for one session.
#[derive(Debug, Clone)]
pub struct AppState {
    /// False once the wallet provider turned out to be missing or the user
    /// declined to connect. The feature set stays disabled afterwards.
    pub wallet_enabled: bool,
    pub session: Option<WalletSession>,
    /// Set while the wallet is on the wrong chain; blocks wallet-dependent work.
    pub network_mismatch: Option<NetworkMismatch>,
    pub snapshot: TokenSnapshot,
    pub prices: PriceMap,
    /// Whether `prices` came from the backend.
    pub live_prices: bool,
    pub allocation: AllocationRequest,
    pub custom_tokens: Vec<Address>,
    /// Plan for the current snapshot and allocation. Dropped when either changes.
    pub plan: Option<RebalancePlan>,
    pub last_report: Option<ExecutionReport>,
    pub last_agent_reply: Option<AgentReply>,
    pub notice: Option<Notice>,
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            wallet_enabled: true,
            session: None,
            network_mismatch: None,
            snapshot: TokenSnapshot::new(),
            prices: PriceMap::new(),
            live_prices: false,
            allocation: AllocationRequest::new(),
            custom_tokens: Vec::new(),
            plan: None,
            last_report: None,
            last_agent_reply: None,
            notice: None,
        }
    }
}

impl AppState {
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Wallet-dependent operations may run.
    pub fn is_ready(&self) -> bool {
        self.wallet_enabled && self.session.is_some() && self.network_mismatch.is_none()
    }

    pub fn current_allocation(&self) -> AllocationMap {
        self.snapshot.current_allocation(&self.prices)
    }

    pub fn total_value(&self) -> f64 {
        self.snapshot.total_value(&self.prices)
    }
}

/// Portfolio agent answer, kept for display.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub question: String,
    pub response: String,
    pub trending: Vec<TrendingToken>,
}

/// Something that happened to the session.
#[derive(Debug, Clone)]
pub enum Event {
    /// No wallet provider, or the user declined to connect.
    WalletDisabled(String),
    Connected(WalletSession),
    /// Client-side reset; the wallet itself stays authorised.
    Disconnected,
    NetworkConfirmed(u64),
    WrongNetwork(NetworkMismatch),
    /// Persisted custom tokens and last targets.
    SessionLoaded {
        custom_tokens: Vec<Address>,
        targets: AllocationRequest,
    },
    Detected(DetectedPortfolio),
    DetectionFailed(String),
    CustomTokenAdded(Address),
    TargetSet { symbol: String, percent: f64 },
    TargetsReplaced(AllocationRequest),
    PlanReceived(RebalancePlan),
    PlanningFailed(String),
    ExecutionFinished(ExecutionReport),
    AgentReplied(AgentReply),
    Info(String),
    Warning(String),
    Failed(String),
}

impl Event {
    /// Whether [`reduce`] replaces `AppState::notice` for this event. Other
    /// events leave the previous notice in place.
    pub fn sets_notice(&self) -> bool {
        !matches!(
            self,
            Event::NetworkConfirmed(_)
                | Event::SessionLoaded { .. }
                | Event::CustomTokenAdded(_)
                | Event::TargetSet { .. }
                | Event::TargetsReplaced(_)
        )
    }
}

fn notice(level: NoticeLevel, message: impl Into<String>) -> Option<Notice> {
    Some(Notice {
        level,
        message: message.into(),
    })
}

/// Apply one event. Never performs I/O.
///
/// Failed operations only set a notice: the snapshot, prices and targets from
/// before the failure are kept.
pub fn reduce(mut state: AppState, event: Event) -> AppState {
    match event {
        Event::WalletDisabled(reason) => {
            state.wallet_enabled = false;
            state.session = None;
            state.notice = notice(NoticeLevel::Error, reason);
        }
        Event::Connected(session) => {
            state.wallet_enabled = true;
            state.notice = notice(NoticeLevel::Info, format!("Connected {}", session.address));
            state.session = Some(session);
        }
        Event::Disconnected => {
            let custom_tokens = std::mem::take(&mut state.custom_tokens);
            state = AppState {
                custom_tokens,
                notice: notice(NoticeLevel::Info, "Disconnected"),
                ..AppState::default()
            };
        }
        Event::NetworkConfirmed(chain_id) => {
            if let Some(session) = state.session.as_mut() {
                session.chain_id = chain_id;
            }
            state.network_mismatch = None;
        }
        Event::WrongNetwork(mismatch) => {
            if let Some(session) = state.session.as_mut() {
                session.chain_id = mismatch.actual;
            }
            state.notice = notice(
                NoticeLevel::Error,
                format!(
                    "Wrong network: wallet is on {:#x}, switch to {}",
                    mismatch.actual, mismatch.expected
                ),
            );
            state.network_mismatch = Some(mismatch);
        }
        Event::SessionLoaded {
            custom_tokens,
            targets,
        } => {
            for addr in custom_tokens {
                if !state.custom_tokens.contains(&addr) {
                    state.custom_tokens.push(addr);
                }
            }
            if state.allocation.is_empty() {
                state.allocation = targets;
            }
        }
        Event::Detected(portfolio) => {
            state.snapshot = portfolio.snapshot;
            state.prices = portfolio.prices;
            state.live_prices = portfolio.live_prices;
            let current = state.current_allocation();
            state.allocation.reconcile(&state.snapshot, &current);
            state.plan = None;
            state.notice = if state.live_prices {
                None
            } else {
                notice(NoticeLevel::Warning, "Prices unavailable; using placeholders")
            };
        }
        Event::DetectionFailed(message) => {
            state.notice = notice(NoticeLevel::Error, message);
        }
        Event::CustomTokenAdded(address) => {
            if !state.custom_tokens.contains(&address) {
                state.custom_tokens.push(address);
            }
        }
        Event::TargetSet { symbol, percent } => {
            state.allocation.set(symbol, percent);
            state.plan = None;
        }
        Event::TargetsReplaced(targets) => {
            state.allocation = targets;
            state.plan = None;
        }
        Event::PlanReceived(plan) => {
            if !plan.token_prices.is_empty() {
                state.prices = sanitize_prices(plan.token_prices.clone());
                state.live_prices = true;
            }
            state.notice = plan
                .is_balanced()
                .then(|| Notice {
                    level: NoticeLevel::Info,
                    message: "Portfolio already matches the target allocation".into(),
                });
            state.plan = Some(plan);
        }
        Event::PlanningFailed(message) => {
            state.notice = notice(NoticeLevel::Error, message);
        }
        Event::ExecutionFinished(report) => {
            let level = if report.failed() > 0 {
                NoticeLevel::Warning
            } else {
                NoticeLevel::Info
            };
            state.notice = notice(
                level,
                format!(
                    "{} confirmed, {} skipped, {} failed",
                    report.confirmed(),
                    report.skipped(),
                    report.failed()
                ),
            );
            state.plan = None;
            state.last_report = Some(report);
        }
        Event::AgentReplied(reply) => {
            state.notice = None;
            state.last_agent_reply = Some(reply);
        }
        Event::Info(message) => state.notice = notice(NoticeLevel::Info, message),
        Event::Warning(message) => state.notice = notice(NoticeLevel::Warning, message),
        Event::Failed(message) => state.notice = notice(NoticeLevel::Error, message),
    }
    state
}
