//! Swap Executor: realizes a rebalance plan as router swaps, one action at a
//! time, best effort per action.
//!
//! Execution is strictly sequential: at most one transaction in flight per
//! account. A failing action is logged and the loop moves on; nothing already
//! executed is rolled back.

pub mod evm;
pub mod outcome;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::SwapError;
use crate::model::network::NATIVE_DECIMALS;
use crate::model::{ActionKind, RebalanceAction, RebalancePlan, TokenSnapshot};

use outcome::{ActionOutcome, ActionRecord, ActionState, ExecutionReport, SkipReason};

/// Amounts at or below this are not worth the gas.
pub const DEFAULT_DUST_THRESHOLD: f64 = 0.0001;
/// Swap deadline relative to submission time.
pub const DEFAULT_DEADLINE_SECS: u64 = 600;

/// Router and token operations the executor needs.
///
/// `approve` always grants the router; swaps always pay out to `account()`.
#[async_trait]
pub trait SwapRouter: Send + Sync {
    fn router_address(&self) -> Address;

    fn weth_address(&self) -> Address;

    /// The account that signs and receives.
    fn account(&self) -> Address;

    /// `token.allowance(account, router)`.
    async fn allowance(&self, token: Address) -> Result<U256, SwapError>;

    /// `token.approve(router, amount)`.
    async fn approve(&self, token: Address, amount: U256) -> Result<TxHash, SwapError>;

    /// `router.swapExactETHForTokens{value}(amountOutMin, path, account, deadline)`.
    async fn swap_exact_eth_for_tokens(
        &self,
        value: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        deadline: U256,
    ) -> Result<TxHash, SwapError>;

    /// `router.swapExactTokensForETH(amountIn, amountOutMin, path, account, deadline)`.
    async fn swap_exact_tokens_for_eth(
        &self,
        amount_in: U256,
        amount_out_min: U256,
        path: Vec<Address>,
        deadline: U256,
    ) -> Result<TxHash, SwapError>;
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub dust_threshold: f64,
    pub deadline_secs: u64,
    /// Minimum swap output. Zero accepts any output (no slippage bound).
    pub amount_out_min: U256,
    /// Read allowances and log, but send nothing.
    pub dry_run: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        ExecutorSettings {
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            deadline_secs: DEFAULT_DEADLINE_SECS,
            amount_out_min: U256::ZERO,
            dry_run: false,
        }
    }
}

pub struct SwapExecutor<'a> {
    router: &'a dyn SwapRouter,
    settings: ExecutorSettings,
}

impl<'a> SwapExecutor<'a> {
    pub fn new(router: &'a dyn SwapRouter, settings: ExecutorSettings) -> Self {
        SwapExecutor { router, settings }
    }

    /// Attempt every action in plan order and report what happened to each.
    pub async fn execute(&self, plan: &RebalancePlan, snapshot: &TokenSnapshot) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        info!(
            actions = plan.actions.len(),
            dry_run = self.settings.dry_run,
            "Executing rebalance plan"
        );

        for (index, action) in plan.actions.iter().enumerate() {
            let amount = action.parsed_amount();
            let outcome = self.execute_action(action, amount, snapshot).await;

            match &outcome {
                ActionOutcome::Skipped(reason) => {
                    info!(index, token = %action.token, kind = %action.action, "Skipped: {reason}")
                }
                ActionOutcome::Failed { stage, error, .. } => warn!(
                    index,
                    token = %action.token,
                    kind = %action.action,
                    %stage,
                    "Action {}: {error}",
                    outcome.state()
                ),
                ActionOutcome::Confirmed { swap, .. } => {
                    info!(index, token = %action.token, kind = %action.action, tx = %swap, "Confirmed")
                }
                ActionOutcome::Simulated { needs_approval } => info!(
                    index,
                    token = %action.token,
                    kind = %action.action,
                    needs_approval,
                    "[DRY RUN] would swap"
                ),
            }

            report.records.push(ActionRecord {
                index,
                token: action.token.clone(),
                kind: action.action,
                amount,
                outcome,
            });
        }

        info!(
            confirmed = report.confirmed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Plan execution finished"
        );
        report
    }

    async fn execute_action(
        &self,
        action: &RebalanceAction,
        amount: Option<f64>,
        snapshot: &TokenSnapshot,
    ) -> ActionOutcome {
        let Some(amount) = amount else {
            return ActionOutcome::Skipped(SkipReason::InvalidAmount);
        };
        if amount <= self.settings.dust_threshold {
            return ActionOutcome::Skipped(SkipReason::Dust(amount));
        }
        if action.action == ActionKind::Unknown {
            return ActionOutcome::Skipped(SkipReason::UnsupportedAction);
        }

        let token = match resolve_token(snapshot, &action.token) {
            Ok(t) => t,
            Err(error) => {
                return ActionOutcome::Failed {
                    stage: ActionState::Pending,
                    approval: None,
                    error,
                };
            }
        };

        match action.action {
            ActionKind::Buy => self.buy(token.address, amount).await,
            ActionKind::Sell => self.sell(token.address, token.decimals, amount).await,
            ActionKind::Unknown => ActionOutcome::Skipped(SkipReason::UnsupportedAction),
        }
    }

    /// Spend `eth_amount` native currency on `token`.
    async fn buy(&self, token: Address, eth_amount: f64) -> ActionOutcome {
        let value = match evm::to_token_units(eth_amount, NATIVE_DECIMALS) {
            Ok(v) => v,
            Err(error) => {
                return ActionOutcome::Failed {
                    stage: ActionState::Pending,
                    approval: None,
                    error,
                };
            }
        };
        let path = vec![self.router.weth_address(), token];

        if self.settings.dry_run {
            return ActionOutcome::Simulated {
                needs_approval: false,
            };
        }

        debug!(token = %evm::short_addr(&token), %value, "swapExactETHForTokens");
        match self
            .router
            .swap_exact_eth_for_tokens(value, self.settings.amount_out_min, path, self.deadline())
            .await
        {
            Ok(swap) => ActionOutcome::Confirmed {
                approval: None,
                swap,
            },
            Err(error) => ActionOutcome::Failed {
                stage: ActionState::Submitted,
                approval: None,
                error,
            },
        }
    }

    /// Swap `amount` of `token` for native currency, approving the router first
    /// when the current allowance does not cover it.
    ///
    /// Approval and swap are separate transactions. If the swap fails after the
    /// approval landed, the allowance stays granted and unused.
    async fn sell(&self, token: Address, decimals: u8, amount: f64) -> ActionOutcome {
        let amount_in = match evm::to_token_units(amount, decimals) {
            Ok(a) => a,
            Err(error) => {
                return ActionOutcome::Failed {
                    stage: ActionState::Pending,
                    approval: None,
                    error,
                };
            }
        };
        let path = vec![token, self.router.weth_address()];

        let allowance = match self.router.allowance(token).await {
            Ok(a) => a,
            Err(error) => {
                return ActionOutcome::Failed {
                    stage: ActionState::Pending,
                    approval: None,
                    error,
                };
            }
        };
        let needs_approval = allowance < amount_in;

        if self.settings.dry_run {
            return ActionOutcome::Simulated { needs_approval };
        }

        let mut approval = None;
        if needs_approval {
            debug!(token = %evm::short_addr(&token), %allowance, %amount_in, "approving router");
            match self.router.approve(token, amount_in).await {
                Ok(tx) => approval = Some(tx),
                Err(error) => {
                    return ActionOutcome::Failed {
                        stage: ActionState::Approving,
                        approval: None,
                        error,
                    };
                }
            }
        }

        debug!(token = %evm::short_addr(&token), %amount_in, "swapExactTokensForETH");
        match self
            .router
            .swap_exact_tokens_for_eth(amount_in, self.settings.amount_out_min, path, self.deadline())
            .await
        {
            Ok(swap) => ActionOutcome::Confirmed { approval, swap },
            Err(error) => ActionOutcome::Failed {
                stage: ActionState::Submitted,
                approval,
                error,
            },
        }
    }

    /// Submission time plus the configured window, as a unix timestamp.
    fn deadline(&self) -> U256 {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        U256::from(now + self.settings.deadline_secs)
    }
}

struct ResolvedToken {
    address: Address,
    decimals: u8,
}

fn resolve_token(snapshot: &TokenSnapshot, symbol: &str) -> Result<ResolvedToken, SwapError> {
    let entry = snapshot
        .get(symbol)
        .ok_or_else(|| SwapError::UnknownToken(symbol.to_string()))?;
    match entry.address {
        Some(address) if address != Address::ZERO => Ok(ResolvedToken {
            address,
            decimals: entry.decimals,
        }),
        _ => Err(SwapError::NativeAsset(symbol.to_string())),
    }
}
