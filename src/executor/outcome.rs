use alloy::primitives::TxHash;

use crate::error::SwapError;
use crate::model::ActionKind;

/// Lifecycle of a single plan action:
/// `Pending -> [Approving ->] Submitted -> Confirmed | Reverted | Rejected`,
/// with `Skipped`, `Simulated` and `Failed` as the other terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Pending,
    Approving,
    Submitted,
    Confirmed,
    Reverted,
    Rejected,
    Skipped,
    Simulated,
    Failed,
}

impl std::fmt::Display for ActionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionState::Pending => "pending",
            ActionState::Approving => "approving",
            ActionState::Submitted => "submitted",
            ActionState::Confirmed => "confirmed",
            ActionState::Reverted => "reverted",
            ActionState::Rejected => "rejected",
            ActionState::Skipped => "skipped",
            ActionState::Simulated => "simulated",
            ActionState::Failed => "failed",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Amount missing, non-numeric or not finite.
    InvalidAmount,
    /// Amount at or below the dust threshold.
    Dust(f64),
    /// Neither buy nor sell.
    UnsupportedAction,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InvalidAmount => write!(f, "invalid amount"),
            SkipReason::Dust(amount) => write!(f, "dust amount {amount}"),
            SkipReason::UnsupportedAction => write!(f, "unsupported action"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Skipped(SkipReason),
    /// Dry run: nothing was sent.
    Simulated { needs_approval: bool },
    Confirmed {
        approval: Option<TxHash>,
        swap: TxHash,
    },
    Failed {
        /// Where the action was when it failed.
        stage: ActionState,
        /// Approval that landed before the failure. Left in place, unused.
        approval: Option<TxHash>,
        error: SwapError,
    },
}

impl ActionOutcome {
    /// Terminal state of the action.
    pub fn state(&self) -> ActionState {
        match self {
            ActionOutcome::Skipped(_) => ActionState::Skipped,
            ActionOutcome::Simulated { .. } => ActionState::Simulated,
            ActionOutcome::Confirmed { .. } => ActionState::Confirmed,
            ActionOutcome::Failed { error, .. } => match error {
                SwapError::Rejected(_) => ActionState::Rejected,
                SwapError::Reverted(_) => ActionState::Reverted,
                _ => ActionState::Failed,
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ActionOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ActionRecord {
    /// Position in the plan.
    pub index: usize,
    pub token: String,
    pub kind: ActionKind,
    pub amount: Option<f64>,
    pub outcome: ActionOutcome,
}

/// Per-action results of one plan execution, in plan order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub records: Vec<ActionRecord>,
}

impl ExecutionReport {
    pub fn count(&self, state: ActionState) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome.state() == state)
            .count()
    }

    pub fn confirmed(&self) -> usize {
        self.count(ActionState::Confirmed)
    }

    pub fn skipped(&self) -> usize {
        self.count(ActionState::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_failure()).count()
    }

    /// Approvals granted for swaps that then failed.
    pub fn dangling_approvals(&self) -> Vec<(&str, TxHash)> {
        self.records
            .iter()
            .filter_map(|r| match &r.outcome {
                ActionOutcome::Failed {
                    approval: Some(tx), ..
                } => Some((r.token.as_str(), *tx)),
                _ => None,
            })
            .collect()
    }
}
