use alloy::primitives::TxHash;
use thiserror::Error;

/// JSON-RPC code a wallet returns when the user declines a request.
pub const USER_REJECTED_CODE: i64 = 4001;
/// JSON-RPC code returned by `wallet_switchEthereumChain` for an unknown chain.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

// ── Wallet ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("No wallet provider available")]
    ProviderUnavailable,

    #[error("Connection request rejected: {0}")]
    ConnectionRejected(String),

    #[error("Wrong network: expected chain {expected:#x}, wallet is on {actual:#x}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("Chain {0:#x} is not registered with the wallet")]
    UnrecognizedChain(u64),

    #[error("Wallet does not support `{0}`")]
    Unsupported(&'static str),

    #[error("Wallet returned no accounts")]
    NoAccounts,

    #[error("Wallet RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Wallet transport error: {0}")]
    Transport(String),
}

impl WalletError {
    /// Map a JSON-RPC error code onto the wallet taxonomy.
    pub fn from_code(code: i64, message: impl Into<String>, chain_id: Option<u64>) -> Self {
        match (code, chain_id) {
            (USER_REJECTED_CODE, _) => WalletError::ConnectionRejected(message.into()),
            (UNRECOGNIZED_CHAIN_CODE, Some(id)) => WalletError::UnrecognizedChain(id),
            _ => WalletError::Rpc {
                code,
                message: message.into(),
            },
        }
    }
}

// ── Backend ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Service(String),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Token detection failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Token `{symbol}` has invalid balance {balance}")]
    InvalidBalance { symbol: String, balance: f64 },
}

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("Rebalance planning failed: {0}")]
    Backend(#[from] BackendError),

    #[error("No tokens detected; run detection before planning")]
    EmptySnapshot,
}

// ── Allocation ───────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum InvalidAllocationError {
    #[error("Target allocation is empty")]
    Empty,

    #[error("Target for `{symbol}` is {value}; must be a number >= 0")]
    InvalidPercent { symbol: String, value: f64 },

    #[error("Targets sum to {total:.3}%, must equal 100% (tolerance {epsilon})")]
    BadTotal { total: f64, epsilon: f64 },

    #[error("Target `{0}` is not in the detected portfolio")]
    UnknownToken(String),

    #[error("Cannot parse allocation entry `{0}` (expected SYMBOL=PERCENT)")]
    Parse(String),
}

// ── Swaps ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
pub enum SwapError {
    #[error("Token `{0}` is not in the snapshot")]
    UnknownToken(String),

    #[error("Token `{0}` has no contract address (native asset)")]
    NativeAsset(String),

    #[error("Network has no router configured")]
    NoRouter,

    #[error("Amount `{0}` cannot be expressed in base units: {1}")]
    InvalidAmount(String, String),

    #[error("Transaction rejected by wallet: {0}")]
    Rejected(String),

    #[error("Transaction {0} reverted")]
    Reverted(TxHash),

    #[error("RPC error: {0}")]
    Rpc(String),
}

// ── Aggregate ────────────────────────────────────────────────────────

/// Errors surfaced by the session controller.
#[derive(Debug, Error)]
pub enum RebalanceError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    InvalidAllocation(#[from] InvalidAllocationError),

    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Swap(#[from] SwapError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert!(matches!(
            WalletError::from_code(4001, "User rejected the request.", None),
            WalletError::ConnectionRejected(_)
        ));
        assert!(matches!(
            WalletError::from_code(4902, "Unrecognized chain", Some(11_155_111)),
            WalletError::UnrecognizedChain(11_155_111)
        ));
        assert!(matches!(
            WalletError::from_code(-32603, "internal", None),
            WalletError::Rpc { code: -32603, .. }
        ));
    }

    #[test]
    fn test_wrong_network_message_uses_hex() {
        let err = WalletError::WrongNetwork {
            expected: 11_155_111,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "Wrong network: expected chain 0xaa36a7, wallet is on 0x1"
        );
    }
}
