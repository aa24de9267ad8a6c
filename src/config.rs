use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::U256;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Result, anyhow, bail};

use crate::app::store::default_session_path;
use crate::backend::DEFAULT_BACKEND_URL;
use crate::executor::{DEFAULT_DEADLINE_SECS, DEFAULT_DUST_THRESHOLD, ExecutorSettings};
use crate::model::Network;
use crate::model::allocation::DEFAULT_EPSILON;

pub const PRIVATE_KEY_ENV: &str = "REBALANCE_PRIVATE_KEY";
pub const BACKEND_URL_ENV: &str = "REBALANCE_BACKEND_URL";
pub const RPC_URL_ENV: &str = "REBALANCE_RPC_URL";

/// Tunables of the rebalance flow.
#[derive(Debug, Clone)]
pub struct RebalanceSettings {
    /// Tolerance, in percentage points, for targets summing to 100.
    pub allocation_epsilon: f64,
    /// Plan actions at or below this amount are skipped.
    pub dust_threshold: f64,
    pub swap_deadline_secs: u64,
    pub http_timeout: Duration,
}

impl Default for RebalanceSettings {
    fn default() -> Self {
        RebalanceSettings {
            allocation_epsilon: DEFAULT_EPSILON,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            swap_deadline_secs: DEFAULT_DEADLINE_SECS,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl RebalanceSettings {
    pub fn executor_settings(&self, dry_run: bool) -> ExecutorSettings {
        ExecutorSettings {
            dust_threshold: self.dust_threshold,
            deadline_secs: self.swap_deadline_secs,
            amount_out_min: U256::ZERO,
            dry_run,
        }
    }
}

/// Runtime configuration resolved from CLI flags and the environment.
pub struct RuntimeConfig {
    pub network: Network,
    pub backend_url: String,
    /// `None` means there is no wallet to connect.
    pub private_key: Option<String>,
    pub session_file: PathBuf,
    pub settings: RebalanceSettings,
}

impl RuntimeConfig {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    fn resolve(cli: &crate::cli::Cli, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut network = Network::from_name(&cli.network).ok_or_else(|| {
            anyhow!(
                "Invalid network '{}'. Use 'sepolia' or 'ethereum'.",
                cli.network
            )
        })?;
        if let Some(rpc) = cli.rpc_url.clone().or_else(|| env(RPC_URL_ENV)) {
            network = network.with_rpc_url(rpc);
        }

        let backend_url = cli
            .backend_url
            .clone()
            .or_else(|| env(BACKEND_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let private_key = env(PRIVATE_KEY_ENV).filter(|k| !k.trim().is_empty());

        if !(cli.epsilon.is_finite() && cli.epsilon > 0.0) {
            bail!("--epsilon must be a positive number, got {}", cli.epsilon);
        }
        if !(cli.dust.is_finite() && cli.dust >= 0.0) {
            bail!("--dust must be a non-negative number, got {}", cli.dust);
        }

        Ok(RuntimeConfig {
            network,
            backend_url,
            private_key,
            session_file: cli.session_file.clone().unwrap_or_else(default_session_path),
            settings: RebalanceSettings {
                allocation_epsilon: cli.epsilon,
                dust_threshold: cli.dust,
                ..RebalanceSettings::default()
            },
        })
    }

    /// The signer for the configured key, if one is set.
    pub fn signer(&self) -> Result<Option<PrivateKeySigner>> {
        self.private_key
            .as_deref()
            .map(|key| {
                key.trim()
                    .parse::<PrivateKeySigner>()
                    .map_err(|e| anyhow!("Invalid private key in {PRIVATE_KEY_ENV}: {e}"))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("rebalance-flow").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::resolve(&parse(&["status"]), |_| None).unwrap();
        assert_eq!(config.network, Network::sepolia());
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert!(config.private_key.is_none());
        assert!(config.signer().unwrap().is_none());
        assert_eq!(config.settings.allocation_epsilon, 0.01);
        assert_eq!(config.settings.dust_threshold, 0.0001);
    }

    #[test]
    fn test_env_fills_unset_flags() {
        let env = |key: &str| match key {
            BACKEND_URL_ENV => Some("http://backend:9000".to_string()),
            RPC_URL_ENV => Some("http://rpc:8545".to_string()),
            PRIVATE_KEY_ENV => Some(
                "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
            ),
            _ => None,
        };
        let config = RuntimeConfig::resolve(&parse(&["detect"]), env).unwrap();
        assert_eq!(config.backend_url, "http://backend:9000");
        assert_eq!(config.network.rpc_url, "http://rpc:8545");
        assert!(config.signer().unwrap().is_some());

        let config = RuntimeConfig::resolve(
            &parse(&["--backend-url", "http://flag:1", "detect"]),
            env,
        )
        .unwrap();
        assert_eq!(config.backend_url, "http://flag:1");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(RuntimeConfig::resolve(&parse(&["--network", "hyperevm", "status"]), |_| None).is_err());
        assert!(RuntimeConfig::resolve(&parse(&["--epsilon", "0", "status"]), |_| None).is_err());
        let config = RuntimeConfig::resolve(&parse(&["status"]), |key| {
            (key == PRIVATE_KEY_ENV).then(|| "not-a-key".to_string())
        })
        .unwrap();
        assert!(config.signer().is_err());
    }
}
