use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::AllocationRequest;

/// Default location of the session file.
pub fn default_session_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rebalance-flow")
        .join("session.json")
}

/// What survives between runs: the user's custom tokens, last targets and
/// last connected account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStore {
    #[serde(default)]
    pub custom_tokens: Vec<Address>,
    #[serde(default)]
    pub last_targets: AllocationRequest,
    #[serde(default)]
    pub last_account: Option<Address>,
}

impl SessionStore {
    /// Load from file, or start empty if the file doesn't exist.
    pub fn load_or_new(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("reading session file")?;
            let store: SessionStore =
                serde_json::from_str(&contents).context("parsing session file")?;
            debug!(
                path = %path.display(),
                custom_tokens = store.custom_tokens.len(),
                "Loaded session"
            );
            Ok(store)
        } else {
            Ok(SessionStore::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).context("creating session directory")?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).context("writing session file")?;
        Ok(())
    }

    /// Returns false when the address was already listed.
    pub fn add_custom_token(&mut self, address: Address) -> bool {
        if self.custom_tokens.contains(&address) {
            return false;
        }
        self.custom_tokens.push(address);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("rebalance-flow-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let store = SessionStore::load_or_new(&temp_path("missing.json")).unwrap();
        assert_eq!(store, SessionStore::default());
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("session.json");
        let mut store = SessionStore::default();
        assert!(store.add_custom_token(Address::repeat_byte(3)));
        assert!(!store.add_custom_token(Address::repeat_byte(3)));
        store.last_targets = "ETH=60,TOKA=40".parse().unwrap();
        store.last_account = Some(Address::repeat_byte(1));
        store.save(&path).unwrap();

        let loaded = SessionStore::load_or_new(&path).unwrap();
        assert_eq!(loaded, store);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_default_path_under_home() {
        assert!(default_session_path().ends_with(".rebalance-flow/session.json"));
    }
}
