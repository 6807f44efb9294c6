// =============================================================================
// Runtime Configuration — bot settings loaded from JSON + environment
// =============================================================================
//
// Every field carries a serde default so that a partial (or empty) JSON file
// still loads.  Secrets never live here: the Telegram token and the admin API
// token are read from the environment only.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::UserId;
use crate::signal::Strategy;
use crate::types::{normalize_symbol, parse_interval};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_menu_symbols() -> Vec<String> {
    vec![
        "BTCUSDT".to_string(),
        "ETHUSDT".to_string(),
        "BNBUSDT".to_string(),
    ]
}

fn default_interval() -> String {
    "1d".to_string()
}

fn default_kline_limit() -> u32 {
    100
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_api_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Chat user ids allowed to issue access codes.
    #[serde(default)]
    pub admin_user_ids: Vec<UserId>,

    /// Symbols offered as buttons in the main menu.
    #[serde(default = "default_menu_symbols")]
    pub menu_symbols: Vec<String>,

    /// Kline interval used when the user does not name one.
    #[serde(default = "default_interval")]
    pub default_interval: String,

    /// Strategy for users who have not picked one.
    #[serde(default)]
    pub default_strategy: Strategy,

    /// Number of candles fetched per analysis.
    #[serde(default = "default_kline_limit")]
    pub kline_limit: u32,

    /// Seconds between access-expiry sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Serve the admin HTTP API.
    #[serde(default = "default_true")]
    pub api_enabled: bool,

    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            admin_user_ids: Vec::new(),
            menu_symbols: default_menu_symbols(),
            default_interval: default_interval(),
            default_strategy: Strategy::default(),
            kline_limit: default_kline_limit(),
            sweep_interval_secs: default_sweep_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            api_enabled: true,
            api_bind_addr: default_api_bind_addr(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read bot config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse bot config from {}", path.display()))?;

        info!(
            path = %path.display(),
            menu_symbols = ?config.menu_symbols,
            admins = config.admin_user_ids.len(),
            "bot config loaded"
        );

        Ok(config)
    }

    /// Apply `BOT_ADMIN_IDS`, `BOT_SYMBOLS` and `BOT_BIND_ADDR` on top of the
    /// file values.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(ids) = get("BOT_ADMIN_IDS") {
            let mut parsed = Vec::new();
            for raw in ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match raw.parse::<UserId>() {
                    Ok(id) => parsed.push(id),
                    Err(_) => warn!(value = raw, "ignoring malformed admin id in BOT_ADMIN_IDS"),
                }
            }
            self.admin_user_ids = parsed;
        }

        if let Some(syms) = get("BOT_SYMBOLS") {
            self.menu_symbols = syms.split(',').filter_map(normalize_symbol).collect();
        }

        if let Some(addr) = get("BOT_BIND_ADDR") {
            self.api_bind_addr = addr;
        }
    }

    /// Repair values that would make the bot misbehave.
    pub fn sanitize(&mut self) {
        if parse_interval(&self.default_interval).is_none() {
            warn!(interval = %self.default_interval, "invalid default interval, using 1d");
            self.default_interval = default_interval();
        }
        if self.kline_limit == 0 || self.kline_limit > 1000 {
            warn!(limit = self.kline_limit, "kline_limit out of range, using 100");
            self.kline_limit = default_kline_limit();
        }
        if self.sweep_interval_secs == 0 {
            self.sweep_interval_secs = default_sweep_interval_secs();
        }
        self.menu_symbols = self.menu_symbols.iter().filter_map(|s| normalize_symbol(s)).collect();
        if self.menu_symbols.is_empty() {
            self.menu_symbols = default_menu_symbols();
        }
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_user_ids.contains(&user_id)
    }
}
