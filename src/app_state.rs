// =============================================================================
// Central Application State
// =============================================================================
//
// Shared by the polling loop, the expiry sweep and the admin API via
// `Arc<AppState>`.  Mutable collections sit behind `parking_lot::RwLock`.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::access::{AccessStore, Clock, UserId};
use crate::binance::BinanceClient;
use crate::runtime_config::RuntimeConfig;
use crate::signal::Strategy;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A recorded error event for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Per-user chat preferences.  Lost on restart.
#[derive(Debug, Clone, Default)]
pub struct UserSession {
    pub strategy: Option<Strategy>,
    /// Set by the "search" button: the next plain message is a symbol.
    pub awaiting_symbol: bool,
}

pub struct AppState {
    pub config: RuntimeConfig,
    pub access: AccessStore,
    pub market: BinanceClient,
    /// Bearer token for the admin API; `None` disables authenticated routes.
    pub admin_token: Option<String>,
    pub sessions: RwLock<HashMap<UserId, UserSession>>,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        clock: Arc<dyn Clock>,
        market: BinanceClient,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            config,
            access: AccessStore::new(clock),
            market,
            admin_token: admin_token.filter(|t| !t.is_empty()),
            sessions: RwLock::new(HashMap::new()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    /// The user's chosen strategy, or the configured default.
    pub fn strategy_for(&self, user_id: UserId) -> Strategy {
        self.sessions
            .read()
            .get(&user_id)
            .and_then(|s| s.strategy)
            .unwrap_or(self.config.default_strategy)
    }

    pub fn set_strategy(&self, user_id: UserId, strategy: Strategy) {
        self.sessions.write().entry(user_id).or_default().strategy = Some(strategy);
    }

    pub fn set_awaiting_symbol(&self, user_id: UserId, awaiting: bool) {
        self.sessions.write().entry(user_id).or_default().awaiting_symbol = awaiting;
    }

    /// Clear and return the "awaiting symbol" flag.
    pub fn take_awaiting_symbol(&self, user_id: UserId) -> bool {
        self.sessions
            .write()
            .get_mut(&user_id)
            .map(|s| std::mem::take(&mut s.awaiting_symbol))
            .unwrap_or(false)
    }

    /// Record an error, trimming the log to the most recent entries.
    pub fn push_error(&self, message: impl Into<String>) {
        let mut errors = self.recent_errors.write();
        errors.push(ErrorRecord {
            message: message.into(),
            at: Utc::now().to_rfc3339(),
        });
        if errors.len() > MAX_RECENT_ERRORS {
            let excess = errors.len() - MAX_RECENT_ERRORS;
            errors.drain(..excess);
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::access::tests::ManualClock;

    pub(crate) fn test_state(config: RuntimeConfig) -> (Arc<ManualClock>, AppState) {
        let clock = ManualClock::new();
        let market = BinanceClient::new().unwrap();
        let state = AppState::new(config, clock.clone(), market, Some("secret".into()));
        (clock, state)
    }

    #[test]
    fn strategy_falls_back_to_config_default() {
        let cfg = RuntimeConfig {
            default_strategy: Strategy::Rsi,
            ..RuntimeConfig::default()
        };
        let (_, state) = test_state(cfg);
        assert_eq!(state.strategy_for(1), Strategy::Rsi);
        state.set_strategy(1, Strategy::Ema);
        assert_eq!(state.strategy_for(1), Strategy::Ema);
        assert_eq!(state.strategy_for(2), Strategy::Rsi);
    }

    #[test]
    fn awaiting_symbol_is_consumed_once() {
        let (_, state) = test_state(RuntimeConfig::default());
        assert!(!state.take_awaiting_symbol(9));
        state.set_awaiting_symbol(9, true);
        assert!(state.take_awaiting_symbol(9));
        assert!(!state.take_awaiting_symbol(9));
    }

    #[test]
    fn error_log_is_bounded() {
        let (_, state) = test_state(RuntimeConfig::default());
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            state.push_error(format!("e{i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "e5");
    }

    #[test]
    fn empty_admin_token_disables_api_auth() {
        let state = AppState::new(
            RuntimeConfig::default(),
            ManualClock::new(),
            BinanceClient::new().unwrap(),
            Some(String::new()),
        );
        assert!(state.admin_token.is_none());
    }
}
