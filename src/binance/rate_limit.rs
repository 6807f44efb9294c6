// =============================================================================
// Request-Weight Tracker — keeps public kline fetches under Binance's limit
// =============================================================================
//
// Binance allows 6000 request weight per minute per IP on the spot API; we
// hard-cap ourselves well below that because the bot shares its IP with
// whatever else runs on the host.
//
// The tracker reads `X-MBX-USED-WEIGHT-1M` after every response.  A reading
// older than one minute is stale: the exchange window has rolled over.
// =============================================================================

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

/// Hard ceiling at which we refuse to send additional requests.
const WEIGHT_HARD_LIMIT: u32 = 1000;
/// Soft warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 800;
/// Length of the exchange's weight window.
const WINDOW_SECS: i64 = 60;

/// Thread-safe weight tracker backed by atomics.
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
    updated_at: AtomicI64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitSnapshot {
    pub used_weight_1m: u32,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
            updated_at: AtomicI64::new(0),
        }
    }

    /// Update the counter from the HTTP response headers returned by Binance.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let weight = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok());

        if let Some(w) = weight {
            self.record_weight(w, Utc::now().timestamp());
        }
    }

    fn record_weight(&self, weight: u32, at_secs: i64) {
        let prev = self.used_weight_1m.swap(weight, Ordering::Relaxed);
        self.updated_at.store(at_secs, Ordering::Relaxed);
        if weight >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = weight, "rate-limit weight updated from header");
    }

    fn current_weight(&self, now_secs: i64) -> u32 {
        if now_secs - self.updated_at.load(Ordering::Relaxed) >= WINDOW_SECS {
            0
        } else {
            self.used_weight_1m.load(Ordering::Relaxed)
        }
    }

    /// Return `true` if we can afford to spend `weight` more request weight
    /// without exceeding the hard limit.
    pub fn can_send_request(&self, weight: u32) -> bool {
        self.can_send_at(weight, Utc::now().timestamp())
    }

    fn can_send_at(&self, weight: u32, now_secs: i64) -> bool {
        let current = self.current_weight(now_secs);
        let allowed = current + weight <= WEIGHT_HARD_LIMIT;
        if !allowed {
            warn!(
                current_weight = current,
                requested_weight = weight,
                hard_limit = WEIGHT_HARD_LIMIT,
                "request blocked — would exceed rate-limit"
            );
        }
        allowed
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            used_weight_1m: self.current_weight(Utc::now().timestamp()),
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("used_weight_1m", &self.used_weight_1m.load(Ordering::Relaxed))
            .finish()
    }
}
