// =============================================================================
// Access Codes — time-limited codes issued by an admin, redeemed by users
// =============================================================================
//
// An admin issues a code with a time-to-live.  Any user who redeems the code
// before it expires is granted access until the code's own expiry; codes are
// multi-use.  A periodic sweep revokes lapsed grants and purges dead codes.
//
// Time comes from an injected `Clock` so expiry can be tested without sleeps.
// All state sits behind one `parking_lot::RwLock` per map.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Chat-platform user identifier.
pub type UserId = i64;

/// Longest lifetime a code may be issued for: one year.
pub const MAX_TTL_MINUTES: i64 = 525_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("code lifetime must be between 1 and {MAX_TTL_MINUTES} minutes, got {0}")]
    TtlOutOfRange(i64),
}

/// Convert an admin-supplied lifetime in minutes into seconds.
pub fn ttl_seconds_from_minutes(minutes: i64) -> Result<i64, AccessError> {
    if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
        return Err(AccessError::TtlOutOfRange(minutes));
    }
    minutes
        .checked_mul(60)
        .ok_or(AccessError::TtlOutOfRange(minutes))
}

// =============================================================================
// Clock
// =============================================================================

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// Records
// =============================================================================

/// Access held by a single user.
#[derive(Debug, Clone, Serialize)]
pub struct AccessGrant {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    /// Cleared by the sweep once `expires_at` has passed.
    pub valid: bool,
}

/// Admin-facing view of an issued code.
#[derive(Debug, Clone, Serialize)]
pub struct CodeInfo {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub redemptions: usize,
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub revoked_users: usize,
    pub purged_codes: usize,
}

// =============================================================================
// AccessStore
// =============================================================================

pub struct AccessStore {
    clock: Arc<dyn Clock>,
    codes: RwLock<HashMap<String, DateTime<Utc>>>,
    grants: RwLock<HashMap<UserId, AccessGrant>>,
}

impl AccessStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            codes: RwLock::new(HashMap::new()),
            grants: RwLock::new(HashMap::new()),
        }
    }

    /// Register `code` (replacing any earlier code of the same name) so that
    /// it expires `ttl_seconds` from now.  Returns the expiry instant, or an
    /// error when the lifetime is not positive or runs past chrono's range.
    pub fn issue(&self, code: &str, ttl_seconds: i64) -> Result<DateTime<Utc>, AccessError> {
        let out_of_range = || AccessError::TtlOutOfRange(ttl_seconds / 60);
        if ttl_seconds <= 0 {
            return Err(out_of_range());
        }
        let expires_at = Duration::try_seconds(ttl_seconds)
            .and_then(|ttl| self.clock.now().checked_add_signed(ttl))
            .ok_or_else(out_of_range)?;

        self.codes.write().insert(code.to_string(), expires_at);
        info!(%expires_at, "access code issued");
        Ok(expires_at)
    }

    /// Redeem `code` for `user_id`.  Returns `false` if the code is unknown or
    /// already expired; otherwise grants access until the code expires.
    pub fn redeem(&self, code: &str, user_id: UserId) -> bool {
        let now = self.clock.now();
        let expires_at = match self.codes.read().get(code) {
            Some(&exp) if now < exp => exp,
            _ => {
                debug!(user_id, "rejected unknown or expired access code");
                return false;
            }
        };

        self.grants.write().insert(
            user_id,
            AccessGrant {
                code: code.to_string(),
                expires_at,
                valid: true,
            },
        );
        info!(user_id, %expires_at, "access code redeemed");
        true
    }

    /// Whether `user_id` holds an unrevoked grant that is still live at `now`.
    pub fn is_valid(&self, user_id: UserId, now: DateTime<Utc>) -> bool {
        self.grants
            .read()
            .get(&user_id)
            .map(|g| g.valid && now < g.expires_at)
            .unwrap_or(false)
    }

    /// [`is_valid`](Self::is_valid) at the clock's current time.
    pub fn has_access(&self, user_id: UserId) -> bool {
        self.is_valid(user_id, self.clock.now())
    }

    pub fn grant(&self, user_id: UserId) -> Option<AccessGrant> {
        self.grants.read().get(&user_id).cloned()
    }

    /// Revoke every grant whose expiry has passed and drop expired codes.
    pub fn sweep_expired(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for (user_id, grant) in self.grants.write().iter_mut() {
            if grant.valid && grant.expires_at <= now {
                grant.valid = false;
                report.revoked_users += 1;
                debug!(user_id, "access grant expired");
            }
        }

        let mut codes = self.codes.write();
        let before = codes.len();
        codes.retain(|_, exp| *exp > now);
        report.purged_codes = before - codes.len();

        report
    }

    /// Unexpired codes, soonest expiry first.
    pub fn active_codes(&self) -> Vec<CodeInfo> {
        let now = self.clock.now();
        let grants = self.grants.read();
        let mut out: Vec<CodeInfo> = self
            .codes
            .read()
            .iter()
            .filter(|(_, exp)| **exp > now)
            .map(|(code, exp)| CodeInfo {
                code: code.clone(),
                expires_at: *exp,
                redemptions: grants.values().filter(|g| &g.code == code).count(),
            })
            .collect();
        out.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        out
    }
}

/// Random eight-character upper-case code for admins who do not pick one.
pub fn generate_code() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_ascii_uppercase()
}
