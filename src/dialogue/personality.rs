//! Personality tracker: the spirit's temper, worn down by retries.
//!
//! friendly ──(2nd retry)──▶ playful ──(3rd retry)──▶ grumpy
//!
//! `reset` only calms a grumpy spirit; a playful one stays playful until the
//! funnel completes and `full_reset` runs.

use super::types::Personality;
use crate::store::KeyValueStore;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Persisted key holding the last visit as a millisecond Unix timestamp.
pub const LAST_VISIT_KEY: &str = "tree_last_visit";

/// Retry count at which the spirit turns grumpy and retries get blocked.
pub const RETRY_LIMIT: u32 = 3;

#[derive(Debug, Clone)]
pub struct PersonalityTracker {
    personality: Personality,
    retry_count: u32,
    limit: u32,
    is_returning_user: bool,
}

impl Default for PersonalityTracker {
    fn default() -> Self {
        Self::new(RETRY_LIMIT)
    }
}

impl PersonalityTracker {
    pub fn new(limit: u32) -> Self {
        Self {
            personality: Personality::Friendly,
            retry_count: 0,
            limit: limit.max(1),
            is_returning_user: false,
        }
    }

    pub fn personality(&self) -> Personality {
        self.personality
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn is_returning_user(&self) -> bool {
        self.is_returning_user
    }

    pub fn limit_reached(&self) -> bool {
        self.retry_count >= self.limit
    }

    /// Count one more "another one, please". Returns the new count.
    pub fn increment(&mut self) -> u32 {
        self.retry_count += 1;
        if self.retry_count >= self.limit {
            self.personality = Personality::Grumpy;
        } else if self.retry_count == 2 {
            self.personality = Personality::Playful;
        }
        self.retry_count
    }

    pub fn reset(&mut self) {
        self.retry_count = 0;
        if self.personality == Personality::Grumpy {
            self.personality = Personality::Friendly;
        }
    }

    pub fn force_grumpy(&mut self) {
        self.personality = Personality::Grumpy;
    }

    pub fn full_reset(&mut self) {
        self.personality = Personality::Friendly;
        self.retry_count = 0;
    }

    /// One-shot returning-visitor check: a stored visit within `window` marks
    /// this session as returning. The stored timestamp is always replaced
    /// with `now` afterwards.
    pub fn detect_returning(
        &mut self,
        store: &mut dyn KeyValueStore,
        now: DateTime<Utc>,
        window: Duration,
    ) -> bool {
        let last_visit = match store.get(LAST_VISIT_KEY) {
            Ok(value) => value.and_then(|raw| parse_timestamp(&raw)),
            Err(e) => {
                tracing::warn!("[Personality] Failed to read last visit: {}", e);
                None
            }
        };

        if let Some(last) = last_visit {
            let elapsed = now.signed_duration_since(last);
            if elapsed < window {
                self.is_returning_user = true;
            }
        }

        if let Err(e) = store.set(LAST_VISIT_KEY, &now.timestamp_millis().to_string()) {
            tracing::warn!("[Personality] Failed to record visit: {}", e);
        }

        tracing::debug!(
            "[Personality] Returning visitor: {}",
            self.is_returning_user
        );
        self.is_returning_user
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match raw.trim().parse::<i64>() {
        Ok(ms) => Utc.timestamp_millis_opt(ms).single(),
        Err(_) => {
            tracing::warn!("[Personality] Ignoring unparsable last visit '{}'", raw);
            None
        }
    }
}
