//! Sliding-window send limits per channel and account.
//!
//! Each `channel` or `channel:account` key owns an ascending list of send
//! timestamps covering at most the last hour. Checking a limit only reads;
//! [`RateLimiter::record_message`] prunes and appends.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};
use warden_config::{OverflowPolicy, RateLimitsSection};

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 3600;

/// Effective limits for one channel/account pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimits {
    /// Maximum sends in any rolling 60 seconds.
    pub max_per_minute: Option<u32>,
    /// Maximum sends in any rolling hour.
    pub max_per_hour: Option<u32>,
    /// What the caller should do when a limit is hit.
    pub overflow: OverflowPolicy,
}

impl RateLimits {
    /// Resolve limits for `channel` and `account`. Account values override
    /// channel values field by field; a channel with no config is unlimited.
    #[must_use]
    pub fn resolve(config: &RateLimitsSection, channel: &str, account: Option<&str>) -> Self {
        let Some(channel_limits) = config.channels.get(channel) else {
            return Self::default();
        };
        let account_limits = account.and_then(|a| channel_limits.accounts.get(a));

        Self {
            max_per_minute: account_limits
                .and_then(|a| a.max_per_minute)
                .or(channel_limits.max_per_minute),
            max_per_hour: account_limits
                .and_then(|a| a.max_per_hour)
                .or(channel_limits.max_per_hour),
            overflow: account_limits
                .and_then(|a| a.overflow)
                .or(channel_limits.overflow)
                .unwrap_or_default(),
        }
    }

    /// Returns `true` if neither limit is set.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.max_per_minute.is_none() && self.max_per_hour.is_none()
    }
}

/// Outcome of [`RateLimiter::check_limit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether a send may go ahead now.
    pub allowed: bool,
    /// Why it may not.
    pub reason: Option<String>,
    /// The configured overflow policy, for the caller to apply.
    pub overflow: OverflowPolicy,
}

impl RateLimitDecision {
    fn allow(overflow: OverflowPolicy) -> Self {
        Self {
            allowed: true,
            reason: None,
            overflow,
        }
    }

    fn deny(reason: String, overflow: OverflowPolicy) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            overflow,
        }
    }
}

fn bucket_key(channel: &str, account: Option<&str>) -> String {
    match account {
        Some(account) => format!("{channel}:{account}"),
        None => channel.to_owned(),
    }
}

/// Start of the span of `span_secs` seconds ending at `now`.
fn cutoff(now: DateTime<Utc>, span_secs: i64) -> DateTime<Utc> {
    now.checked_sub_signed(TimeDelta::seconds(span_secs))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Per-key send history.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl RateLimiter {
    /// Create a limiter with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<DateTime<Utc>>>> {
        self.buckets.lock().unwrap_or_else(|e| {
            warn!("rate limiter lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Whether one more send is within `limits` at `now`. Never mutates.
    pub fn check_limit(
        &self,
        channel: &str,
        account: Option<&str>,
        limits: &RateLimits,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        if limits.is_unlimited() {
            return RateLimitDecision::allow(limits.overflow);
        }

        let key = bucket_key(channel, account);
        let buckets = self.lock();
        let Some(bucket) = buckets.get(&key) else {
            return RateLimitDecision::allow(limits.overflow);
        };

        let hour_start = cutoff(now, HOUR_SECS);
        let minute_start = cutoff(now, MINUTE_SECS);
        let in_hour = bucket.iter().filter(|t| **t > hour_start).count();
        let in_minute = bucket.iter().filter(|t| **t > minute_start).count();

        if let Some(limit) = limits.max_per_minute
            && in_minute >= limit as usize
        {
            debug!(key = %key, in_minute, limit, "per-minute limit reached");
            return RateLimitDecision::deny(
                format!("rate limit: {in_minute}/{limit} messages per minute on {key}"),
                limits.overflow,
            );
        }
        if let Some(limit) = limits.max_per_hour
            && in_hour >= limit as usize
        {
            debug!(key = %key, in_hour, limit, "per-hour limit reached");
            return RateLimitDecision::deny(
                format!("rate limit: {in_hour}/{limit} messages per hour on {key}"),
                limits.overflow,
            );
        }
        RateLimitDecision::allow(limits.overflow)
    }

    /// Record a send at `now`.
    pub fn record_message(&self, channel: &str, account: Option<&str>, now: DateTime<Utc>) {
        let key = bucket_key(channel, account);
        let hour_start = cutoff(now, HOUR_SECS);
        let mut buckets = self.lock();
        let bucket = buckets.entry(key).or_default();
        while bucket.front().is_some_and(|t| *t <= hour_start) {
            bucket.pop_front();
        }
        // Late timestamps are inserted in order; the prune above relies on it.
        let at = bucket.partition_point(|t| *t <= now);
        bucket.insert(at, now);
    }

    /// Sends recorded for a key within the hour before `now`.
    pub fn recorded(&self, channel: &str, account: Option<&str>, now: DateTime<Utc>) -> usize {
        let hour_start = cutoff(now, HOUR_SECS);
        self.lock()
            .get(&bucket_key(channel, account))
            .map_or(0, |b| b.iter().filter(|t| **t > hour_start).count())
    }

    /// Forget all history.
    pub fn reset(&self) {
        self.lock().clear();
    }
}
