//! Per-channel sliding-window rate limiter.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::Mutex;

use courier_core::notification::Channel;

/// Width of the sliding window.
const WINDOW: Duration = Duration::from_secs(1);

/// Poll interval used by [`RateLimiter::wait`].
const POLL_TICK: Duration = Duration::from_millis(10);

/// Sliding-window admission control, counted independently per channel.
///
/// Each admitted call leaves a nanosecond-timestamped marker; `allow`
/// evicts markers older than the trailing one-second window, counts the
/// remainder, and only records a new marker when the count is below the
/// limit. Eviction, count, and insert all happen under one mutex, so two
/// concurrent callers can never both observe `limit - 1` and over-admit.
pub struct RateLimiter {
    limit: usize,
    windows: Mutex<HashMap<Channel, VecDeque<i64>>>,
}

impl RateLimiter {
    /// Create a limiter admitting at most `limit` calls per channel per
    /// second.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Try to acquire a slot for `channel`. Returns `false` without
    /// recording a marker when the window is full.
    pub async fn allow(&self, channel: Channel) -> bool {
        self.allow_at(channel, now_ns()).await
    }

    async fn allow_at(&self, channel: Channel, now_ns: i64) -> bool {
        let window_start = now_ns - WINDOW.as_nanos() as i64;
        let mut windows = self.windows.lock().await;
        let markers = windows.entry(channel).or_default();

        while markers.front().is_some_and(|&ts| ts <= window_start) {
            markers.pop_front();
        }

        if markers.len() >= self.limit {
            return false;
        }

        markers.push_back(now_ns);
        true
    }

    /// Block cooperatively until a slot is granted, polling on a short
    /// tick. Callers wrap this in `tokio::select!` against their
    /// cancellation signal.
    pub async fn wait(&self, channel: Channel) {
        let mut ticker = tokio::time::interval(POLL_TICK);
        loop {
            ticker.tick().await;
            if self.allow(channel).await {
                return;
            }
        }
    }

    /// Number of calls admitted for `channel` within the trailing window.
    pub async fn current_rate(&self, channel: Channel) -> usize {
        let window_start = now_ns() - WINDOW.as_nanos() as i64;
        let mut windows = self.windows.lock().await;
        let markers = windows.entry(channel).or_default();

        while markers.front().is_some_and(|&ts| ts <= window_start) {
            markers.pop_front();
        }

        markers.len()
    }
}

fn now_ns() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
