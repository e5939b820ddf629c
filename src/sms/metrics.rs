/// SMS dispatch counters
/// Shared between the dispatcher task and any handle that wants a snapshot.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SmsStats {
    /// Send requests accepted by the IMS transport (first attempts and retries)
    pub sent: u64,
    pub retried: u64,
    pub fell_back: u64,
    pub delivered: u64,
    pub failed: u64,
    /// Results for unknown tokens
    pub ignored: u64,
    /// Unix epoch seconds of the last result callback, 0 before the first
    pub last_result_time: u64,
}

#[derive(Debug, Default)]
pub struct SmsMetrics {
    sent: AtomicU64,
    retried: AtomicU64,
    fell_back: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    ignored: AtomicU64,
    last_result_time: AtomicU64,
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl SmsMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    pub fn record_fell_back(&self) {
        self.fell_back.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    pub fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    fn touch(&self) {
        self.last_result_time.store(now_secs(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SmsStats {
        SmsStats {
            sent: self.sent.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            fell_back: self.fell_back.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            last_result_time: self.last_result_time.load(Ordering::Relaxed),
        }
    }
}
