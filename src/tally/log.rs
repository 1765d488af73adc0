//! In-memory render statistics.
//!
//! Counts how many renders produced each alert level and how many failed.
//! Nothing is persisted: the counters live as long as the process.

use crate::core::alert::AlertLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Thread-safe counters for completed and failed renders.
#[derive(Debug)]
pub struct RenderTally {
    green: AtomicU64,
    yellow: AtomicU64,
    orange: AtomicU64,
    red: AtomicU64,
    failed: AtomicU64,
    started_at: DateTime<Utc>,
}

impl RenderTally {
    pub fn new() -> Self {
        Self {
            green: AtomicU64::new(0),
            yellow: AtomicU64::new(0),
            orange: AtomicU64::new(0),
            red: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    /// Record a render that ended with the given level.
    pub fn record_level(&self, level: AlertLevel) {
        self.counter(level).fetch_add(1, Ordering::Relaxed);
    }

    /// Record a render aborted by an error.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn counter(&self, level: AlertLevel) -> &AtomicU64 {
        match level {
            AlertLevel::Green => &self.green,
            AlertLevel::Yellow => &self.yellow,
            AlertLevel::Orange => &self.orange,
            AlertLevel::Red => &self.red,
        }
    }

    /// Count for one level.
    pub fn count(&self, level: AlertLevel) -> u64 {
        self.counter(level).load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> TallyStats {
        let green = self.green.load(Ordering::Relaxed);
        let yellow = self.yellow.load(Ordering::Relaxed);
        let orange = self.orange.load(Ordering::Relaxed);
        let red = self.red.load(Ordering::Relaxed);
        TallyStats {
            green,
            yellow,
            orange,
            red,
            failed: self.failed.load(Ordering::Relaxed),
            total: green + yellow + orange + red,
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Render Statistics:\n\
             - Green: {}\n\
             - Yellow: {}\n\
             - Orange: {}\n\
             - Red: {}\n\
             - Failed: {}\n\
             - Total forecasts: {}",
            stats.green, stats.yellow, stats.orange, stats.red, stats.failed, stats.total
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.green,
            &self.yellow,
            &self.orange,
            &self.red,
            &self.failed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for RenderTally {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyStats {
    pub green: u64,
    pub yellow: u64,
    pub orange: u64,
    pub red: u64,
    pub failed: u64,
    pub total: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Shared handle to a tally.
pub type SharedRenderTally = Arc<RenderTally>;

pub fn create_shared_tally() -> SharedRenderTally {
    Arc::new(RenderTally::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counting() {
        let tally = RenderTally::new();
        tally.record_level(AlertLevel::Green);
        tally.record_level(AlertLevel::Green);
        tally.record_level(AlertLevel::Red);
        tally.record_failure();

        let stats = tally.stats();
        assert_eq!(stats.green, 2);
        assert_eq!(stats.red, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total, 3);
        assert_eq!(tally.count(AlertLevel::Yellow), 0);
    }

    #[test]
    fn test_tally_reset() {
        let tally = RenderTally::new();
        tally.record_level(AlertLevel::Orange);
        tally.record_failure();
        tally.reset();

        let stats = tally.stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_shared_tally_across_threads() {
        let tally = create_shared_tally();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tally = Arc::clone(&tally);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        tally.record_level(AlertLevel::Yellow);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tally.count(AlertLevel::Yellow), 100);
    }

    #[test]
    fn test_summary_format() {
        let tally = RenderTally::new();
        let summary = tally.summary();
        assert!(summary.contains("Green"));
        assert!(summary.contains("Failed"));
    }
}
