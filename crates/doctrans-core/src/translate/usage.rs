//! Monthly character-usage accounting for tiered cost calculation.
//!
//! One counter per process, injected into the translation service. The
//! counter never gates a call; exceeding the free tier only changes the
//! reported overage cost.

use chrono::{DateTime, Datelike, Utc};
use std::sync::Mutex;

use crate::config::UsageConfig;

/// Point-in-time view of the counter, returned by every update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageSnapshot {
    /// Characters translated in the current calendar month
    pub chars_used: u64,
    /// Free-tier characters still available this month
    pub free_remaining: u64,
    /// Accrued overage cost in USD for the current month
    pub overage_cost: f64,
}

struct UsageState {
    chars: u64,
    period_year: i32,
    period_month: u32,
}

/// Thread-safe monthly usage counter.
///
/// The month-boundary reset happens inside the same critical section as
/// the read-modify-write, so concurrent callers cannot double-reset.
pub struct UsageCounter {
    config: UsageConfig,
    state: Mutex<UsageState>,
}

impl UsageCounter {
    pub fn new(config: UsageConfig) -> Self {
        let now = Utc::now();
        Self {
            config,
            state: Mutex::new(UsageState {
                chars: 0,
                period_year: now.year(),
                period_month: now.month(),
            }),
        }
    }

    /// Add `chars` to this month's total and return the updated snapshot.
    pub fn record(&self, chars: u64) -> UsageSnapshot {
        self.record_at(chars, Utc::now())
    }

    /// Current snapshot without recording anything.
    pub fn current(&self) -> UsageSnapshot {
        self.record_at(0, Utc::now())
    }

    fn record_at(&self, chars: u64, now: DateTime<Utc>) -> UsageSnapshot {
        #[allow(clippy::unwrap_used)] // lock poisoning means a panicked writer; propagate
        let mut state = self.state.lock().unwrap();

        // Reset exactly once per calendar month boundary
        if state.period_year != now.year() || state.period_month != now.month() {
            state.chars = 0;
            state.period_year = now.year();
            state.period_month = now.month();
        }

        state.chars = state.chars.saturating_add(chars);
        self.snapshot_of(state.chars)
    }

    #[allow(clippy::cast_precision_loss)] // cost reporting tolerates f64 rounding
    fn snapshot_of(&self, chars: u64) -> UsageSnapshot {
        let excess = chars.saturating_sub(self.config.free_tier_chars);
        UsageSnapshot {
            chars_used: chars,
            free_remaining: self.config.free_tier_chars.saturating_sub(chars),
            overage_cost: excess as f64 * self.config.overage_rate_per_million / 1_000_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn counter() -> UsageCounter {
        UsageCounter::new(UsageConfig {
            free_tier_chars: 100,
            overage_rate_per_million: 0.15,
        })
    }

    #[test]
    fn accumulates_within_a_month() {
        let counter = counter();
        let t = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        counter.record_at(40, t);
        let snap = counter.record_at(40, t);
        assert_eq!(snap.chars_used, 80);
        assert_eq!(snap.free_remaining, 20);
        assert_eq!(snap.overage_cost, 0.0);
    }

    #[test]
    fn resets_on_month_boundary() {
        let counter = counter();
        let march = Utc.with_ymd_and_hms(2026, 3, 31, 23, 0, 0).unwrap();
        let april = Utc.with_ymd_and_hms(2026, 4, 1, 1, 0, 0).unwrap();

        counter.record_at(90, march);
        let snap = counter.record_at(10, april);
        assert_eq!(snap.chars_used, 10);
        assert_eq!(snap.free_remaining, 90);
    }

    #[test]
    fn year_rollover_also_resets() {
        let counter = counter();
        let december = Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap();
        let january = Utc.with_ymd_and_hms(2026, 1, 1, 0, 30, 0).unwrap();

        counter.record_at(50, december);
        assert_eq!(counter.record_at(0, january).chars_used, 0);
    }

    #[test]
    fn overage_is_priced_not_blocked() {
        let counter = counter();
        let t = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let snap = counter.record_at(1_000_100, t);
        assert_eq!(snap.free_remaining, 0);
        // 1_000_000 excess chars at 0.15 / 1M
        assert!((snap.overage_cost - 0.15).abs() < 1e-9);
    }

    #[test]
    fn concurrent_records_are_all_counted() {
        let counter = std::sync::Arc::new(counter());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = counter.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    counter.record(1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.current().chars_used, 800);
    }
}
