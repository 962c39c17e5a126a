//! Summary aggregation
//!
//! This module turns a collected [`RecordBatch`] into a [`HealthSummary`]:
//! - sums for steps, calories and sleep
//! - averages for heart rate and oxygen saturation
//! - BMI from the latest weight and height readings
//! - a stress estimate stepped off the resolved heart rate
//!
//! Every field has its own missing-data default, so aggregation is total: it
//! never fails, whatever the batch contains. Read errors are handled one
//! layer up and never reach this module.

use crate::types::{HealthSummary, RecordBatch, RecordWindow};

/// Substituted when no step records exist in the window.
pub const STEPS_IF_EMPTY: u32 = 10_000;
/// Substituted when step records exist but sum to exactly zero.
pub const STEPS_IF_ZERO: u32 = 12_000;
/// Substituted when no energy records exist in the window.
pub const CALORIES_IF_EMPTY: u32 = 2_300;
/// Substituted when energy records exist but sum to exactly zero.
pub const CALORIES_IF_ZERO: u32 = 2_500;
/// Substituted when no sleep sessions touch the window.
pub const SLEEP_MINUTES_IF_EMPTY: u32 = 450;
/// Substituted when sleep sessions exist but sum to zero whole minutes.
pub const SLEEP_MINUTES_IF_ZERO: u32 = 420;
/// Assumed body weight (kg) when no reading exists.
pub const WEIGHT_KG_IF_MISSING: f64 = 68.5;
/// Assumed height (m) when no reading exists.
pub const HEIGHT_M_IF_MISSING: f64 = 1.75;
/// Substituted when no heart-rate samples exist in the window.
pub const HEART_RATE_IF_EMPTY: u32 = 85;
/// Substituted when heart-rate samples exist but average to zero.
pub const HEART_RATE_IF_ZERO: u32 = 78;
/// Substituted when no oxygen-saturation readings exist in the window.
pub const SPO2_IF_EMPTY: u8 = 97;
/// Substituted when readings exist but average to zero.
pub const SPO2_IF_ZERO: u8 = 96;

/// Aggregator for collected record batches
pub struct Aggregator;

impl Aggregator {
    /// Aggregate a batch into a summary.
    ///
    /// Pure function of its inputs: the same window and batch always produce
    /// the same summary. Records outside the window are ignored; a sleep
    /// session counts if it overlaps the window at all, and a heart-rate
    /// series counts whole once any of its sub-samples lands inside.
    pub fn aggregate(window: &RecordWindow, batch: &RecordBatch) -> HealthSummary {
        let step_count = compute_step_count(window, batch);
        let calories = compute_calories(window, batch);
        let total_sleep_minutes = compute_sleep_minutes(window, batch);
        let bmi = compute_bmi(window, batch);
        let heart_rate_bpm = compute_heart_rate(window, batch);
        let spo2 = compute_spo2(window, batch);
        // Stress depends on the resolved heart rate, so it comes last.
        let stress_level = stress_from_heart_rate(heart_rate_bpm);

        HealthSummary {
            step_count,
            calories,
            total_sleep_minutes,
            bmi,
            heart_rate_bpm,
            spo2,
            stress_level,
        }
    }
}

fn compute_step_count(window: &RecordWindow, batch: &RecordBatch) -> u32 {
    let mut seen = false;
    let mut total: u64 = 0;
    for record in &batch.steps {
        if window.contains(record.timestamp) {
            seen = true;
            total = total.saturating_add(record.count);
        }
    }

    if !seen {
        STEPS_IF_EMPTY
    } else if total > 0 {
        total.min(u64::from(u32::MAX)) as u32
    } else {
        STEPS_IF_ZERO
    }
}

fn compute_calories(window: &RecordWindow, batch: &RecordBatch) -> u32 {
    let mut seen = false;
    let mut total = 0.0;
    for record in &batch.energy {
        if window.contains(record.timestamp) {
            seen = true;
            total += record.kilocalories;
        }
    }

    if !seen {
        CALORIES_IF_EMPTY
    } else if total > 0.0 {
        // Truncating float-to-int cast; saturates at the integer bounds.
        total as u32
    } else {
        CALORIES_IF_ZERO
    }
}

fn compute_sleep_minutes(window: &RecordWindow, batch: &RecordBatch) -> u32 {
    let mut seen = false;
    let mut minutes: i64 = 0;
    for session in &batch.sleep {
        if window.overlaps(session.start, session.end) {
            seen = true;
            // Overlapping sessions contribute their full length, unclipped.
            // Each session truncates to whole minutes before the sum, so a
            // sub-minute session contributes nothing.
            minutes = minutes.saturating_add(session.duration().num_minutes());
        }
    }

    if !seen {
        SLEEP_MINUTES_IF_EMPTY
    } else if minutes > 0 {
        minutes.min(i64::from(u32::MAX)) as u32
    } else {
        SLEEP_MINUTES_IF_ZERO
    }
}

fn compute_bmi(window: &RecordWindow, batch: &RecordBatch) -> f64 {
    let kilograms = batch
        .weight
        .iter()
        .filter(|r| window.contains(r.timestamp))
        .last()
        .map(|r| r.kilograms)
        .unwrap_or(WEIGHT_KG_IF_MISSING);

    let meters = batch
        .height
        .iter()
        .filter(|r| window.contains(r.timestamp))
        .last()
        .map(|r| r.meters)
        // BMI must stay finite even if a zero height slips through.
        .filter(|m| *m > 0.0)
        .unwrap_or(HEIGHT_M_IF_MISSING);

    round_to_one_decimal(kilograms / (meters * meters))
}

fn compute_heart_rate(window: &RecordWindow, batch: &RecordBatch) -> u32 {
    let mut count: u64 = 0;
    let mut total: u64 = 0;
    for series in &batch.heart_rate {
        // A series is in or out as a whole: one in-window sub-sample brings
        // every sub-sample of that series into the average.
        if !series.samples.iter().any(|s| window.contains(s.timestamp)) {
            continue;
        }
        for sample in &series.samples {
            count += 1;
            total += u64::from(sample.beats_per_minute);
        }
    }

    if count == 0 {
        HEART_RATE_IF_EMPTY
    } else if total > 0 {
        // Average truncated to whole bpm.
        (total as f64 / count as f64) as u32
    } else {
        HEART_RATE_IF_ZERO
    }
}

fn compute_spo2(window: &RecordWindow, batch: &RecordBatch) -> u8 {
    let mut count: u32 = 0;
    let mut total = 0.0;
    for record in &batch.oxygen_saturation {
        if window.contains(record.timestamp) {
            count += 1;
            total += record.percentage;
        }
    }

    if count == 0 {
        SPO2_IF_EMPTY
    } else if total > 0.0 {
        (total / f64::from(count)) as u8
    } else {
        SPO2_IF_ZERO
    }
}

/// Stress estimate stepped off the resolved average heart rate.
///
/// Boundaries are strict: 70 bpm maps to 1, 71 bpm maps to 2.
pub fn stress_from_heart_rate(heart_rate_bpm: u32) -> u8 {
    if heart_rate_bpm > 100 {
        5
    } else if heart_rate_bpm > 90 {
        4
    } else if heart_rate_bpm > 80 {
        3
    } else if heart_rate_bpm > 70 {
        2
    } else {
        1
    }
}

/// Round to one decimal place, half away from zero.
pub(crate) fn round_to_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
