//! Core types for the Vitalsum engine
//!
//! This module defines the data structures that flow through the engine:
//! the lookback window, the seven raw record kinds read from a health-data
//! provider, the batch they are collected into, and the summary output.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Days covered by the default lookback window.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;

/// The trailing time range over which records are read.
///
/// The range is inclusive of `start` and exclusive of `end`. Built once per
/// request and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordWindow {
    /// Window start (UTC, inclusive)
    pub start: DateTime<Utc>,
    /// Window end (UTC, exclusive)
    pub end: DateTime<Utc>,
}

impl RecordWindow {
    /// Window covering the [`DEFAULT_LOOKBACK_DAYS`] before `now`.
    pub fn trailing_week(now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(DEFAULT_LOOKBACK_DAYS),
            end: now,
        }
    }

    /// Whether a point-in-time sample falls inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Whether an interval overlaps the window at all.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }
}

/// One of the seven health record categories the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Steps,
    Energy,
    Sleep,
    Weight,
    Height,
    HeartRate,
    OxygenSaturation,
}

impl RecordKind {
    /// Fetch order for a full request. Ordering across kinds is not
    /// observable in the output; this is just the canonical iteration order.
    pub const ALL: [RecordKind; 7] = [
        RecordKind::Steps,
        RecordKind::Energy,
        RecordKind::Sleep,
        RecordKind::Weight,
        RecordKind::Height,
        RecordKind::HeartRate,
        RecordKind::OxygenSaturation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Steps => "steps",
            RecordKind::Energy => "energy",
            RecordKind::Sleep => "sleep",
            RecordKind::Weight => "weight",
            RecordKind::Height => "height",
            RecordKind::HeartRate => "heart_rate",
            RecordKind::OxygenSaturation => "oxygen_saturation",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step-count reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCountRecord {
    /// Number of steps counted
    pub count: u64,
    /// When the reading was taken (UTC)
    pub timestamp: DateTime<Utc>,
}

/// An energy-expenditure reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyBurnedRecord {
    /// Energy burned (kilocalories, non-negative)
    pub kilocalories: f64,
    /// When the reading was taken (UTC)
    pub timestamp: DateTime<Utc>,
}

/// A sleep session, `end >= start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSessionRecord {
    /// Session start (UTC)
    pub start: DateTime<Utc>,
    /// Session end (UTC)
    pub end: DateTime<Utc>,
}

impl SleepSessionRecord {
    /// Session length as a chrono duration.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// A body-weight reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecord {
    /// Body weight (kilograms, positive)
    pub kilograms: f64,
    /// When the reading was taken (UTC)
    pub timestamp: DateTime<Utc>,
}

/// A height reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightRecord {
    /// Height (meters, positive)
    pub meters: f64,
    /// When the reading was taken (UTC)
    pub timestamp: DateTime<Utc>,
}

/// One heart-rate measurement inside a series record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    /// Measured rate (beats per minute, positive)
    pub beats_per_minute: u32,
    /// When the measurement was taken (UTC)
    pub timestamp: DateTime<Utc>,
}

/// A heart-rate series record. Providers deliver heart rate as grouped
/// sub-samples; averaging flattens across every series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateRecord {
    pub samples: Vec<HeartRateSample>,
}

/// A blood-oxygen-saturation reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OxygenSaturationRecord {
    /// Saturation (percentage, 0-100)
    pub percentage: f64,
    /// When the reading was taken (UTC)
    pub timestamp: DateTime<Utc>,
}

/// A raw record of any kind, as returned by a provider read.
///
/// Each variant wraps exactly one typed record; the wire form is externally
/// tagged with the kind's snake_case name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawSample {
    Steps(StepCountRecord),
    Energy(EnergyBurnedRecord),
    Sleep(SleepSessionRecord),
    Weight(WeightRecord),
    Height(HeightRecord),
    HeartRate(HeartRateRecord),
    OxygenSaturation(OxygenSaturationRecord),
}

impl RawSample {
    /// The record kind this sample belongs to.
    pub fn kind(&self) -> RecordKind {
        match self {
            RawSample::Steps(_) => RecordKind::Steps,
            RawSample::Energy(_) => RecordKind::Energy,
            RawSample::Sleep(_) => RecordKind::Sleep,
            RawSample::Weight(_) => RecordKind::Weight,
            RawSample::Height(_) => RecordKind::Height,
            RawSample::HeartRate(_) => RecordKind::HeartRate,
            RawSample::OxygenSaturation(_) => RecordKind::OxygenSaturation,
        }
    }
}

/// The seven record sequences collected for one request.
///
/// Each sequence is chronological (insertion order = time order) and may be
/// empty. Read failures never land here; a request either fills a batch
/// completely or falls back whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordBatch {
    pub steps: Vec<StepCountRecord>,
    pub energy: Vec<EnergyBurnedRecord>,
    pub sleep: Vec<SleepSessionRecord>,
    pub weight: Vec<WeightRecord>,
    pub height: Vec<HeightRecord>,
    pub heart_rate: Vec<HeartRateRecord>,
    pub oxygen_saturation: Vec<OxygenSaturationRecord>,
}

impl RecordBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample to the sequence for its kind.
    pub fn push(&mut self, sample: RawSample) {
        match sample {
            RawSample::Steps(r) => self.steps.push(r),
            RawSample::Energy(r) => self.energy.push(r),
            RawSample::Sleep(r) => self.sleep.push(r),
            RawSample::Weight(r) => self.weight.push(r),
            RawSample::Height(r) => self.height.push(r),
            RawSample::HeartRate(r) => self.heart_rate.push(r),
            RawSample::OxygenSaturation(r) => self.oxygen_saturation.push(r),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
            && self.energy.is_empty()
            && self.sleep.is_empty()
            && self.weight.is_empty()
            && self.height.is_empty()
            && self.heart_rate.is_empty()
            && self.oxygen_saturation.is_empty()
    }
}

/// The engine's sole output: a fully populated daily health summary.
///
/// Every path produces all seven fields; partial summaries do not exist.
/// Serialized as a flat snake_case object, which is the response shape the
/// host application relays unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    /// Total steps over the window
    pub step_count: u32,
    /// Total energy burned (kilocalories)
    pub calories: u32,
    /// Total sleep over the window (minutes)
    pub total_sleep_minutes: u32,
    /// Body mass index (one decimal place)
    pub bmi: f64,
    /// Average heart rate (beats per minute)
    pub heart_rate_bpm: u32,
    /// Average blood oxygen saturation (percentage)
    pub spo2: u8,
    /// Stress estimate derived from heart rate (1 = lowest, 5 = highest)
    pub stress_level: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_trailing_week_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let window = RecordWindow::trailing_week(now);

        assert_eq!(window.end, now);
        assert_eq!(window.end - window.start, Duration::days(7));
    }

    #[test]
    fn test_window_contains_is_inclusive_exclusive() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let window = RecordWindow::trailing_week(now);

        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
        assert!(window.contains(window.start + Duration::hours(1)));
        assert!(!window.contains(window.start - Duration::seconds(1)));
    }

    #[test]
    fn test_window_overlap() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let window = RecordWindow::trailing_week(now);

        // Straddles the start boundary
        assert!(window.overlaps(
            window.start - Duration::hours(2),
            window.start + Duration::hours(2)
        ));
        // Entirely before
        assert!(!window.overlaps(
            window.start - Duration::days(2),
            window.start - Duration::days(1)
        ));
        // Entirely after
        assert!(!window.overlaps(window.end, window.end + Duration::hours(1)));
    }

    #[test]
    fn test_record_kind_wire_names() {
        assert_eq!(RecordKind::Steps.as_str(), "steps");
        assert_eq!(RecordKind::HeartRate.as_str(), "heart_rate");
        assert_eq!(RecordKind::OxygenSaturation.as_str(), "oxygen_saturation");

        let json = serde_json::to_string(&RecordKind::HeartRate).unwrap();
        assert_eq!(json, "\"heart_rate\"");
    }

    #[test]
    fn test_raw_sample_kind_roundtrip() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 14, 8, 0, 0).unwrap();
        let sample = RawSample::Steps(StepCountRecord {
            count: 4200,
            timestamp: ts,
        });
        assert_eq!(sample.kind(), RecordKind::Steps);

        let json = serde_json::to_string(&sample).unwrap();
        let back: RawSample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_batch_push_routes_by_kind() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 14, 8, 0, 0).unwrap();
        let mut batch = RecordBatch::new();
        assert!(batch.is_empty());

        batch.push(RawSample::Steps(StepCountRecord {
            count: 100,
            timestamp: ts,
        }));
        batch.push(RawSample::Weight(WeightRecord {
            kilograms: 70.0,
            timestamp: ts,
        }));

        assert!(!batch.is_empty());
        assert_eq!(batch.steps.len(), 1);
        assert_eq!(batch.weight.len(), 1);
        assert!(batch.sleep.is_empty());
    }

    #[test]
    fn test_summary_wire_shape() {
        let summary = HealthSummary {
            step_count: 8500,
            calories: 2100,
            total_sleep_minutes: 480,
            bmi: 22.5,
            heart_rate_bpm: 72,
            spo2: 98,
            stress_level: 3,
        };

        let value: serde_json::Value =
            serde_json::to_value(&summary).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 7);
        for key in [
            "step_count",
            "calories",
            "total_sleep_minutes",
            "bmi",
            "heart_rate_bpm",
            "spo2",
            "stress_level",
        ] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert_eq!(value["bmi"], 22.5);
    }
}
