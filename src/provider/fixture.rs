//! Fixture provider
//!
//! A [`HealthDataProvider`] backed by a JSON document instead of a platform
//! store. Fixtures drive the test suite, the command-line tool and embedders
//! that want deterministic data during development.
//!
//! Document shape:
//!
//! ```json
//! {
//!   "available": true,
//!   "granted": ["steps", "sleep"],
//!   "fail": ["heart_rate"],
//!   "records": [
//!     { "steps": { "count": 4200, "timestamp": "2024-03-14T08:00:00Z" } }
//!   ]
//! }
//! ```
//!
//! `available` defaults to true, `granted` to every kind, `fail` and
//! `records` to empty.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::error::ProviderError;
use crate::types::{
    EnergyBurnedRecord, HeartRateRecord, HeartRateSample, HeightRecord, OxygenSaturationRecord,
    RawSample, RecordKind, RecordWindow, SleepSessionRecord, StepCountRecord, WeightRecord,
};

use super::HealthDataProvider;

/// Wire form of a fixture document.
#[derive(Debug, Deserialize)]
struct FixtureDoc {
    #[serde(default = "default_available")]
    available: bool,
    /// Kinds with read permission; absent means all kinds.
    #[serde(default)]
    granted: Option<Vec<RecordKind>>,
    /// Kinds whose reads fail with a backend error.
    #[serde(default)]
    fail: Vec<RecordKind>,
    #[serde(default)]
    records: Vec<RawSample>,
}

fn default_available() -> bool {
    true
}

/// JSON-backed provider with scriptable availability, permissions and
/// per-kind read failures.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    available: bool,
    granted: HashSet<RecordKind>,
    fail: HashSet<RecordKind>,
    records: Vec<RawSample>,
}

impl FixtureProvider {
    /// Every record in the fixture, regardless of kind or window.
    pub fn samples(&self) -> &[RawSample] {
        &self.records
    }

    /// Parse a fixture document.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let doc: FixtureDoc = serde_json::from_str(json)?;

        let granted = match doc.granted {
            Some(kinds) => kinds.into_iter().collect(),
            None => RecordKind::ALL.into_iter().collect(),
        };

        Ok(Self {
            available: doc.available,
            granted,
            fail: doc.fail.into_iter().collect(),
            records: doc.records,
        })
    }

    /// A healthy week of plausible records ending at `now`.
    ///
    /// Useful for demos and smoke tests: every kind is populated, every
    /// permission granted, no failures scripted.
    pub fn demo(now: DateTime<Utc>) -> Self {
        let day = |d: i64| now - Duration::days(d);
        let mut records: Vec<RawSample> = Vec::new();

        let step_counts = [7800, 9100, 10400, 6500, 8900, 11200];
        let kilocalories = [2150.5, 2300.0, 1980.2, 2420.8, 2210.4, 2050.9];
        let sleep_minutes = [450, 480, 420, 510, 465, 435];
        let bpm = [68, 72, 75, 71, 69, 74];

        for (i, &count) in step_counts.iter().enumerate() {
            records.push(RawSample::Steps(StepCountRecord {
                count,
                timestamp: day(6 - i as i64),
            }));
        }
        for (i, &kcal) in kilocalories.iter().enumerate() {
            records.push(RawSample::Energy(EnergyBurnedRecord {
                kilocalories: kcal,
                timestamp: day(6 - i as i64),
            }));
        }
        for (i, &minutes) in sleep_minutes.iter().enumerate() {
            let end = day(6 - i as i64);
            records.push(RawSample::Sleep(SleepSessionRecord {
                start: end - Duration::minutes(minutes),
                end,
            }));
        }
        records.push(RawSample::Weight(WeightRecord {
            kilograms: 70.5,
            timestamp: day(3),
        }));
        records.push(RawSample::Height(HeightRecord {
            meters: 1.78,
            timestamp: day(3),
        }));
        records.push(RawSample::HeartRate(HeartRateRecord {
            samples: bpm
                .iter()
                .enumerate()
                .map(|(i, &beats_per_minute)| HeartRateSample {
                    beats_per_minute,
                    timestamp: day(6 - i as i64),
                })
                .collect(),
        }));
        for (i, pct) in [97.5, 98.0, 96.8].into_iter().enumerate() {
            records.push(RawSample::OxygenSaturation(OxygenSaturationRecord {
                percentage: pct,
                timestamp: day(5 - i as i64 * 2),
            }));
        }

        Self {
            available: true,
            granted: RecordKind::ALL.into_iter().collect(),
            fail: HashSet::new(),
            records,
        }
    }

    fn in_window(&self, sample: &RawSample, window: &RecordWindow) -> bool {
        match sample {
            RawSample::Steps(r) => window.contains(r.timestamp),
            RawSample::Energy(r) => window.contains(r.timestamp),
            RawSample::Sleep(r) => window.overlaps(r.start, r.end),
            RawSample::Weight(r) => window.contains(r.timestamp),
            RawSample::Height(r) => window.contains(r.timestamp),
            RawSample::HeartRate(r) => r
                .samples
                .iter()
                .any(|s| window.contains(s.timestamp)),
            RawSample::OxygenSaturation(r) => window.contains(r.timestamp),
        }
    }
}

impl HealthDataProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn granted_permissions(&self) -> HashSet<RecordKind> {
        self.granted.clone()
    }

    fn read_records(
        &self,
        kind: RecordKind,
        window: &RecordWindow,
    ) -> Result<Vec<RawSample>, ProviderError> {
        if !self.available {
            return Err(ProviderError::Backend("store is offline".to_string()));
        }
        if !self.granted.contains(&kind) {
            return Err(ProviderError::Backend(format!(
                "read permission for {kind} not granted"
            )));
        }
        if self.fail.contains(&kind) {
            return Err(ProviderError::Backend(format!(
                "scripted failure reading {kind}"
            )));
        }

        Ok(self
            .records
            .iter()
            .filter(|r| r.kind() == kind && self.in_window(r, window))
            .cloned()
            .collect())
    }
}
