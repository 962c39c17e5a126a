//! Request orchestration
//!
//! This module provides the public API for Vitalsum. A request walks three
//! gates: provider availability, granted permissions, then one read per
//! record kind. Any failure at any gate collapses the whole request to the
//! fallback summary; real and fallback data are never mixed.
//!
//! Callers that want the cause of a fallback use [`try_resolve`]; callers
//! that just want a summary use [`resolve`] or a [`SummaryBridge`], which
//! also report the cause on the diagnostic channel.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::aggregate::Aggregator;
use crate::error::FetchError;
use crate::fallback::whole_summary_fallback;
use crate::insight::{self, HealthReport};
use crate::provider::HealthDataProvider;
use crate::types::{HealthSummary, RawSample, RecordBatch, RecordKind, RecordWindow};

/// Time budget a [`SummaryBridge`] grants each request.
pub const DEFAULT_REQUEST_BUDGET_MS: i64 = 10_000;

/// State for a single summary request.
///
/// Every request carries its own context, so concurrent requests stay
/// independent; nothing about a request lives in shared state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlates diagnostic events belonging to one request
    pub request_id: Uuid,
    /// Lookback range records are read over
    pub window: RecordWindow,
    /// Instant after which fetching gives up and falls back
    pub deadline: Option<DateTime<Utc>>,
}

impl RequestContext {
    /// Context with no deadline.
    pub fn new(window: RecordWindow) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            window,
            deadline: None,
        }
    }

    /// Context that gives up once `deadline` passes.
    pub fn with_deadline(window: RecordWindow, deadline: DateTime<Utc>) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::new(window)
        }
    }

    fn deadline_expired(&self) -> bool {
        matches!(self.deadline, Some(deadline) if Utc::now() >= deadline)
    }
}

/// Fetch every record kind for one request into a batch.
///
/// Reads run sequentially in [`RecordKind::ALL`] order and short-circuit on
/// the first failure. The deadline is checked between kinds; a read that is
/// already in flight is not interrupted.
pub fn collect_records(
    provider: &dyn HealthDataProvider,
    ctx: &RequestContext,
) -> Result<RecordBatch, FetchError> {
    let mut batch = RecordBatch::new();

    for kind in RecordKind::ALL {
        if ctx.deadline_expired() {
            return Err(FetchError::DeadlineExceeded { kind });
        }

        let records = provider
            .read_records(kind, &ctx.window)
            .map_err(|source| FetchError::ReadFailed { kind, source })?;

        tracing::debug!(
            request_id = %ctx.request_id,
            kind = %kind,
            records = records.len(),
            "fetched records"
        );

        for sample in records {
            validate_sample(kind, &sample)?;
            batch.push(sample);
        }
    }

    Ok(batch)
}

/// Reject samples a provider should never have produced.
///
/// Step counts are unsigned by construction, and zero heart-rate readings
/// are left to the aggregator's zero-average sentinel rather than treated
/// as malformed.
pub fn validate_sample(kind: RecordKind, sample: &RawSample) -> Result<(), FetchError> {
    let malformed = |detail: String| FetchError::MalformedRecord { kind, detail };

    if sample.kind() != kind {
        return Err(malformed(format!(
            "expected a {kind} record, got {}",
            sample.kind()
        )));
    }

    match sample {
        RawSample::Energy(r) => {
            if !r.kilocalories.is_finite() || r.kilocalories < 0.0 {
                return Err(malformed(format!(
                    "kilocalories {} out of range",
                    r.kilocalories
                )));
            }
        }
        RawSample::Sleep(r) => {
            if r.end < r.start {
                return Err(malformed("session ends before it starts".to_string()));
            }
        }
        RawSample::Weight(r) => {
            if !r.kilograms.is_finite() || r.kilograms <= 0.0 {
                return Err(malformed(format!("kilograms {} out of range", r.kilograms)));
            }
        }
        RawSample::Height(r) => {
            if !r.meters.is_finite() || r.meters <= 0.0 {
                return Err(malformed(format!("meters {} out of range", r.meters)));
            }
        }
        RawSample::OxygenSaturation(r) => {
            if !r.percentage.is_finite() || !(0.0..=100.0).contains(&r.percentage) {
                return Err(malformed(format!(
                    "percentage {} out of range",
                    r.percentage
                )));
            }
        }
        RawSample::Steps(_) | RawSample::HeartRate(_) => {}
    }

    Ok(())
}

/// Run the full request pipeline, surfacing the failure cause.
///
/// Gate order matches the request lifecycle: availability, permissions,
/// fetch, aggregate. The first failed gate wins; an `Err` here means the
/// caller should respond with the fallback summary.
pub fn try_resolve(
    provider: &dyn HealthDataProvider,
    ctx: &RequestContext,
) -> Result<HealthSummary, FetchError> {
    if !provider.is_available() {
        return Err(FetchError::ProviderUnavailable);
    }

    let granted = provider.granted_permissions();
    let missing: Vec<RecordKind> = RecordKind::ALL
        .into_iter()
        .filter(|kind| !granted.contains(kind))
        .collect();
    if !missing.is_empty() {
        return Err(FetchError::PermissionDenied { missing });
    }

    let batch = collect_records(provider, ctx)?;
    Ok(Aggregator::aggregate(&ctx.window, &batch))
}

/// Run the full request pipeline, responding with the fallback summary on
/// any failure.
///
/// This is the response contract of the engine: exactly one fully populated
/// summary per request, never an error. The failure cause is reported on
/// the diagnostic channel only.
pub fn resolve(provider: &dyn HealthDataProvider, ctx: &RequestContext) -> HealthSummary {
    match try_resolve(provider, ctx) {
        Ok(summary) => {
            tracing::debug!(request_id = %ctx.request_id, "summary resolved");
            summary
        }
        Err(cause) => {
            tracing::warn!(
                request_id = %ctx.request_id,
                provider = provider.name(),
                %cause,
                "responding with whole-summary fallback"
            );
            whole_summary_fallback()
        }
    }
}

/// Stateful entry point owning a provider.
///
/// Each call builds a fresh trailing-week window and request context, so a
/// bridge can serve any number of requests, concurrently or not. The
/// provider's lifecycle belongs to whoever constructed the bridge.
pub struct SummaryBridge {
    provider: Box<dyn HealthDataProvider>,
    budget: Option<Duration>,
}

impl SummaryBridge {
    /// Bridge with the default request budget.
    pub fn new(provider: Box<dyn HealthDataProvider>) -> Self {
        Self {
            provider,
            budget: Some(Duration::milliseconds(DEFAULT_REQUEST_BUDGET_MS)),
        }
    }

    /// Bridge with a specific request budget; zero or negative disables the
    /// deadline entirely.
    pub fn with_budget_ms(provider: Box<dyn HealthDataProvider>, budget_ms: i64) -> Self {
        Self {
            provider,
            budget: (budget_ms > 0).then(|| Duration::milliseconds(budget_ms)),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    fn request_context(&self) -> RequestContext {
        let now = Utc::now();
        let window = RecordWindow::trailing_week(now);
        match self.budget {
            Some(budget) => RequestContext::with_deadline(window, now + budget),
            None => RequestContext::new(window),
        }
    }

    /// Resolve one summary request.
    pub fn summary(&self) -> HealthSummary {
        resolve(self.provider.as_ref(), &self.request_context())
    }

    /// Resolve one summary request, surfacing the failure cause instead of
    /// falling back.
    pub fn try_summary(&self) -> Result<HealthSummary, FetchError> {
        try_resolve(self.provider.as_ref(), &self.request_context())
    }

    /// Resolve one request and analyze the result.
    pub fn report(&self) -> HealthReport {
        insight::analyze(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FixtureProvider, UnavailableProvider};
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn ctx() -> RequestContext {
        RequestContext::new(RecordWindow::trailing_week(fixed_now()))
    }

    #[test]
    fn test_demo_provider_resolves_real_summary() {
        let provider = FixtureProvider::demo(fixed_now());
        let summary = try_resolve(&provider, &ctx()).unwrap();

        assert_eq!(summary.step_count, 53900);
        assert_eq!(summary.calories, 13112);
        assert_eq!(summary.total_sleep_minutes, 2760);
        assert_eq!(summary.bmi, 22.3);
        assert_eq!(summary.heart_rate_bpm, 71);
        assert_eq!(summary.spo2, 97);
        assert_eq!(summary.stress_level, 2);
    }

    #[test]
    fn test_unavailable_provider_falls_back_whole() {
        let provider = UnavailableProvider;

        let err = try_resolve(&provider, &ctx()).unwrap_err();
        assert!(matches!(err, FetchError::ProviderUnavailable));

        assert_eq!(resolve(&provider, &ctx()), whole_summary_fallback());
    }

    #[test]
    fn test_missing_permission_lists_kinds() {
        let provider =
            FixtureProvider::from_json(r#"{ "granted": ["steps", "energy"] }"#).unwrap();

        let err = try_resolve(&provider, &ctx()).unwrap_err();
        match err {
            FetchError::PermissionDenied { missing } => {
                assert_eq!(missing.len(), 5);
                assert!(missing.contains(&RecordKind::Sleep));
                assert!(!missing.contains(&RecordKind::Steps));
            }
            other => panic!("expected PermissionDenied, got {other:?}"),
        }

        assert_eq!(resolve(&provider, &ctx()), whole_summary_fallback());
    }

    #[test]
    fn test_single_read_failure_discards_all_real_data() {
        // Six kinds full of valid records, one scripted failure: the
        // response must be the untouched fallback constant.
        let json = r#"{
            "fail": ["oxygen_saturation"],
            "records": [
                { "steps": { "count": 4200, "timestamp": "2024-03-14T08:00:00Z" } },
                { "energy": { "kilocalories": 1900.0, "timestamp": "2024-03-14T08:00:00Z" } },
                { "sleep": { "start": "2024-03-13T22:00:00Z", "end": "2024-03-14T06:00:00Z" } },
                { "weight": { "kilograms": 70.0, "timestamp": "2024-03-14T08:00:00Z" } },
                { "height": { "meters": 1.75, "timestamp": "2024-03-14T08:00:00Z" } },
                { "heart_rate": { "samples": [
                    { "beats_per_minute": 72, "timestamp": "2024-03-14T08:00:00Z" }
                ] } }
            ]
        }"#;
        let provider = FixtureProvider::from_json(json).unwrap();

        let err = try_resolve(&provider, &ctx()).unwrap_err();
        match err {
            FetchError::ReadFailed { kind, .. } => {
                assert_eq!(kind, RecordKind::OxygenSaturation);
            }
            other => panic!("expected ReadFailed, got {other:?}"),
        }

        assert_eq!(resolve(&provider, &ctx()), whole_summary_fallback());
    }

    #[test]
    fn test_empty_store_resolves_per_field_defaults() {
        let provider = FixtureProvider::from_json("{}").unwrap();
        let summary = try_resolve(&provider, &ctx()).unwrap();

        // Empty reads are data, not errors: per-field defaults, not the
        // whole-summary fallback.
        assert_eq!(summary.step_count, 10000);
        assert_eq!(summary.calories, 2300);
        assert_eq!(summary.total_sleep_minutes, 450);
        assert_eq!(summary.bmi, 22.4);
        assert_eq!(summary.heart_rate_bpm, 85);
        assert_eq!(summary.spo2, 97);
        assert_eq!(summary.stress_level, 3);
    }

    #[test]
    fn test_malformed_value_falls_back() {
        let json = r#"{
            "records": [
                { "energy": { "kilocalories": -5.0, "timestamp": "2024-03-14T08:00:00Z" } }
            ]
        }"#;
        let provider = FixtureProvider::from_json(json).unwrap();

        let err = try_resolve(&provider, &ctx()).unwrap_err();
        match err {
            FetchError::MalformedRecord { kind, detail } => {
                assert_eq!(kind, RecordKind::Energy);
                assert!(detail.contains("kilocalories"));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }

        assert_eq!(resolve(&provider, &ctx()), whole_summary_fallback());
    }

    #[test]
    fn test_inverted_sleep_session_is_malformed() {
        let json = r#"{
            "records": [
                { "sleep": { "start": "2024-03-14T06:00:00Z", "end": "2024-03-13T22:00:00Z" } }
            ]
        }"#;
        let provider = FixtureProvider::from_json(json).unwrap();

        let err = try_resolve(&provider, &ctx()).unwrap_err();
        assert!(matches!(
            err,
            FetchError::MalformedRecord {
                kind: RecordKind::Sleep,
                ..
            }
        ));
    }

    /// Provider that answers every read with a record of the wrong kind.
    struct ConfusedProvider;

    impl HealthDataProvider for ConfusedProvider {
        fn name(&self) -> &'static str {
            "confused"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn granted_permissions(&self) -> HashSet<RecordKind> {
            RecordKind::ALL.into_iter().collect()
        }

        fn read_records(
            &self,
            _kind: RecordKind,
            window: &RecordWindow,
        ) -> Result<Vec<RawSample>, crate::error::ProviderError> {
            Ok(vec![RawSample::Weight(crate::types::WeightRecord {
                kilograms: 70.0,
                timestamp: window.start,
            })])
        }
    }

    #[test]
    fn test_kind_mismatch_is_malformed() {
        let err = try_resolve(&ConfusedProvider, &ctx()).unwrap_err();
        match err {
            FetchError::MalformedRecord { kind, detail } => {
                assert_eq!(kind, RecordKind::Steps);
                assert!(detail.contains("weight"));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_expired_deadline_falls_back() {
        let provider = FixtureProvider::demo(fixed_now());
        let window = RecordWindow::trailing_week(fixed_now());
        let expired = RequestContext::with_deadline(window, Utc::now() - Duration::seconds(1));

        let err = try_resolve(&provider, &expired).unwrap_err();
        assert!(matches!(
            err,
            FetchError::DeadlineExceeded {
                kind: RecordKind::Steps
            }
        ));

        assert_eq!(resolve(&provider, &expired), whole_summary_fallback());
    }

    #[test]
    fn test_contexts_are_independent() {
        let window = RecordWindow::trailing_week(fixed_now());
        let first = RequestContext::new(window);
        let second = RequestContext::new(window);

        assert_ne!(first.request_id, second.request_id);
        assert_eq!(first.window, second.window);
    }

    #[test]
    fn test_bridge_serves_repeated_requests() {
        let provider = FixtureProvider::demo(Utc::now());
        let bridge = SummaryBridge::new(Box::new(provider));

        let first = bridge.summary();
        let second = bridge.summary();

        // Demo records all sit well inside the window, so repeated requests
        // agree field for field.
        assert_eq!(first, second);
        assert_eq!(first.step_count, 53900);
    }

    #[test]
    fn test_bridge_without_budget() {
        let provider = FixtureProvider::demo(Utc::now());
        let bridge = SummaryBridge::with_budget_ms(Box::new(provider), 0);

        assert!(bridge.try_summary().is_ok());
    }

    #[test]
    fn test_bridge_reports_provider_name() {
        let bridge = SummaryBridge::new(Box::new(FixtureProvider::demo(Utc::now())));
        assert_eq!(bridge.provider_name(), "fixture");

        let bridge = SummaryBridge::new(Box::new(UnavailableProvider));
        assert_eq!(bridge.provider_name(), "unavailable");
    }

    #[test]
    fn test_bridge_report_embeds_summary() {
        let bridge = SummaryBridge::new(Box::new(FixtureProvider::demo(Utc::now())));
        let report = bridge.report();

        assert_eq!(report.summary.step_count, 53900);
        assert!((0.0..=100.0).contains(&report.health_score));
    }

    #[test]
    fn test_bridge_over_unavailable_provider() {
        let bridge = SummaryBridge::new(Box::new(UnavailableProvider));

        assert_eq!(bridge.summary(), whole_summary_fallback());
        assert!(bridge.try_summary().is_err());
    }
}
