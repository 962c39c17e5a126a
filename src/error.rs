//! Error types for Vitalsum

use thiserror::Error;

use crate::types::RecordKind;

/// Errors a health-data provider can produce while reading records.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider backend error: {0}")]
    Backend(String),

    #[error("Invalid record JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record kind not supported by this provider: {0}")]
    Unsupported(RecordKind),
}

/// Why a request could not complete the real pipeline.
///
/// None of these reach the caller of the summary API; the orchestration
/// layer converts every variant into the whole-summary fallback. They exist
/// so the fallback cause can be reported on the diagnostic channel and
/// inspected by callers of the fallible entry point.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Health data provider is unavailable")]
    ProviderUnavailable,

    #[error("Permission denied for record kinds: {}", format_kinds(.missing))]
    PermissionDenied { missing: Vec<RecordKind> },

    #[error("Reading {kind} records failed: {source}")]
    ReadFailed {
        kind: RecordKind,
        #[source]
        source: ProviderError,
    },

    #[error("Malformed {kind} record: {detail}")]
    MalformedRecord { kind: RecordKind, detail: String },

    #[error("Request deadline exceeded while fetching {kind} records")]
    DeadlineExceeded { kind: RecordKind },
}

fn format_kinds(kinds: &[RecordKind]) -> String {
    let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
    names.join(", ")
}
