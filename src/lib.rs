//! Vitalsum - On-device health summary engine
//!
//! Vitalsum turns a trailing week of raw health records into a fixed
//! seven-field summary through a deterministic pipeline: availability gate
//! → permission gate → per-kind fetch → validation → aggregation. A request
//! that fails at any gate resolves to a constant fallback summary, so
//! callers always receive a fully populated response.
//!
//! ## Modules
//!
//! - **Aggregation**: Fold typed records into the summary, with per-field
//!   defaults for missing and sentinel data
//! - **Insight**: Derive an advisory health score, risk breakdown and
//!   recommendations from a summary

pub mod aggregate;
pub mod error;
pub mod fallback;
pub mod insight;
pub mod pipeline;
pub mod provider;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use error::{FetchError, ProviderError};
pub use pipeline::{resolve, try_resolve, RequestContext, SummaryBridge};
pub use types::{HealthSummary, RawSample, RecordBatch, RecordKind, RecordWindow};

// Aggregation exports
pub use aggregate::Aggregator;
pub use fallback::whole_summary_fallback;

// Insight exports
pub use insight::{analyze, HealthReport, RiskLevel};

// Provider exports
pub use provider::{FixtureProvider, HealthDataProvider, UnavailableProvider};

/// Engine version embedded in diagnostics and the FFI surface
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name for diagnostics
pub const ENGINE_NAME: &str = "vitalsum";
