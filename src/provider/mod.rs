//! Health-data provider abstraction
//!
//! The engine never talks to a platform health store directly. A
//! [`HealthDataProvider`] is handed in by the caller, keeping the provider's
//! lifecycle (client setup, permission prompts) outside the core. The
//! built-in [`FixtureProvider`] implements the trait over a JSON document
//! for tests, demos and the command-line tool.

mod fixture;

pub use fixture::FixtureProvider;

use std::collections::HashSet;

use crate::error::ProviderError;
use crate::types::{RawSample, RecordKind, RecordWindow};

/// A source of raw health records.
///
/// Implementations wrap whatever store the host platform offers. Reads are
/// independent per kind and carry no ordering requirements between kinds.
pub trait HealthDataProvider: Send + Sync {
    /// Short identifier used on the diagnostic channel.
    fn name(&self) -> &'static str;

    /// Whether the backing store can be reached at all.
    fn is_available(&self) -> bool;

    /// The record kinds the user has granted read access to.
    fn granted_permissions(&self) -> HashSet<RecordKind>;

    /// Read all records of one kind inside the window, chronologically.
    fn read_records(
        &self,
        kind: RecordKind,
        window: &RecordWindow,
    ) -> Result<Vec<RawSample>, ProviderError>;
}

/// A provider whose store can never be reached.
///
/// Every request against it resolves to the whole-summary fallback, which
/// makes it the safe stand-in when no real provider was supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProvider;

impl HealthDataProvider for UnavailableProvider {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn granted_permissions(&self) -> HashSet<RecordKind> {
        HashSet::new()
    }

    fn read_records(
        &self,
        _kind: RecordKind,
        _window: &RecordWindow,
    ) -> Result<Vec<RawSample>, ProviderError> {
        Err(ProviderError::Backend(
            "provider is unavailable".to_string(),
        ))
    }
}
