//! FFI bindings for Vitalsum
//!
//! This module provides C-compatible functions for calling the engine from
//! a mobile shell or other host language. All functions use C strings
//! (null-terminated) and return allocated memory that must be freed by the
//! caller using `vitalsum_free_string`.
//!
//! A host that reads records itself hands them to `vitalsum_aggregate`; a
//! host that wants the full request lifecycle drives a bridge built from a
//! fixture document (or from nothing, which always falls back).

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, TimeZone, Utc};

use crate::aggregate::Aggregator;
use crate::fallback::whole_summary_fallback;
use crate::insight;
use crate::pipeline::SummaryBridge;
use crate::provider::{FixtureProvider, UnavailableProvider};
use crate::types::{HealthSummary, RawSample, RecordBatch, RecordWindow};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Resolve the reference instant: zero means "now".
fn instant_from_millis(epoch_ms: i64) -> Option<DateTime<Utc>> {
    if epoch_ms == 0 {
        Some(Utc::now())
    } else {
        Utc.timestamp_millis_opt(epoch_ms).single()
    }
}

fn summary_to_cstr(summary: &HealthSummary) -> *mut c_char {
    match serde_json::to_string(summary) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Aggregate a JSON array of raw records into a summary.
///
/// `now_epoch_ms` anchors the trailing-week window; pass 0 to use the
/// current time.
///
/// # Safety
/// - `records_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with
///   `vitalsum_free_string`.
/// - Returns NULL on error; call `vitalsum_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn vitalsum_aggregate(
    records_json: *const c_char,
    now_epoch_ms: i64,
) -> *mut c_char {
    clear_last_error();

    let json = match cstr_to_string(records_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid records JSON pointer");
            return ptr::null_mut();
        }
    };

    let now = match instant_from_millis(now_epoch_ms) {
        Some(instant) => instant,
        None => {
            set_last_error("Timestamp out of range");
            return ptr::null_mut();
        }
    };

    let samples: Vec<RawSample> = match serde_json::from_str(&json) {
        Ok(samples) => samples,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let mut batch = RecordBatch::new();
    for sample in samples {
        batch.push(sample);
    }

    let window = RecordWindow::trailing_week(now);
    summary_to_cstr(&Aggregator::aggregate(&window, &batch))
}

/// Get the whole-summary fallback constant as JSON.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with
///   `vitalsum_free_string`.
/// - Returns NULL on error; call `vitalsum_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn vitalsum_fallback_summary() -> *mut c_char {
    clear_last_error();
    summary_to_cstr(&whole_summary_fallback())
}

/// Analyze a summary JSON object into an insight report.
///
/// # Safety
/// - `summary_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with
///   `vitalsum_free_string`.
/// - Returns NULL on error; call `vitalsum_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn vitalsum_analyze(summary_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json = match cstr_to_string(summary_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid summary JSON pointer");
            return ptr::null_mut();
        }
    };

    let summary: HealthSummary = match serde_json::from_str(&json) {
        Ok(summary) => summary,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match serde_json::to_string(&insight::analyze(&summary)) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Bridge API
// ============================================================================

/// Opaque handle to a SummaryBridge
pub struct SummaryBridgeHandle {
    bridge: SummaryBridge,
}

/// Create a bridge over a fixture document.
///
/// Passing NULL for `fixture_json` builds a bridge over an unavailable
/// provider, so every request resolves to the fallback summary. A budget of
/// zero or less disables the request deadline.
///
/// # Safety
/// - `fixture_json` must be NULL or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `vitalsum_bridge_free`.
/// - Returns NULL on error; call `vitalsum_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn vitalsum_bridge_new(
    fixture_json: *const c_char,
    budget_ms: i64,
) -> *mut SummaryBridgeHandle {
    clear_last_error();

    let bridge = if fixture_json.is_null() {
        SummaryBridge::with_budget_ms(Box::new(UnavailableProvider), budget_ms)
    } else {
        let json = match cstr_to_string(fixture_json) {
            Some(s) => s,
            None => {
                set_last_error("Fixture JSON is not valid UTF-8");
                return ptr::null_mut();
            }
        };
        match FixtureProvider::from_json(&json) {
            Ok(provider) => SummaryBridge::with_budget_ms(Box::new(provider), budget_ms),
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    Box::into_raw(Box::new(SummaryBridgeHandle { bridge }))
}

/// Resolve one summary request on a bridge.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `vitalsum_bridge_new`.
/// - Returns a newly allocated string that must be freed with
///   `vitalsum_free_string`.
/// - Returns NULL on error; call `vitalsum_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn vitalsum_bridge_summary(
    handle: *mut SummaryBridgeHandle,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null bridge pointer");
        return ptr::null_mut();
    }

    let handle = &*handle;
    summary_to_cstr(&handle.bridge.summary())
}

/// Resolve one request and return the full insight report.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `vitalsum_bridge_new`.
/// - Returns a newly allocated string that must be freed with
///   `vitalsum_free_string`.
/// - Returns NULL on error; call `vitalsum_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn vitalsum_bridge_report(handle: *mut SummaryBridgeHandle) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null bridge pointer");
        return ptr::null_mut();
    }

    let handle = &*handle;
    match serde_json::to_string(&handle.bridge.report()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a bridge.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `vitalsum_bridge_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn vitalsum_bridge_free(handle: *mut SummaryBridgeHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Vitalsum functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Vitalsum function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn vitalsum_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Vitalsum call on this
///   thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn vitalsum_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Vitalsum library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn vitalsum_version() -> *const c_char {
    // Use a static CString to avoid allocation
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
