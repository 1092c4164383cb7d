//! FFI layer for embedding the engine in a host shell.
//!
//! This module provides C-compatible functions that a browser/WASM or native
//! game shell can call. All data crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `snakeboard_*` functions are allocated by Rust
//! - Caller must free them with `snakeboard_string_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{
    reconcile, snapshot, Leaderboard, PlayerName, RemoteRow, ScoreRecord, SubmitOutcome,
    Timestamp,
};
use std::ffi::{c_char, CStr, CString};

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

/// Outcome of applying a score to a leaderboard.
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct AppliedScore {
    leaderboard: Leaderboard,
    outcome: SubmitOutcome,
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `snakeboard_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        // String contained null bytes - return error JSON
        Err(_) => CString::new(r#"{"error":"string contained null bytes"}"#)
            .map(CString::into_raw)
            .unwrap_or(std::ptr::null_mut()),
    }
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn error_json(message: impl Into<String>) -> *mut c_char {
    to_c_string(FfiResult::<()>::err(message).to_json())
}

unsafe fn parse_candidate(
    name: *const c_char,
    score: u64,
    timestamp: Timestamp,
) -> Result<ScoreRecord, String> {
    let raw = from_c_string(name).ok_or_else(|| "invalid player name".to_string())?;
    let name = PlayerName::parse(raw).map_err(|e| e.to_string())?;
    Ok(ScoreRecord::new(name, score, timestamp))
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `snakeboard_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn snakeboard_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Leaderboard Operations
// ============================================================================

/// Reduce raw remote rows to the one-entry-per-player leaderboard.
///
/// # Arguments
/// - `rows_json`: JSON array of RemoteRow
///
/// # Returns
/// JSON string: `{"ok": [ScoreRecord, ...]}` or `{"error": "message"}`
///
/// # Safety
/// - `rows_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `snakeboard_string_free`
#[no_mangle]
pub unsafe extern "C" fn snakeboard_reduce(rows_json: *const c_char) -> *mut c_char {
    let rows_str = match from_c_string(rows_json) {
        Some(s) => s,
        None => return error_json("invalid rows JSON"),
    };

    let rows: Vec<RemoteRow> = match serde_json::from_str(&rows_str) {
        Ok(r) => r,
        Err(e) => return error_json(format!("parse error: {}", e)),
    };

    to_c_string(FfiResult::ok(reconcile::reduce_rows(&rows)).to_json())
}

/// Apply a score to a leaderboard with the create-or-improve rule.
///
/// # Returns
/// JSON string: `{"ok": {"leaderboard": [...], "outcome": {...}}}` or
/// `{"error": "message"}`
///
/// # Safety
/// - `leaderboard_json` and `name` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `snakeboard_string_free`
#[no_mangle]
pub unsafe extern "C" fn snakeboard_apply_score(
    leaderboard_json: *const c_char,
    name: *const c_char,
    score: u64,
    timestamp: u64,
) -> *mut c_char {
    let board_str = match from_c_string(leaderboard_json) {
        Some(s) => s,
        None => return error_json("invalid leaderboard JSON"),
    };

    let mut leaderboard: Leaderboard = match serde_json::from_str(&board_str) {
        Ok(b) => b,
        Err(e) => return error_json(format!("parse error: {}", e)),
    };

    let candidate = match parse_candidate(name, score, timestamp) {
        Ok(c) => c,
        Err(e) => return error_json(e),
    };

    let outcome = reconcile::apply_candidate(&mut leaderboard, &candidate);
    to_c_string(
        FfiResult::ok(AppliedScore {
            leaderboard,
            outcome,
        })
        .to_json(),
    )
}

/// Plan the remote mutation for a score, given the rows currently stored.
///
/// # Returns
/// JSON string: `{"ok": WritePlan}` or `{"error": "message"}`
///
/// # Safety
/// - `rows_json` and `name` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `snakeboard_string_free`
#[no_mangle]
pub unsafe extern "C" fn snakeboard_plan_remote_write(
    rows_json: *const c_char,
    name: *const c_char,
    score: u64,
    timestamp: u64,
) -> *mut c_char {
    let rows_str = match from_c_string(rows_json) {
        Some(s) => s,
        None => return error_json("invalid rows JSON"),
    };

    let rows: Vec<RemoteRow> = match serde_json::from_str(&rows_str) {
        Ok(r) => r,
        Err(e) => return error_json(format!("parse error: {}", e)),
    };

    let candidate = match parse_candidate(name, score, timestamp) {
        Ok(c) => c,
        Err(e) => return error_json(e),
    };

    to_c_string(FfiResult::ok(reconcile::plan_remote_write(&rows, &candidate)).to_json())
}

/// Decode a cached leaderboard. Missing or corrupt caches decode as empty.
///
/// # Returns
/// JSON string: `{"ok": [ScoreRecord, ...]}`
///
/// # Safety
/// - `cache_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `snakeboard_string_free`
#[no_mangle]
pub unsafe extern "C" fn snakeboard_decode_cache(cache_json: *const c_char) -> *mut c_char {
    let leaderboard = from_c_string(cache_json)
        .and_then(|s| snapshot::decode_leaderboard(&s).ok())
        .unwrap_or_default();
    to_c_string(FfiResult::ok(leaderboard).to_json())
}

/// Get the engine version.
#[no_mangle]
pub extern "C" fn snakeboard_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
