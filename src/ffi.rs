//! FFI bindings for Synheart Titra
//!
//! This module provides C-compatible functions for calling Titra from
//! device firmware and other languages. All functions use C strings
//! (null-terminated) and return allocated memory that must be freed by
//! the caller using `titra_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::classifier::AirwayClassifier;
use crate::controller::TitrationConfig;
use crate::pipeline::TitraProcessor;
use crate::types::FlowWindow;

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

/// Helper to build a FlowWindow from raw sample memory
unsafe fn window_from_raw(
    samples: *const f64,
    len: usize,
    sample_rate_hz: u32,
) -> Option<FlowWindow> {
    if samples.is_null() {
        return None;
    }
    let slice = std::slice::from_raw_parts(samples, len);
    Some(FlowWindow::new(slice.to_vec(), sample_rate_hz))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Classify one flow window and return the result as JSON.
///
/// # Safety
/// - `samples` must point to `len` valid f64 values.
/// - Returns a newly allocated string that must be freed with
///   `titra_free_string`.
/// - Returns NULL on error; call `titra_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn titra_classify(
    samples: *const f64,
    len: usize,
    sample_rate_hz: u32,
) -> *mut c_char {
    clear_last_error();

    let window = match window_from_raw(samples, len, sample_rate_hz) {
        Some(w) => w,
        None => {
            set_last_error("Null samples pointer");
            return ptr::null_mut();
        }
    };

    let classifier = AirwayClassifier::new();
    match classifier.classify(&window) {
        Ok(result) => match serde_json::to_string(&result) {
            Ok(json) => string_to_cstr(&json),
            Err(e) => {
                set_last_error(&e.to_string());
                ptr::null_mut()
            }
        },
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a TitraProcessor
pub struct TitraProcessorHandle {
    processor: TitraProcessor,
}

/// Create a new TitraProcessor.
///
/// `titration_config_json` may be NULL for defaults, or a JSON object
/// with any subset of the titration configuration fields.
///
/// # Safety
/// - Returns a pointer to a newly allocated TitraProcessor.
/// - Must be freed with `titra_processor_free`.
/// - Returns NULL on error; call `titra_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn titra_processor_new(
    titration_config_json: *const c_char,
) -> *mut TitraProcessorHandle {
    clear_last_error();

    let config = if titration_config_json.is_null() {
        TitrationConfig::default()
    } else {
        let json = match cstr_to_string(titration_config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid configuration string pointer");
                return ptr::null_mut();
            }
        };
        match serde_json::from_str::<TitrationConfig>(&json) {
            Ok(cfg) => cfg,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match TitraProcessor::with_config(Default::default(), config) {
        Ok(processor) => Box::into_raw(Box::new(TitraProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a TitraProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `titra_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn titra_processor_free(processor: *mut TitraProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Process one breath cycle and return the outcome as JSON.
///
/// `leak_lpm` is the instantaneous circuit leak in L/min; pass 0 when no
/// leak estimate is available.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `titra_processor_new`.
/// - `samples` must point to `len` valid f64 values.
/// - Returns a newly allocated string that must be freed with
///   `titra_free_string`.
/// - Returns NULL on error; call `titra_last_error` for the message. The
///   processor state is unchanged on error.
#[no_mangle]
pub unsafe extern "C" fn titra_processor_process_breath(
    processor: *mut TitraProcessorHandle,
    samples: *const f64,
    len: usize,
    sample_rate_hz: u32,
    leak_lpm: f64,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let window = match window_from_raw(samples, len, sample_rate_hz) {
        Some(w) => w,
        None => {
            set_last_error("Null samples pointer");
            return ptr::null_mut();
        }
    };

    let handle = &mut *processor;
    match handle.processor.process_breath(&window, Some(leak_lpm)) {
        Ok(outcome) => match serde_json::to_string(&outcome) {
            Ok(json) => string_to_cstr(&json),
            Err(e) => {
                set_last_error(&e.to_string());
                ptr::null_mut()
            }
        },
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Checkpoint processor state to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `titra_processor_new`.
/// - Returns a newly allocated string that must be freed with
///   `titra_free_string`.
/// - Returns NULL on error; call `titra_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn titra_processor_save_state(
    processor: *mut TitraProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;
    match handle.processor.save_state() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Restore processor state from a JSON checkpoint.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `titra_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `titra_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn titra_processor_load_state(
    processor: *mut TitraProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    let handle = &mut *processor;
    match handle.processor.load_state(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Titra functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Titra function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn titra_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Titra function call on
///   this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn titra_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Titra library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn titra_version() -> *const c_char {
    // Use a static CString to avoid allocation
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
