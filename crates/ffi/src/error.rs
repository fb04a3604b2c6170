use amrscope_core::Error;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for FFI error types.
///
/// - `code()` - Returns the error code to be passed across FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait AmrError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> AmrErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `AmrError` for FFI argument checks and core failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultAmrError {
    code: AmrErrorCode,
    msg: String,
}

impl DefaultAmrError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_dataset"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: AmrErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for an argument the core never sees (bad UTF-8, unknown enum value).
    pub fn invalid_parameter(param_name: &str, message: &str) -> Self {
        Self {
            code: AmrErrorCode::InvalidParameter,
            msg: format!("Parameter '{param_name}': {message}"),
        }
    }

    /// Create error for a caller buffer shorter than the data to copy.
    pub fn buffer_too_small(needed: usize, capacity: usize) -> Self {
        Self {
            code: AmrErrorCode::BufferTooSmall,
            msg: format!("Buffer holds {capacity} values, {needed} required"),
        }
    }
}

impl From<Error> for DefaultAmrError {
    fn from(error: Error) -> Self {
        let code = match &error {
            e if e.is_configuration() => AmrErrorCode::InvalidConfiguration,
            Error::MissingFile { .. } => AmrErrorCode::MissingFile,
            Error::Io { .. } => AmrErrorCode::Io,
            Error::MalformedHeader { .. }
            | Error::VariableCountMismatch { .. }
            | Error::CorruptPayload { .. } => AmrErrorCode::InvalidFile,
            Error::UnknownColumn(_) | Error::ColumnType { .. } => AmrErrorCode::UnknownColumn,
            _ => AmrErrorCode::Internal,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl AmrError for DefaultAmrError {
    fn code(&self) -> AmrErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by amrscope functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmrErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Invalid parameter passed to function (bad UTF-8, out-of-range enum value).
    InvalidParameter = 2,

    /// Rejected before any file was opened: units, ranges, shapes, level cap, variable
    /// names, metadata or an absent field group.
    InvalidConfiguration = 3,

    /// A per-rank file does not exist.
    MissingFile = 4,

    /// A per-rank file could not be read.
    Io = 5,

    /// A per-rank file has a malformed header, a variable count mismatch or a corrupt
    /// payload.
    InvalidFile = 6,

    /// The dataset has no column of that name, or it is not a float column.
    UnknownColumn = 7,

    /// The caller's buffer is too small; the required length was written.
    BufferTooSmall = 8,

    /// Any other failure (worker pool creation).
    Internal = 9,
}

impl From<DefaultAmrError> for AmrErrorCode {
    fn from(error: DefaultAmrError) -> Self {
        error.code
    }
}

thread_local! {
    /// Most recent FFI error of this thread (C string, error code).
    static LAST_ERROR: RefCell<(Option<CString>, AmrErrorCode)> = const { RefCell::new((None, AmrErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, AmrErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, AmrErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns `null` if the last call on this thread succeeded.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// AmrDataset* ds = NULL;
/// if (amr_snapshot_load(snap, AMR_FIELD_GROUP_HYDRO, NULL, NULL, 0, -1, &ds) != AMR_ERROR_CODE_OK) {
///     const char* error = amr_get_last_error();
///     if (error) {
///         fprintf(stderr, "load failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn amr_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code of this thread.
#[no_mangle]
pub extern "C" fn amr_get_last_error_code() -> AmrErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
