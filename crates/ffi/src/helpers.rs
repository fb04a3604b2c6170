use crate::error::{with_last_error_mut, AmrError, AmrErrorCode, DefaultAmrError};
use std::ffi::{c_char, CStr, CString};

/// Set the thread-local error message and code.
pub(crate) fn set_last_error(error: &impl AmrError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl AmrError) -> AmrErrorCode {
    set_last_error(error);
    error.code()
}

/// Clear the thread-local error message and code.
/// Called at the start of every fallible entry point.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = AmrErrorCode::Ok;
    });
}

/// Run a fallible body, recording any error and converting the outcome to a code.
pub(crate) fn track_result(body: impl FnOnce() -> Result<(), DefaultAmrError>) -> AmrErrorCode {
    clear_last_error();
    match body() {
        Ok(()) => AmrErrorCode::Ok,
        Err(e) => track_error(&e),
    }
}

/// Borrow a required pointer argument.
///
/// # Safety
/// `ptr` must be null or point to a valid `T` for the duration of the call.
pub(crate) unsafe fn required<'a, T>(ptr: *const T, name: &str) -> Result<&'a T, DefaultAmrError> {
    // SAFETY: caller guarantees validity when non-null
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultAmrError::null_pointer(name))
}

/// Read an optional C string; null maps to `None`.
///
/// # Safety
/// `ptr` must be null or a valid null-terminated string.
pub(crate) unsafe fn optional_str<'a>(
    ptr: *const c_char,
    name: &str,
) -> Result<Option<&'a str>, DefaultAmrError> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: non-null and null-terminated per the caller contract
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(Some)
        .map_err(|_| DefaultAmrError::invalid_parameter(name, "not valid UTF-8"))
}

/// Read a required C string.
///
/// # Safety
/// See [`optional_str`].
pub(crate) unsafe fn required_str<'a>(
    ptr: *const c_char,
    name: &str,
) -> Result<&'a str, DefaultAmrError> {
    // SAFETY: forwarded caller contract
    unsafe { optional_str(ptr, name) }?.ok_or_else(|| DefaultAmrError::null_pointer(name))
}
