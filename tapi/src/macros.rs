//! Convenience macros layered over the public API.
//!
//! These mirror the original's small family of `tapi_mock_return_*`
//! helpers (`include/tapi/stub.h`) and the quick single-shot capture
//! helper, both expressed here as ordinary replacement functions plus a
//! macro that wires up the `Mock` for the common case.

/// Build a zero-argument replacement function that always returns
/// `$value`, suitable as the `replacement` pointer passed to
/// [`crate::mock::Mock::create`] or [`crate::runner::Test::add_mock`].
///
/// ```ignore
/// mock_return!(stub_zero, i32, 0);
/// ```
#[macro_export]
macro_rules! mock_return {
    ($name:ident, $ret:ty, $value:expr) => {
        #[inline(never)]
        extern "C" fn $name() -> $ret {
            $value
        }
    };
}

/// Shorthand for an `i32`-returning replacement.
#[macro_export]
macro_rules! mock_return_int {
    ($name:ident, $value:expr) => {
        $crate::mock_return!($name, i32, $value);
    };
}

/// Shorthand for a replacement returning a null pointer.
#[macro_export]
macro_rules! mock_return_null {
    ($name:ident, $ty:ty) => {
        #[inline(never)]
        extern "C" fn $name() -> *mut $ty {
            std::ptr::null_mut()
        }
    };
}

/// Shorthand for a replacement returning a fixed, 'static C string
/// pointer.
#[macro_export]
macro_rules! mock_return_str {
    ($name:ident, $value:expr) => {
        #[inline(never)]
        extern "C" fn $name() -> *const std::os::raw::c_char {
            concat!($value, "\0").as_ptr().cast()
        }
    };
}

/// Begin capturing `stdout` for the rest of the current scope, draining
/// into a fresh buffer sink on drop-equivalent `quick_capture_end!`.
#[macro_export]
macro_rules! quick_capture {
    () => {
        $crate::capture::Capture::make($crate::capture::StdStream::Stdout)
    };
}

/// End a capture started with [`quick_capture!`], draining it into
/// `$sink`.
#[macro_export]
macro_rules! quick_capture_end {
    ($capture:expr, $sink:expr) => {
        $capture.end(&mut $sink)
    };
}
