// Error types for the spectrogram renderer
//
// This module defines custom error types for audio intake and the render
// coordinator, providing structured error handling with stable numeric codes
// that host UIs can switch on.

mod decode;
mod render;

pub use decode::{log_decode_error, DecodeError, DecodeErrorCodes};
pub use render::{log_render_error, RenderError, RenderErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
