// Decode error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Decode error code constants
///
/// Single source of truth for the numeric codes attached to [`DecodeError`].
///
/// Error code range: 1001-1005
pub struct DecodeErrorCodes {}

impl DecodeErrorCodes {
    /// Container or codec is not supported by the decoder
    pub const UNSUPPORTED: i32 = 1001;

    /// Container was recognised but its payload is malformed
    pub const CORRUPT: i32 = 1002;

    /// Stream decoded to zero samples
    pub const EMPTY: i32 = 1003;

    /// Header reported a sample rate of zero
    pub const ZERO_SAMPLE_RATE: i32 = 1004;

    /// Underlying reader failed
    pub const IO: i32 = 1005;
}

/// Log a decode error with structured context
///
/// Logs the error code, the component and the human-readable message. Decode
/// failures are per-instance and never abort the render loop, so this is the
/// only place they surface besides the instance status line.
pub fn log_decode_error(err: &DecodeError, context: &str) {
    error!(
        "Decode error in {}: code={}, component=AudioDecoder, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio intake errors
///
/// Raised by the decoding collaborator when the bytes handed to it cannot be
/// turned into PCM samples.
///
/// Error code range: 1001-1005
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Container or codec not handled by the decoder
    Unsupported { reason: String },

    /// Recognised container with malformed content
    Corrupt { reason: String },

    /// No samples in the decoded stream
    Empty,

    /// Sample rate of zero reported by the container
    ZeroSampleRate,

    /// Reader failure
    Io { details: String },
}

impl ErrorCode for DecodeError {
    fn code(&self) -> i32 {
        match self {
            DecodeError::Unsupported { .. } => DecodeErrorCodes::UNSUPPORTED,
            DecodeError::Corrupt { .. } => DecodeErrorCodes::CORRUPT,
            DecodeError::Empty => DecodeErrorCodes::EMPTY,
            DecodeError::ZeroSampleRate => DecodeErrorCodes::ZERO_SAMPLE_RATE,
            DecodeError::Io { .. } => DecodeErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            DecodeError::Unsupported { reason } => {
                format!("Unsupported audio format: {}", reason)
            }
            DecodeError::Corrupt { reason } => format!("Corrupt audio data: {}", reason),
            DecodeError::Empty => "Audio stream contains no samples".to_string(),
            DecodeError::ZeroSampleRate => "Audio stream reports a sample rate of 0".to_string(),
            DecodeError::Io { details } => format!("Failed to read audio data: {}", details),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DecodeError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DecodeError {}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Io {
            details: err.to_string(),
        }
    }
}

impl From<hound::Error> for DecodeError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => DecodeError::from(io),
            hound::Error::Unsupported => DecodeError::Unsupported {
                reason: "WAV sample layout".to_string(),
            },
            other => DecodeError::Corrupt {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_codes() {
        assert_eq!(
            DecodeError::Unsupported {
                reason: "test".to_string()
            }
            .code(),
            DecodeErrorCodes::UNSUPPORTED
        );
        assert_eq!(
            DecodeError::Corrupt {
                reason: "test".to_string()
            }
            .code(),
            DecodeErrorCodes::CORRUPT
        );
        assert_eq!(DecodeError::Empty.code(), DecodeErrorCodes::EMPTY);
        assert_eq!(
            DecodeError::ZeroSampleRate.code(),
            DecodeErrorCodes::ZERO_SAMPLE_RATE
        );
        assert_eq!(
            DecodeError::Io {
                details: "test".to_string()
            }
            .code(),
            DecodeErrorCodes::IO
        );
    }

    #[test]
    fn test_decode_error_messages() {
        let err = DecodeError::Unsupported {
            reason: "ogg".to_string(),
        };
        assert_eq!(err.message(), "Unsupported audio format: ogg");

        let err = DecodeError::Empty;
        assert!(err.message().contains("no samples"));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::ZeroSampleRate;
        let display = format!("{}", err);
        assert!(display.contains("DecodeError"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("test io error");
        let decode_err: DecodeError = io_err.into();
        match decode_err {
            DecodeError::Io { details } => assert!(details.contains("test io error")),
            _ => panic!("Expected Io"),
        }
    }

    #[test]
    fn test_from_hound_error() {
        let err: DecodeError = hound::Error::FormatError("no RIFF tag found").into();
        assert_eq!(err.code(), DecodeErrorCodes::CORRUPT);

        let err: DecodeError = hound::Error::Unsupported.into();
        assert_eq!(err.code(), DecodeErrorCodes::UNSUPPORTED);
    }
}
