// Render coordinator error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Render error code constants
///
/// Error code range: 2001-2007
pub struct RenderErrorCodes {}

impl RenderErrorCodes {
    /// Plot width or height is zero
    pub const DEGENERATE_LAYOUT: i32 = 2001;

    /// No instance registered under the given id
    pub const UNKNOWN_INSTANCE: i32 = 2002;

    /// Instance has no decoded audio attached yet
    pub const NO_AUDIO: i32 = 2003;

    /// Export requested but no instance has a rendered buffer
    pub const EXPORT_EMPTY: i32 = 2004;

    /// Composite image could not be encoded
    pub const EXPORT_ENCODE: i32 = 2005;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 2006;

    /// Background render thread could not be started
    pub const WORKER_SPAWN: i32 = 2007;
}

/// Log a render error with structured context
pub fn log_render_error(err: &RenderError, context: &str) {
    error!(
        "Render error in {}: code={}, component=RenderCoordinator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors surfaced by the render coordinator and the engine facade
///
/// None of these are fatal: a degenerate layout skips the pass until the next
/// layout event, an empty export is a no-op for the caller.
///
/// Error code range: 2001-2007
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Plot area has zero width or height
    DegenerateLayout { width: u32, height: u32 },

    /// Instance id not registered (or already destroyed)
    UnknownInstance { id: u64 },

    /// Instance exists but has no audio attached
    NoAudio { id: u64 },

    /// Nothing to export
    ExportEmpty,

    /// PNG encoding failed
    ExportEncode { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Render worker thread failed to start
    WorkerSpawn { details: String },
}

impl ErrorCode for RenderError {
    fn code(&self) -> i32 {
        match self {
            RenderError::DegenerateLayout { .. } => RenderErrorCodes::DEGENERATE_LAYOUT,
            RenderError::UnknownInstance { .. } => RenderErrorCodes::UNKNOWN_INSTANCE,
            RenderError::NoAudio { .. } => RenderErrorCodes::NO_AUDIO,
            RenderError::ExportEmpty => RenderErrorCodes::EXPORT_EMPTY,
            RenderError::ExportEncode { .. } => RenderErrorCodes::EXPORT_ENCODE,
            RenderError::LockPoisoned { .. } => RenderErrorCodes::LOCK_POISONED,
            RenderError::WorkerSpawn { .. } => RenderErrorCodes::WORKER_SPAWN,
        }
    }

    fn message(&self) -> String {
        match self {
            RenderError::DegenerateLayout { width, height } => {
                format!("Plot area is degenerate ({}x{})", width, height)
            }
            RenderError::UnknownInstance { id } => format!("Unknown instance {}", id),
            RenderError::NoAudio { id } => format!("Instance {} has no decoded audio", id),
            RenderError::ExportEmpty => "No decoded audio to export".to_string(),
            RenderError::ExportEncode { reason } => {
                format!("Failed to encode composite image: {}", reason)
            }
            RenderError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            RenderError::WorkerSpawn { details } => {
                format!("Failed to start render worker: {}", details)
            }
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RenderError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for RenderError {}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        RenderError::ExportEncode {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_codes() {
        assert_eq!(
            RenderError::DegenerateLayout {
                width: 0,
                height: 10
            }
            .code(),
            2001
        );
        assert_eq!(RenderError::UnknownInstance { id: 3 }.code(), 2002);
        assert_eq!(RenderError::NoAudio { id: 3 }.code(), 2003);
        assert_eq!(RenderError::ExportEmpty.code(), 2004);
        assert_eq!(
            RenderError::ExportEncode {
                reason: "test".to_string()
            }
            .code(),
            2005
        );
        assert_eq!(
            RenderError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            2006
        );
        assert_eq!(
            RenderError::WorkerSpawn {
                details: "test".to_string()
            }
            .code(),
            2007
        );
    }

    #[test]
    fn test_render_error_messages() {
        let err = RenderError::DegenerateLayout {
            width: 0,
            height: 120,
        };
        assert_eq!(err.message(), "Plot area is degenerate (0x120)");

        let err = RenderError::LockPoisoned {
            component: "instances".to_string(),
        };
        assert!(err.message().contains("instances"));
    }

    #[test]
    fn test_error_code_trait_object() {
        let err: &dyn ErrorCode = &RenderError::ExportEmpty;
        assert_eq!(err.code(), RenderErrorCodes::EXPORT_EMPTY);
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), RenderError> {
            Err(RenderError::UnknownInstance { id: 9 })
        }

        fn caller() -> Result<(), RenderError> {
            may_fail()?;
            Ok(())
        }

        assert!(caller().is_err());
    }
}
