//! Error types for the TwinRaster engine
//!
//! Four families of failure flow through the engine:
//! - structured argument errors raised when a required collaborator is
//!   wrong or absent at construction time,
//! - native resource failures (device, buffer, shader compile),
//! - sequencing errors detected at render time (no camera, backend not ready),
//! - unsupported API / platform combinations reported by the factory.

use std::fmt;

/// Result type for TwinRaster engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// TwinRaster engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A required argument or collaborator was invalid
    InvalidArgument {
        class: &'static str,
        method: &'static str,
        message: String,
    },

    /// A collaborator required at render time is missing, or the call
    /// happened in the wrong lifecycle state
    Runtime {
        class: &'static str,
        method: &'static str,
        message: String,
    },

    /// The requested API or operation is not available
    NotSupported(String),

    /// Initialization of a backend or subsystem failed
    InitializationFailed(String),

    /// Native backend error (device, buffer, state object...)
    BackendError(String),

    /// Shader compile or link failure, with the native compiler output
    ShaderCompilation { shader: String, diagnostic: String },

    /// Asset could not be read from disk
    Io(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidArgument`]
    pub fn invalid_argument(class: &'static str, method: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidArgument { class, method, message: message.into() }
    }

    /// Shorthand for [`Error::Runtime`]
    pub fn runtime(class: &'static str, method: &'static str, message: impl Into<String>) -> Self {
        Error::Runtime { class, method, message: message.into() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument { class, method, message } => {
                write!(f, "Invalid argument in {}::{}: {}", class, method, message)
            }
            Error::Runtime { class, method, message } => {
                write!(f, "Runtime error in {}::{}: {}", class, method, message)
            }
            Error::NotSupported(msg) => write!(f, "Not supported: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::ShaderCompilation { shader, diagnostic } => {
                write!(f, "Shader '{}' failed to compile: {}", shader, diagnostic)
            }
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error.to_string())
    }
}

/// Log an error through a [`Log`](crate::log::Log) handle and return it as
/// `Err(Error::BackendError)` from the enclosing function
#[macro_export]
macro_rules! engine_bail {
    ($log:expr, $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($log, $source, "{}", message);
        return Err($crate::error::Error::BackendError(message));
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
