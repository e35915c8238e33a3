//! Core error helpers
//!
//! Re-exports franz-error and provides constructors shared by the core modules.

pub use franz_error::{Error, ErrorKind, ErrorStatus, Result};

/// Create an IoFailed error
pub fn io_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::IoFailed, message)
}

/// Create a SerializationFailed error
pub fn serialization_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::SerializationFailed, message)
}

