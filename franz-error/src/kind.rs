//! What went wrong, grouped by the part of a turn that failed

use std::fmt;

/// The kind of error that occurred.
///
/// Only `InferenceFailed` ever ends a run. Everything else is absorbed by the
/// turn that hit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The sampling config file is unreadable or out of range
    ConfigInvalid,

    /// `state.json` exists but is not a turn record
    StateCorrupt,
    /// Writing the turn record failed
    StorageFailed,
    SerializationFailed,

    /// The executor could not be spawned or gave no usable answer
    ExecutorFailed,
    /// The executor was killed after running too long
    ExecutorTimeout,

    /// The VLM endpoint did not produce a story
    InferenceFailed,

    FileNotFound,
    PermissionDenied,
    IoFailed,
    ParseFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::StateCorrupt => "StateCorrupt",
            ErrorKind::StorageFailed => "StorageFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",
            ErrorKind::ExecutorFailed => "ExecutorFailed",
            ErrorKind::ExecutorTimeout => "ExecutorTimeout",
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::ParseFailed => "ParseFailed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_variant_name() {
        assert_eq!(ErrorKind::StateCorrupt.to_string(), "StateCorrupt");
        assert_eq!(ErrorKind::InferenceFailed.to_string(), "InferenceFailed");
    }
}
