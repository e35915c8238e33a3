//! Whether trying again could help

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// Same input, same failure.
    Permanent,
    /// Worth another attempt.
    Temporary,
    /// Was temporary until the attempts ran out.
    Persistent,
}

impl ErrorStatus {
    pub fn is_retryable(&self) -> bool {
        *self == ErrorStatus::Temporary
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
            ErrorStatus::Persistent => "persistent",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
