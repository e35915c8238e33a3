use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// A franz failure.
///
/// Errors start out [`ErrorStatus::Permanent`]; whoever knows better, such as
/// the provider retry loop, sets the status.
///
/// Carries the kind, a message, where it happened (`operation`, with earlier
/// operations kept under `called`), free-form context and the lower-level
/// cause.
///
/// ```rust
/// use franz_error::{Error, ErrorKind, ErrorStatus};
///
/// let err = Error::inference_failed("VLM request failed after 5 attempts")
///     .with_status(ErrorStatus::Persistent)
///     .with_operation("provider::complete_with_retry")
///     .with_context("attempts", "5")
///     .with_operation("agent::run_turn");
///
/// assert_eq!(err.kind(), ErrorKind::InferenceFailed);
/// assert_eq!(err.operation(), "agent::run_turn");
/// assert_eq!(err.context_value("called"), Some("provider::complete_with_retry"));
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: ErrorStatus::Permanent,
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// First context value recorded under `key`
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find_map(|(k, v)| (*k == key).then_some(v.as_str()))
    }

    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Name the operation that failed.
    ///
    /// Calling it again as the error travels up keeps the inner operation
    /// as a `called` context entry.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying cause. Only once per error.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }
}

impl Error {
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// `reason` becomes the message, `path` a context entry
    pub fn state_corrupt(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::StateCorrupt, reason).with_context("path", path)
    }

    pub fn storage_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageFailed, message)
    }

    pub fn executor_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExecutorFailed, message)
    }

    pub fn executor_timeout(secs: f64) -> Self {
        Self::new(ErrorKind::ExecutorTimeout, format!("executor did not finish within {:.1}s", secs))
            .with_context("timeout_secs", format!("{:.1}", secs))
    }

    pub fn inference_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InferenceFailed, message)
    }

    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message)
    }
}

/// One line for `warn!` fields: `op: Kind (status): message [k=v, ...]`
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.operation.is_empty() {
            write!(f, "{}: ", self.operation)?;
        }
        write!(f, "{} ({})", self.kind, self.status)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if !self.context.is_empty() {
            let pairs: Vec<String> = self.context.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            write!(f, " [{}]", pairs.join(", "))?;
        }
        Ok(())
    }
}

/// The trace printed when a run dies: header, context, then the cause chain.
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) in {}", self.kind, self.status, self.operation)?;
        if !self.message.is_empty() {
            writeln!(f, "  {}", self.message)?;
        }
        for (key, value) in &self.context {
            writeln!(f, "  {} = {}", key, value)?;
        }
        if let Some(source) = &self.source {
            for (depth, cause) in source.chain().enumerate() {
                writeln!(f, "  caused by ({}): {}", depth, cause)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// `NotFound` and `PermissionDenied` keep their identity, the rest is `IoFailed`.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string()).with_operation("io").set_source(err)
    }
}
