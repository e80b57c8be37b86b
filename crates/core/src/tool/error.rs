use std::borrow::Cow;
use std::fmt::{self, Display};

use serde_json::{Map, Value};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input provided to the tool was invalid.
    InvalidInput,
    /// Error occurred while executing the tool.
    ExecutionError,
    /// No tool is registered under the requested name.
    NotFound,
    /// The tool needs outside input before it can produce a result.
    Interrupt,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "Invalid input"),
            ErrorKind::ExecutionError => write!(f, "Execution error"),
            ErrorKind::NotFound => write!(f, "Tool not found"),
            ErrorKind::Interrupt => write!(f, "Interrupted"),
        }
    }
}

/// Describes a tool call error.
///
/// The [`Interrupt`](ErrorKind::Interrupt) kind is not a failure: it
/// suspends the turn and carries the metadata that is handed to the
/// caller, e.g. a question to be answered by a human.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
    metadata: Map<String, Value>,
}

impl Error {
    #[inline]
    fn with_kind(kind: ErrorKind) -> Self {
        Self {
            kind,
            reason: None,
            metadata: Map::new(),
        }
    }

    /// Creates a new error with the `InvalidInput` kind.
    #[inline]
    pub fn invalid_input() -> Self {
        Self::with_kind(ErrorKind::InvalidInput)
    }

    /// Creates a new error with the `ExecutionError` kind.
    #[inline]
    pub fn execution_error() -> Self {
        Self::with_kind(ErrorKind::ExecutionError)
    }

    /// Creates a new error with the `NotFound` kind.
    #[inline]
    pub fn not_found() -> Self {
        Self::with_kind(ErrorKind::NotFound)
    }

    /// Creates an interrupt carrying the given metadata.
    #[inline]
    pub fn interrupt(metadata: Map<String, Value>) -> Self {
        Self {
            metadata,
            ..Self::with_kind(ErrorKind::Interrupt)
        }
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            reason: Some(reason.into()),
            ..self
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` if this error suspends the turn.
    #[inline]
    pub fn is_interrupt(&self) -> bool {
        self.kind == ErrorKind::Interrupt
    }

    /// Returns the metadata of an interrupt, empty for other kinds.
    #[inline]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    #[inline]
    pub(crate) fn into_metadata(self) -> Map<String, Value> {
        self.metadata
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {reason}", self.kind),
            None => Display::fmt(&self.kind, f),
        }
    }
}

impl std::error::Error for Error {}
