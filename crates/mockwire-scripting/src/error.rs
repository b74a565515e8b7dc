//! Script evaluation error types

use std::fmt;

/// Script evaluation result type
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Script evaluation error
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// Script failed to parse
    CompilationError {
        /// Error message
        message: String,
        /// Line number if available
        line: Option<usize>,
        /// Column number if available
        column: Option<usize>,
    },

    /// Script raised an error or exceeded a resource limit
    RuntimeError {
        /// Error message
        message: String,
        /// Script line where error occurred
        line: Option<usize>,
    },

    /// Script ran past its wall-clock deadline
    Timeout {
        /// Deadline in milliseconds
        timeout_ms: u64,
    },

    /// Script result is not a valid response
    InvalidExport {
        /// Error message
        message: String,
    },

    /// Value can't cross the script boundary
    TypeError {
        /// Error message
        message: String,
    },

    /// Evaluation task panicked or was cancelled
    Panic {
        /// Panic message
        message: String,
    },
}

impl ScriptError {
    /// Create a runtime error
    pub fn runtime<S: Into<String>>(message: S) -> Self {
        Self::RuntimeError {
            message: message.into(),
            line: None,
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Create an invalid export error
    pub fn invalid_export<S: Into<String>>(message: S) -> Self {
        Self::InvalidExport {
            message: message.into(),
        }
    }

    /// Create a type error
    pub fn type_error<S: Into<String>>(message: S) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    /// Create a panic error
    pub fn panic<S: Into<String>>(message: S) -> Self {
        Self::Panic {
            message: message.into(),
        }
    }

    /// Whether the deadline was hit
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Convert into the workspace error, attributing it to `mock`
    pub fn into_error(self, mock: impl Into<String>) -> mockwire_core::Error {
        if self.is_timeout() {
            mockwire_core::Error::script_timeout(mock, self.to_string())
        } else {
            mockwire_core::Error::script(mock, self.to_string())
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompilationError {
                message,
                line,
                column,
            } => {
                write!(f, "Script compilation error: {}", message)?;
                if let Some(line) = line {
                    write!(f, " at line {}", line)?;
                    if let Some(col) = column {
                        write!(f, ", column {}", col)?;
                    }
                }
                Ok(())
            }
            Self::RuntimeError { message, line } => {
                write!(f, "Script runtime error: {}", message)?;
                if let Some(line) = line {
                    write!(f, " at line {}", line)?;
                }
                Ok(())
            }
            Self::Timeout { timeout_ms } => {
                write!(f, "Script timeout after {}ms", timeout_ms)
            }
            Self::InvalidExport { message } => {
                write!(f, "Invalid script result: {}", message)
            }
            Self::TypeError { message } => {
                write!(f, "Script type error: {}", message)
            }
            Self::Panic { message } => {
                write!(f, "Script panic: {}", message)
            }
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<rhai::ParseError> for ScriptError {
    fn from(err: rhai::ParseError) -> Self {
        let pos = err.position();
        Self::CompilationError {
            message: err.err_type().to_string(),
            line: pos.line(),
            column: pos.position(),
        }
    }
}

impl From<Box<rhai::EvalAltResult>> for ScriptError {
    fn from(err: Box<rhai::EvalAltResult>) -> Self {
        let line = err.position().line();
        Self::RuntimeError {
            message: err.to_string(),
            line,
        }
    }
}
