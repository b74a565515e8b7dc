//! Error types for mockwire

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for mockwire
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Schema compilation failed (fatal at startup)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Mock directory could not be traversed (fatal at startup)
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Configuration error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inbound request could not be normalized
    #[error("Request decode error: {0}")]
    RequestDecode(String),

    /// Script evaluation failed
    #[error("Script error in '{mock}': {message}")]
    Script {
        /// Mock (route or method) the script is bound to
        mock: String,
        /// Error message
        message: String,
        /// The script ran past its deadline
        timed_out: bool,
    },

    /// Script result could not be encoded into the wire format
    #[error("Response encode error: {0}")]
    ResponseEncode(String),

    /// No HTTP route matches the request
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    /// Runtime error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] http::Error),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a script error
    pub fn script(mock: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Script {
            mock: mock.into(),
            message: message.into(),
            timed_out: false,
        }
    }

    /// Create a script timeout error
    pub fn script_timeout(mock: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Script {
            mock: mock.into(),
            message: message.into(),
            timed_out: true,
        }
    }

    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::RequestDecode(_) => StatusCode::BAD_REQUEST,
            Error::RouteNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert error to a gRPC status code
    pub fn to_grpc_code(&self) -> i32 {
        match self {
            Error::RequestDecode(_) => grpc_codes::INVALID_ARGUMENT,
            Error::RouteNotFound(_) => grpc_codes::UNIMPLEMENTED,
            Error::Script {
                timed_out: true, ..
            } => grpc_codes::DEADLINE_EXCEEDED,
            _ => grpc_codes::INTERNAL,
        }
    }

    /// Whether the failure was caused by the caller rather than the mock
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::RequestDecode(_) | Error::RouteNotFound(_))
    }
}

/// gRPC status codes
pub mod grpc_codes {
    /// OK (0)
    pub const OK: i32 = 0;
    /// CANCELLED (1)
    pub const CANCELLED: i32 = 1;
    /// UNKNOWN (2)
    pub const UNKNOWN: i32 = 2;
    /// `INVALID_ARGUMENT` (3)
    pub const INVALID_ARGUMENT: i32 = 3;
    /// `DEADLINE_EXCEEDED` (4)
    pub const DEADLINE_EXCEEDED: i32 = 4;
    /// `NOT_FOUND` (5)
    pub const NOT_FOUND: i32 = 5;
    /// `ALREADY_EXISTS` (6)
    pub const ALREADY_EXISTS: i32 = 6;
    /// `PERMISSION_DENIED` (7)
    pub const PERMISSION_DENIED: i32 = 7;
    /// `RESOURCE_EXHAUSTED` (8)
    pub const RESOURCE_EXHAUSTED: i32 = 8;
    /// `FAILED_PRECONDITION` (9)
    pub const FAILED_PRECONDITION: i32 = 9;
    /// ABORTED (10)
    pub const ABORTED: i32 = 10;
    /// `OUT_OF_RANGE` (11)
    pub const OUT_OF_RANGE: i32 = 11;
    /// UNIMPLEMENTED (12)
    pub const UNIMPLEMENTED: i32 = 12;
    /// INTERNAL (13)
    pub const INTERNAL: i32 = 13;
    /// UNAVAILABLE (14)
    pub const UNAVAILABLE: i32 = 14;
    /// `DATA_LOSS` (15)
    pub const DATA_LOSS: i32 = 15;
    /// UNAUTHENTICATED (16)
    pub const UNAUTHENTICATED: i32 = 16;
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            Error::RouteNotFound("/test".to_string()).to_status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::RequestDecode("bad json".to_string()).to_status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::script("GET /users", "boom").to_status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::ResponseEncode("unknown field".to_string()).to_status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_grpc_codes() {
        assert_eq!(
            Error::RequestDecode("truncated".to_string()).to_grpc_code(),
            grpc_codes::INVALID_ARGUMENT
        );
        assert_eq!(
            Error::script_timeout("pkg.Svc/Method", "deadline").to_grpc_code(),
            grpc_codes::DEADLINE_EXCEEDED
        );
        assert_eq!(
            Error::script("pkg.Svc/Method", "boom").to_grpc_code(),
            grpc_codes::INTERNAL
        );
    }

    #[test]
    fn test_script_error_display() {
        let err = Error::script("POST /users", "undefined variable");
        assert!(err.to_string().contains("POST /users"));
        assert!(err.to_string().contains("undefined variable"));
        assert!(!err.is_client_error());
    }
}
