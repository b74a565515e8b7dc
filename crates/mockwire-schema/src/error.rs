//! Codec error types

/// Failure converting between structured values and protobuf messages
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// Field kind the codec does not handle (legacy groups)
    #[error("unsupported field kind 'group' for field '{field}'")]
    UnsupportedKind {
        /// Fully-qualified field name
        field: String,
    },

    /// Source map has a key with no matching field
    #[error("field '{field}' not found in message '{message}'")]
    UnknownField {
        /// Fully-qualified message name
        message: String,
        /// Offending key
        field: String,
    },

    /// Value variant doesn't fit the field kind
    #[error("field '{field}': expected {expected}, got {found}")]
    TypeMismatch {
        /// Fully-qualified field name
        field: String,
        /// Expected value form
        expected: &'static str,
        /// Actual value variant
        found: &'static str,
    },

    /// Numeric value outside the field's range
    #[error("field '{field}': value {value} out of range for {kind}")]
    OutOfRange {
        /// Fully-qualified field name
        field: String,
        /// Protobuf kind
        kind: &'static str,
        /// Rendered value
        value: String,
    },

    /// Map key can't be parsed as the map's key kind
    #[error("field '{field}': invalid map key '{key}' for {kind} keys")]
    InvalidMapKey {
        /// Fully-qualified field name
        field: String,
        /// Offending key
        key: String,
        /// Protobuf key kind
        kind: &'static str,
    },

    /// Enum value name not declared by the enum
    #[error("field '{field}': unknown enum value '{name}'")]
    UnknownEnumValue {
        /// Fully-qualified field name
        field: String,
        /// Offending name
        name: String,
    },

    /// Protobuf wire data could not be decoded
    #[error("invalid protobuf payload: {0}")]
    Wire(String),
}

impl CodecError {
    /// Whether the error comes from a group field
    pub fn is_unsupported_kind(&self) -> bool {
        matches!(self, CodecError::UnsupportedKind { .. })
    }
}
