//! Codec error types.
//!
//! Every failure is reported once, at the point of detection, together with
//! the context of the field being processed (see [`ErrorContext`]).

use std::fmt;
use thiserror::Error;

/// The kind of failure raised by the encoder or decoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("invalid decode target: {reason}")]
    InvalidTarget { reason: String },

    #[error("unsupported type: {type_name}")]
    UnsupportedType { type_name: &'static str },

    #[error("invalid value {value:02x?}")]
    InvalidValue { value: Vec<u8> },

    #[error("index out of range reading {needed} bytes at offset {offset}")]
    IndexOutOfRange { needed: usize, offset: usize },

    #[error("tag definition `{tag}` required")]
    TagDefinitionRequired { tag: String },

    #[error("invalid tag value: expected {expected}, got {value:?}")]
    InvalidTagValue { expected: &'static str, value: String },

    #[error("invalid saved value `{name}`: expected {expected}, got {value}")]
    InvalidSavedValue {
        name: String,
        expected: &'static str,
        value: String,
    },

    #[error("attempting to access unsaved declaration `{name}`")]
    UndefinedSavedValue { name: String },

    #[error("nil reference")]
    NilReference,

    #[error("sequence too long: {len} elements (max {max})")]
    SequenceTooLong { len: usize, max: usize },

    #[error("nesting depth limit of {max} exceeded")]
    DepthLimitExceeded { max: usize },
}

impl ErrorKind {
    /// Returns a stable code identifying this kind of failure.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidTarget { .. } => "INVALID_TARGET",
            ErrorKind::UnsupportedType { .. } => "UNSUPPORTED_TYPE",
            ErrorKind::InvalidValue { .. } => "INVALID_VALUE",
            ErrorKind::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            ErrorKind::TagDefinitionRequired { .. } => "TAG_DEFINITION_REQUIRED",
            ErrorKind::InvalidTagValue { .. } => "INVALID_TAG_VALUE",
            ErrorKind::InvalidSavedValue { .. } => "INVALID_SAVED_VALUE",
            ErrorKind::UndefinedSavedValue { .. } => "UNDEFINED_SAVED_VALUE",
            ErrorKind::NilReference => "NIL_REFERENCE",
            ErrorKind::SequenceTooLong { .. } => "SEQUENCE_TOO_LONG",
            ErrorKind::DepthLimitExceeded { .. } => "DEPTH_LIMIT_EXCEEDED",
        }
    }
}

/// Where in the traversal a failure happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Innermost enclosing message type.
    pub type_name: Option<&'static str>,
    /// Field of `type_name` being processed.
    pub field: Option<&'static str>,
    /// Full `Type.field` chain from the outermost message inwards.
    pub chain: Vec<String>,
    /// Byte offset into the output (encode) or input (decode) buffer.
    pub offset: usize,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.chain.is_empty() {
            write!(f, "at offset {}", self.offset)
        } else {
            write!(f, "in {} at offset {}", self.chain.join(" > "), self.offset)
        }
    }
}

/// An encode or decode failure enriched with its traversal context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bnet: {kind} ({context})")]
pub struct EncodingError {
    #[source]
    pub kind: ErrorKind,
    pub context: ErrorContext,
}

impl EncodingError {
    pub fn new(kind: ErrorKind, context: ErrorContext) -> Self {
        Self { kind, context }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    /// Returns the stable code of the underlying [`ErrorKind`].
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl From<ErrorKind> for EncodingError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, ErrorContext::default())
    }
}

/// Result type used throughout the codec.
pub type Result<T> = std::result::Result<T, EncodingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorKind::NilReference.code(), "NIL_REFERENCE");
        assert_eq!(
            ErrorKind::UndefinedSavedValue { name: "C".into() }.code(),
            "UNDEFINED_SAVED_VALUE"
        );
        assert_eq!(
            ErrorKind::IndexOutOfRange {
                needed: 4,
                offset: 0
            }
            .code(),
            "INDEX_OUT_OF_RANGE"
        );
        assert_eq!(
            ErrorKind::TagDefinitionRequired { tag: "size".into() }.code(),
            "TAG_DEFINITION_REQUIRED"
        );
    }

    #[test]
    fn test_kind_display() {
        let err = ErrorKind::InvalidValue { value: vec![0x02] };
        assert_eq!(err.to_string(), "invalid value [02]");

        let err = ErrorKind::IndexOutOfRange {
            needed: 4,
            offset: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains('4'));
        assert!(msg.contains("10"));

        let err = ErrorKind::InvalidTagValue {
            expected: "uint8 or uint32",
            value: "uint16".into(),
        };
        assert!(err.to_string().contains("uint16"));

        let err = ErrorKind::SequenceTooLong { len: 100, max: 50 };
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_error_display_with_context() {
        let err = EncodingError::new(
            ErrorKind::UndefinedSavedValue { name: "C".into() },
            ErrorContext {
                type_name: Some("CharList"),
                field: Some("characters"),
                chain: vec!["CharList.characters".into()],
                offset: 8,
            },
        );
        let msg = err.to_string();
        assert!(msg.starts_with("bnet: "));
        assert!(msg.contains("CharList.characters"));
        assert!(msg.contains("offset 8"));
    }

    #[test]
    fn test_error_display_without_context() {
        let err = EncodingError::from(ErrorKind::NilReference);
        assert_eq!(err.to_string(), "bnet: nil reference (at offset 0)");
        assert_eq!(err.code(), "NIL_REFERENCE");
        assert!(err.context().type_name.is_none());
    }

    #[test]
    fn test_error_source_is_kind() {
        use std::error::Error as _;

        let err = EncodingError::from(ErrorKind::SequenceTooLong { len: 3, max: 2 });
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), err.kind().to_string());
        assert!(err.to_string().contains(&source.to_string()));
    }
}
