//! Error taxonomy: schema compilation, encoding, decoding.

use protopack_buffers::BufferError;
use thiserror::Error;

/// Errors raised while compiling a schema. Fatal to the compile pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("cannot resolve type `{type_name}` from scope `{scope}`")]
    UnresolvedType { type_name: String, scope: String },
    #[error("duplicate type definition `{0}`")]
    DuplicateType(String),
    #[error("duplicate tag {tag} in message `{message}`")]
    DuplicateTag { message: String, tag: u32 },
    #[error("type `{0}` is not usable as a map key")]
    InvalidMapKey(String),
    #[error("invalid default `{value}` for field `{field}`")]
    InvalidDefault { field: String, value: String },
    #[error("invalid value `{name}` in enum `{enum_id}`")]
    InvalidEnumValue { enum_id: String, name: String },
}

/// Errors raised by an encode call. The output buffer is not valid once one
/// of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("missing required field `{0}`")]
    MissingRequiredField(String),
    #[error("more than one field set in oneof group `{0}`")]
    OneofViolation(String),
    #[error("expected a {expected} value, got {actual}")]
    UnsupportedValue {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors raised by a decode call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of buffer")]
    Truncated,
    #[error("varint does not fit in 64 bits")]
    VarintOverflow,
    #[error("range {offset}..{end} out of bounds for a buffer of {len} bytes")]
    Range {
        offset: usize,
        end: usize,
        len: usize,
    },
    #[error("missing required field `{0}`")]
    MissingRequiredField(String),
    #[error("unknown value {value} for enum `{enum_id}`")]
    InvalidEnumValue { enum_id: String, value: i64 },
    #[error("unsupported wire type {0}")]
    UnsupportedWireType(u8),
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
}

impl From<BufferError> for DecodeError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::EndOfBuffer => DecodeError::Truncated,
            BufferError::InvalidUtf8 => DecodeError::InvalidUtf8,
            BufferError::Overflow => DecodeError::VarintOverflow,
        }
    }
}
