//! The scalar codec table: one codec per primitive wire type.

use protopack_buffers::{varint, Reader, Writer};

use crate::error::{DecodeError, EncodeError};
use crate::value::ProtoValue;
use crate::wire::WireType;

const INT32_BIAS: i64 = 1 << 32;

/// The fixed catalogue of primitive field types.
///
/// `int32` re-biases negative values by adding 2^32 before varint encoding
/// (a five-byte form) and un-biases on decode; `int64` relies on the 64-bit
/// two's-complement varint (ten bytes for negatives); the `sint*` pair uses
/// zigzag; the `fixed*` family is raw little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Bool,
    Int32,
    Int64,
    UInt32,
    UInt64,
    SInt32,
    SInt64,
    Fixed32,
    SFixed32,
    Fixed64,
    SFixed64,
    Float,
    Double,
    Bytes,
    Str,
    Varint,
}

impl ScalarType {
    /// Looks a scalar up by its schema type name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => ScalarType::Bool,
            "int32" => ScalarType::Int32,
            "int64" => ScalarType::Int64,
            "uint32" => ScalarType::UInt32,
            "uint64" => ScalarType::UInt64,
            "sint32" => ScalarType::SInt32,
            "sint64" => ScalarType::SInt64,
            "fixed32" => ScalarType::Fixed32,
            "sfixed32" => ScalarType::SFixed32,
            "fixed64" => ScalarType::Fixed64,
            "sfixed64" => ScalarType::SFixed64,
            "float" => ScalarType::Float,
            "double" => ScalarType::Double,
            "bytes" => ScalarType::Bytes,
            "string" => ScalarType::Str,
            "varint" => ScalarType::Varint,
            _ => return None,
        })
    }

    pub fn wire_type(self) -> WireType {
        match self {
            ScalarType::Bool
            | ScalarType::Int32
            | ScalarType::Int64
            | ScalarType::UInt32
            | ScalarType::UInt64
            | ScalarType::SInt32
            | ScalarType::SInt64
            | ScalarType::Varint => WireType::Varint,
            ScalarType::Fixed64 | ScalarType::SFixed64 | ScalarType::Double => WireType::Fixed64,
            ScalarType::Fixed32 | ScalarType::SFixed32 | ScalarType::Float => WireType::Fixed32,
            ScalarType::Bytes | ScalarType::Str => WireType::LengthDelimited,
        }
    }

    /// Whether elements of this type can ride in a packed run. Only
    /// length-delimited scalars cannot.
    pub fn is_packable(self) -> bool {
        !matches!(self, ScalarType::Bytes | ScalarType::Str)
    }

    /// Whether this type is usable as a map key.
    pub fn is_map_key(self) -> bool {
        !matches!(
            self,
            ScalarType::Float | ScalarType::Double | ScalarType::Bytes
        )
    }

    /// Byte length `encode` would produce for `value`.
    pub fn encoding_length(self, value: &ProtoValue) -> Result<usize, EncodeError> {
        Ok(match self {
            ScalarType::Bool => 1,
            ScalarType::Int32 => {
                let v = expect_i64(self, value)?;
                varint::encoding_length(if v < 0 { (v + INT32_BIAS) as u64 } else { v as u64 })
            }
            ScalarType::Int64 => varint::encoding_length(expect_i64(self, value)? as u64),
            ScalarType::UInt32 | ScalarType::UInt64 | ScalarType::Varint => {
                varint::encoding_length(expect_u64(self, value)?)
            }
            ScalarType::SInt32 | ScalarType::SInt64 => {
                varint::encoding_length(varint::zigzag_encode(expect_i64(self, value)?))
            }
            ScalarType::Fixed64 | ScalarType::SFixed64 | ScalarType::Double => 8,
            ScalarType::Fixed32 | ScalarType::SFixed32 | ScalarType::Float => 4,
            ScalarType::Bytes | ScalarType::Str => {
                let len = expect_bytes(self, value)?.len();
                varint::encoding_length(len as u64) + len
            }
        })
    }

    /// Writes the payload for `value` (no field key).
    pub fn encode(self, value: &ProtoValue, writer: &mut Writer) -> Result<(), EncodeError> {
        match self {
            ScalarType::Bool => {
                let b = value.as_bool().ok_or_else(|| unsupported(self, value))?;
                writer.u8(u8::from(b));
            }
            ScalarType::Int32 => {
                let v = expect_i64(self, value)?;
                varint::write(writer, if v < 0 { (v + INT32_BIAS) as u64 } else { v as u64 });
            }
            ScalarType::Int64 => {
                varint::write(writer, expect_i64(self, value)? as u64);
            }
            ScalarType::UInt32 | ScalarType::UInt64 | ScalarType::Varint => {
                varint::write(writer, expect_u64(self, value)?);
            }
            ScalarType::SInt32 | ScalarType::SInt64 => {
                varint::write(writer, varint::zigzag_encode(expect_i64(self, value)?));
            }
            ScalarType::Fixed32 => writer.u32_le(expect_u64(self, value)? as u32),
            ScalarType::SFixed32 => writer.u32_le(expect_i64(self, value)? as i32 as u32),
            ScalarType::Fixed64 => writer.u64_le(expect_u64(self, value)?),
            ScalarType::SFixed64 => writer.u64_le(expect_i64(self, value)? as u64),
            ScalarType::Float => writer.f32_le(expect_f64(self, value)? as f32),
            ScalarType::Double => writer.f64_le(expect_f64(self, value)?),
            ScalarType::Bytes | ScalarType::Str => {
                let bytes = expect_bytes(self, value)?;
                varint::write(writer, bytes.len() as u64);
                writer.buf(bytes);
            }
        }
        Ok(())
    }

    /// Reads one payload of this type from the cursor.
    pub fn decode(self, reader: &mut Reader<'_>) -> Result<ProtoValue, DecodeError> {
        Ok(match self {
            ScalarType::Bool => ProtoValue::Bool(reader.u8()? != 0),
            ScalarType::Int32 => {
                let raw = varint::read(reader)? as i64;
                ProtoValue::Int(if raw > i64::from(i32::MAX) { raw - INT32_BIAS } else { raw })
            }
            ScalarType::Int64 => ProtoValue::Int(varint::read(reader)? as i64),
            ScalarType::UInt32 | ScalarType::UInt64 | ScalarType::Varint => {
                ProtoValue::UInt(varint::read(reader)?)
            }
            ScalarType::SInt32 | ScalarType::SInt64 => {
                ProtoValue::Int(varint::zigzag_decode(varint::read(reader)?))
            }
            ScalarType::Fixed32 => ProtoValue::UInt(u64::from(reader.u32_le()?)),
            ScalarType::SFixed32 => ProtoValue::Int(i64::from(reader.u32_le()? as i32)),
            ScalarType::Fixed64 => ProtoValue::UInt(reader.u64_le()?),
            ScalarType::SFixed64 => ProtoValue::Int(reader.u64_le()? as i64),
            ScalarType::Float => ProtoValue::Float(f64::from(reader.f32_le()?)),
            ScalarType::Double => ProtoValue::Float(reader.f64_le()?),
            ScalarType::Bytes => {
                let len = varint::read(reader)? as usize;
                ProtoValue::Bytes(reader.buf(len)?.to_vec())
            }
            ScalarType::Str => {
                let len = varint::read(reader)? as usize;
                ProtoValue::Str(reader.utf8(len)?.to_owned())
            }
        })
    }

    /// The zero value materialized for absent optional fields with no
    /// declared default.
    pub fn default_value(self) -> ProtoValue {
        match self {
            ScalarType::Bool => ProtoValue::Bool(false),
            ScalarType::Int32
            | ScalarType::Int64
            | ScalarType::SInt32
            | ScalarType::SInt64
            | ScalarType::SFixed32
            | ScalarType::SFixed64 => ProtoValue::Int(0),
            ScalarType::UInt32
            | ScalarType::UInt64
            | ScalarType::Varint
            | ScalarType::Fixed32
            | ScalarType::Fixed64 => ProtoValue::UInt(0),
            ScalarType::Float | ScalarType::Double => ProtoValue::Float(0.0),
            ScalarType::Bytes => ProtoValue::Bytes(Vec::new()),
            ScalarType::Str => ProtoValue::Str(String::new()),
        }
    }

    /// Parses a textual `default` option into a typed value. `None` means
    /// the text does not fit this type.
    pub fn parse_default(self, text: &str) -> Option<ProtoValue> {
        match self {
            ScalarType::Str => Some(ProtoValue::Str(text.to_owned())),
            ScalarType::Bool => Some(ProtoValue::Bool(text == "true")),
            ScalarType::Float | ScalarType::Double => {
                text.parse::<f64>().ok().map(ProtoValue::Float)
            }
            ScalarType::Int32
            | ScalarType::Int64
            | ScalarType::SInt32
            | ScalarType::SInt64
            | ScalarType::SFixed32
            | ScalarType::SFixed64 => text.parse::<i64>().ok().map(ProtoValue::Int),
            ScalarType::UInt32
            | ScalarType::UInt64
            | ScalarType::Varint
            | ScalarType::Fixed32
            | ScalarType::Fixed64 => text.parse::<u64>().ok().map(ProtoValue::UInt),
            ScalarType::Bytes => None,
        }
    }
}

fn unsupported(scalar: ScalarType, value: &ProtoValue) -> EncodeError {
    let expected = match scalar {
        ScalarType::Bool => "bool",
        ScalarType::Float | ScalarType::Double => "float",
        ScalarType::Bytes => "bytes",
        ScalarType::Str => "string",
        ScalarType::UInt32 | ScalarType::UInt64 | ScalarType::Varint | ScalarType::Fixed32
        | ScalarType::Fixed64 => "uint",
        _ => "int",
    };
    EncodeError::UnsupportedValue {
        expected,
        actual: value.kind_name(),
    }
}

fn expect_i64(scalar: ScalarType, value: &ProtoValue) -> Result<i64, EncodeError> {
    value.as_i64().ok_or_else(|| unsupported(scalar, value))
}

fn expect_u64(scalar: ScalarType, value: &ProtoValue) -> Result<u64, EncodeError> {
    value.as_u64().ok_or_else(|| unsupported(scalar, value))
}

fn expect_f64(scalar: ScalarType, value: &ProtoValue) -> Result<f64, EncodeError> {
    value.as_f64().ok_or_else(|| unsupported(scalar, value))
}

fn expect_bytes<'v>(scalar: ScalarType, value: &'v ProtoValue) -> Result<&'v [u8], EncodeError> {
    value.as_bytes().ok_or_else(|| unsupported(scalar, value))
}

/// A caller-supplied codec for a named type, consulted before the scalar
/// table during resolution.
pub trait CustomCodec: Send + Sync {
    fn wire_type(&self) -> WireType;
    fn encoding_length(&self, value: &ProtoValue) -> Result<usize, EncodeError>;
    fn encode(&self, value: &ProtoValue, writer: &mut Writer) -> Result<(), EncodeError>;
    fn decode(&self, reader: &mut Reader<'_>) -> Result<ProtoValue, DecodeError>;
}

/// Table of caller-supplied codecs keyed by type name.
#[derive(Default)]
pub struct ExtraCodecs {
    pub(crate) codecs: Vec<(String, Box<dyn CustomCodec>)>,
}

impl ExtraCodecs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `codec` under `name`; later registrations shadow earlier
    /// ones during resolution.
    pub fn register(&mut self, name: impl Into<String>, codec: Box<dyn CustomCodec>) {
        self.codecs.push((name.into(), codec));
    }
}
