//! Schema-compiled Protocol Buffers wire codecs.
//!
//! A parsed schema (messages, enums, field tags, oneofs, maps, repeated and
//! packed fields) compiles into a [`CompiledSchema`]: an immutable registry
//! of message and enum descriptors. Per-type [`MessageType`] handles expose
//! `encode`, `decode`, and `encoding_length` over the dynamic
//! [`ProtoValue`] model, bit-exact with the standard binary tag-prefixed
//! wire format (wire types 0, 1, 2, and 5).
//!
//! # Example
//!
//! ```
//! use protopack::schema::{FieldAst, MessageAst, Schema};
//! use protopack::{compile, ProtoValue};
//!
//! let schema = Schema::new().message(
//!     MessageAst::new("Point")
//!         .field(FieldAst::new("x", "int32", 1).required())
//!         .field(FieldAst::new("y", "int32", 2).required()),
//! );
//! let compiled = compile(&schema).unwrap();
//! let point = compiled.message("Point").unwrap();
//!
//! let value = ProtoValue::message(vec![("x", 1.into()), ("y", 2.into())]);
//! let bytes = point.encode(&value).unwrap();
//! assert_eq!(bytes, [0x08, 0x01, 0x10, 0x02]);
//! assert_eq!(point.decode(&bytes).unwrap(), value);
//! ```

mod decoder;
mod encoder;
mod error;
mod facade;
mod length;
mod registry;
mod scalars;
mod value;
mod wire;

pub mod schema;

pub use error::{DecodeError, EncodeError, SchemaError};
pub use facade::{EnumType, MessageType};
pub use registry::{
    CompiledSchema, EnumDescriptor, EnumRef, FieldDescriptor, FieldKind, Label,
    MessageDescriptor, MessageRef,
};
pub use scalars::{CustomCodec, ExtraCodecs, ScalarType};
pub use value::ProtoValue;
pub use wire::WireType;

use schema::Schema;

/// Compiles a parsed schema into its codec registry.
pub fn compile(schema: &Schema) -> Result<CompiledSchema, SchemaError> {
    CompiledSchema::compile(schema)
}

/// Compiles a parsed schema with a caller-supplied codec table.
pub fn compile_with(schema: &Schema, extra: ExtraCodecs) -> Result<CompiledSchema, SchemaError> {
    CompiledSchema::compile_with(schema, extra)
}

#[cfg(test)]
mod tests {
    use super::schema::{EnumAst, FieldAst, MessageAst, Schema};
    use super::*;
    use protopack_buffers::{varint, Reader, Writer};

    fn point_schema() -> Schema {
        Schema::new().message(
            MessageAst::new("Point")
                .field(FieldAst::new("x", "int32", 1).required())
                .field(FieldAst::new("y", "int32", 2).required()),
        )
    }

    #[test]
    fn point_canonical_bytes() {
        let compiled = compile(&point_schema()).unwrap();
        let point = compiled.message("Point").unwrap();
        let value = ProtoValue::message(vec![("x", 1.into()), ("y", 2.into())]);
        let bytes = point.encode(&value).unwrap();
        assert_eq!(bytes, [0x08, 0x01, 0x10, 0x02]);
        assert_eq!(point.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn length_agrees_with_bytes_written() {
        let compiled = compile(&point_schema()).unwrap();
        let point = compiled.message("Point").unwrap();
        let value = ProtoValue::message(vec![("x", (-3).into()), ("y", 1000.into())]);
        let mut writer = Writer::new();
        let written = point.encode_into(&value, &mut writer).unwrap();
        assert_eq!(written, point.encoding_length(&value).unwrap());
        assert_eq!(written, writer.len());
        assert_eq!(point.encode(&value).unwrap().len(), written);
    }

    #[test]
    fn absent_optionals_fill_defaults() {
        let schema = Schema::new().message(
            MessageAst::new("Settings")
                .field(FieldAst::new("name", "string", 1))
                .field(FieldAst::new("retries", "int32", 2).default_option("3"))
                .field(FieldAst::new("verbose", "bool", 3))
                .field(FieldAst::new("tags", "string", 4).repeated()),
        );
        let compiled = compile(&schema).unwrap();
        let settings = compiled.message("Settings").unwrap();
        let decoded = settings.decode(&[]).unwrap();
        assert_eq!(
            decoded,
            ProtoValue::message(vec![
                ("name", ProtoValue::Str(String::new())),
                ("retries", ProtoValue::Int(3)),
                ("verbose", ProtoValue::Bool(false)),
                ("tags", ProtoValue::List(Vec::new())),
            ])
        );
    }

    #[test]
    fn recursive_message_roundtrip() {
        let schema = Schema::new().message(
            MessageAst::new("Node")
                .field(FieldAst::new("value", "int32", 1).required())
                .field(FieldAst::new("next", "Node", 2)),
        );
        let compiled = compile(&schema).unwrap();
        let node = compiled.message("Node").unwrap();
        let value = ProtoValue::message(vec![
            ("value", 1.into()),
            (
                "next",
                ProtoValue::message(vec![
                    ("value", 2.into()),
                    ("next", ProtoValue::message(vec![("value", 3.into())])),
                ]),
            ),
        ]);
        let bytes = node.encode(&value).unwrap();
        assert_eq!(bytes.len(), node.encoding_length(&value).unwrap());
        assert_eq!(node.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn enum_facade_exports_constants() {
        let schema = Schema::new()
            .message(
                MessageAst::new("Doc")
                    .field(FieldAst::new("corpus", "Corpus", 1))
                    .enumeration(EnumAst::new("Corpus").value("UNIVERSAL", 0).value("WEB", 2)),
            )
            .enumeration(EnumAst::new("Level").value("LOW", 0).value("HIGH", 1));
        let compiled = compile(&schema).unwrap();
        let level = compiled.enum_type("Level").unwrap();
        assert_eq!(level.value("HIGH"), Some(1));
        assert_eq!(level.name_of(0), Some("LOW"));
        let corpus = compiled.message("Doc").unwrap().enum_type("Corpus").unwrap();
        assert_eq!(corpus.id(), "Doc.Corpus");
        assert_eq!(
            corpus.values(),
            [("UNIVERSAL".to_owned(), 0), ("WEB".to_owned(), 2)]
        );
    }

    struct ReversedBytes;

    impl CustomCodec for ReversedBytes {
        fn wire_type(&self) -> WireType {
            WireType::LengthDelimited
        }

        fn encoding_length(&self, value: &ProtoValue) -> Result<usize, EncodeError> {
            let len = value.as_bytes().map_or(0, <[u8]>::len);
            Ok(varint::encoding_length(len as u64) + len)
        }

        fn encode(&self, value: &ProtoValue, writer: &mut Writer) -> Result<(), EncodeError> {
            let bytes = value.as_bytes().ok_or(EncodeError::UnsupportedValue {
                expected: "bytes",
                actual: value.kind_name(),
            })?;
            varint::write(writer, bytes.len() as u64);
            let reversed: Vec<u8> = bytes.iter().rev().copied().collect();
            writer.buf(&reversed);
            Ok(())
        }

        fn decode(&self, reader: &mut Reader<'_>) -> Result<ProtoValue, DecodeError> {
            let len = varint::read(reader)? as usize;
            let mut bytes = reader.buf(len)?.to_vec();
            bytes.reverse();
            Ok(ProtoValue::Bytes(bytes))
        }
    }

    #[test]
    fn extra_codecs_take_precedence() {
        // The extra table shadows even a scalar name.
        let schema = Schema::new().message(
            MessageAst::new("Blob").field(FieldAst::new("data", "bytes", 1).required()),
        );
        let mut extra = ExtraCodecs::new();
        extra.register("bytes", Box::new(ReversedBytes));
        let compiled = compile_with(&schema, extra).unwrap();
        let blob = compiled.message("Blob").unwrap();
        let value = ProtoValue::message(vec![("data", ProtoValue::Bytes(vec![1, 2, 3]))]);
        let bytes = blob.encode(&value).unwrap();
        assert_eq!(bytes, [0x0a, 3, 3, 2, 1]);
        assert_eq!(blob.decode(&bytes).unwrap(), value);
    }
}
