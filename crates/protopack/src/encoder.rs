//! Wire-byte emission for compiled messages.
//!
//! Encoding runs in two passes over the declared fields: a validation pass
//! (required presence, oneof exclusivity) that must succeed before any byte
//! is written, then a write pass in declaration order.

use protopack_buffers::{varint, Writer};

use crate::error::EncodeError;
use crate::length::{
    expect_enum, expect_map, map_entry_length, message_length, packed_element_length,
};
use crate::registry::{CompiledSchema, FieldDescriptor, FieldKind, Label, MessageRef};
use crate::scalars::ScalarType;
use crate::value::ProtoValue;
use crate::wire::{write_key, WireType};

/// Encodes `value` as message `msg` into `writer`, returning the number of
/// bytes written.
pub(crate) fn encode_message(
    schema: &CompiledSchema,
    msg: MessageRef,
    value: &ProtoValue,
    writer: &mut Writer,
) -> Result<usize, EncodeError> {
    if !matches!(value, ProtoValue::Message(_)) {
        return Err(EncodeError::UnsupportedValue {
            expected: "message",
            actual: value.kind_name(),
        });
    }
    let descriptor = schema.message_desc(msg);

    let mut seen_groups: Vec<&str> = Vec::new();
    for field in &descriptor.fields {
        if value.get(&field.name).is_none() {
            if field.label == Label::Required {
                return Err(EncodeError::MissingRequiredField(field.name.clone()));
            }
            continue;
        }
        if let Some(group) = field.oneof.as_deref() {
            if seen_groups.contains(&group) {
                return Err(EncodeError::OneofViolation(group.to_owned()));
            }
            seen_groups.push(group);
        }
    }

    let start = writer.len();
    for field in &descriptor.fields {
        if let Some(present) = value.get(&field.name) {
            encode_field(schema, field, present, writer)?;
        }
    }
    Ok(writer.len() - start)
}

fn encode_field(
    schema: &CompiledSchema,
    field: &FieldDescriptor,
    value: &ProtoValue,
    writer: &mut Writer,
) -> Result<(), EncodeError> {
    if let FieldKind::Map { key, value: value_kind } = &field.kind {
        for (entry_key, entry_value) in expect_map(value)? {
            write_key(writer, field.tag, WireType::LengthDelimited);
            let entry = map_entry_length(schema, *key, value_kind, entry_key, entry_value)?;
            varint::write(writer, entry as u64);
            encode_map_entry(schema, *key, value_kind, entry_key, entry_value, writer)?;
        }
        return Ok(());
    }
    if field.label == Label::Repeated {
        let items = value.as_list().ok_or(EncodeError::UnsupportedValue {
            expected: "list",
            actual: value.kind_name(),
        })?;
        if field.packed {
            if items.is_empty() {
                return Ok(());
            }
            let mut payload = 0;
            for item in items {
                payload += packed_element_length(schema, &field.kind, item)?;
            }
            write_key(writer, field.tag, WireType::LengthDelimited);
            varint::write(writer, payload as u64);
            for item in items {
                encode_packed_element(schema, &field.kind, item, writer)?;
            }
            return Ok(());
        }
        for item in items {
            write_key(writer, field.tag, schema.field_wire_type(&field.kind));
            encode_element(schema, &field.kind, item, writer)?;
        }
        return Ok(());
    }
    write_key(writer, field.tag, schema.field_wire_type(&field.kind));
    encode_element(schema, &field.kind, value, writer)
}

/// Writes one element's payload (everything after the key). Message
/// elements get their varint length prefix here.
fn encode_element(
    schema: &CompiledSchema,
    kind: &FieldKind,
    value: &ProtoValue,
    writer: &mut Writer,
) -> Result<(), EncodeError> {
    match kind {
        FieldKind::Scalar(scalar) => scalar.encode(value, writer),
        FieldKind::Enum(_) => {
            varint::write(writer, expect_enum(value)?);
            Ok(())
        }
        FieldKind::Message(r) => {
            let inner = message_length(schema, *r, value)?;
            varint::write(writer, inner as u64);
            encode_message(schema, *r, value, writer)?;
            Ok(())
        }
        FieldKind::Custom(i) => schema.custom(*i).encode(value, writer),
        FieldKind::Map { .. } => unreachable!("map entries are written at field level"),
    }
}

fn encode_packed_element(
    schema: &CompiledSchema,
    kind: &FieldKind,
    value: &ProtoValue,
    writer: &mut Writer,
) -> Result<(), EncodeError> {
    match kind {
        FieldKind::Enum(_) => {
            varint::write(writer, expect_enum(value)?);
            Ok(())
        }
        _ => encode_element(schema, kind, value, writer),
    }
}

fn encode_map_entry(
    schema: &CompiledSchema,
    key: ScalarType,
    value_kind: &FieldKind,
    entry_key: &ProtoValue,
    entry_value: &ProtoValue,
    writer: &mut Writer,
) -> Result<(), EncodeError> {
    write_key(writer, 1, key.wire_type());
    key.encode(entry_key, writer)?;
    write_key(writer, 2, schema.field_wire_type(value_kind));
    encode_element(schema, value_kind, entry_value, writer)
}
