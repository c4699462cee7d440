//! Encoding-length computation: total serialized size without writing bytes.
//!
//! Kept structurally in lockstep with the encoder so that
//! `encoding_length(v)` always equals the byte count `encode(v)` produces.
//! Presence validation is the encoder's job; this pass only measures what
//! exists on the value.

use protopack_buffers::varint;

use crate::error::EncodeError;
use crate::registry::{CompiledSchema, FieldDescriptor, FieldKind, Label, MessageRef};
use crate::value::ProtoValue;
use crate::wire::{key_length, WireType};

/// Total serialized size of `value` as message `msg`.
pub(crate) fn message_length(
    schema: &CompiledSchema,
    msg: MessageRef,
    value: &ProtoValue,
) -> Result<usize, EncodeError> {
    if !matches!(value, ProtoValue::Message(_)) {
        return Err(EncodeError::UnsupportedValue {
            expected: "message",
            actual: value.kind_name(),
        });
    }
    let descriptor = schema.message_desc(msg);
    let mut total = 0;
    for field in &descriptor.fields {
        if let Some(present) = value.get(&field.name) {
            total += field_length(schema, field, present)?;
        }
    }
    Ok(total)
}

fn field_length(
    schema: &CompiledSchema,
    field: &FieldDescriptor,
    value: &ProtoValue,
) -> Result<usize, EncodeError> {
    if let FieldKind::Map { key, value: value_kind } = &field.kind {
        let entries = expect_map(value)?;
        let mut total = 0;
        for (entry_key, entry_value) in entries {
            let entry = map_entry_length(schema, *key, value_kind, entry_key, entry_value)?;
            total += key_length(field.tag, WireType::LengthDelimited)
                + varint::encoding_length(entry as u64)
                + entry;
        }
        return Ok(total);
    }
    if field.label == Label::Repeated {
        let items = value.as_list().ok_or(EncodeError::UnsupportedValue {
            expected: "list",
            actual: value.kind_name(),
        })?;
        if field.packed {
            if items.is_empty() {
                return Ok(0);
            }
            let mut payload = 0;
            for item in items {
                payload += packed_element_length(schema, &field.kind, item)?;
            }
            return Ok(key_length(field.tag, WireType::LengthDelimited)
                + varint::encoding_length(payload as u64)
                + payload);
        }
        let mut total = 0;
        for item in items {
            total += key_length(field.tag, schema.field_wire_type(&field.kind))
                + element_length(schema, &field.kind, item)?;
        }
        return Ok(total);
    }
    Ok(key_length(field.tag, schema.field_wire_type(&field.kind))
        + element_length(schema, &field.kind, value)?)
}

/// Length of one element's payload as written after its key. Message
/// elements include their varint length prefix.
pub(crate) fn element_length(
    schema: &CompiledSchema,
    kind: &FieldKind,
    value: &ProtoValue,
) -> Result<usize, EncodeError> {
    match kind {
        FieldKind::Scalar(scalar) => scalar.encoding_length(value),
        FieldKind::Enum(_) => Ok(varint::encoding_length(expect_enum(value)?)),
        FieldKind::Message(r) => {
            let inner = message_length(schema, *r, value)?;
            Ok(varint::encoding_length(inner as u64) + inner)
        }
        FieldKind::Custom(i) => schema.custom(*i).encoding_length(value),
        FieldKind::Map { .. } => unreachable!("map entries are measured at field level"),
    }
}

pub(crate) fn packed_element_length(
    schema: &CompiledSchema,
    kind: &FieldKind,
    value: &ProtoValue,
) -> Result<usize, EncodeError> {
    match kind {
        FieldKind::Enum(_) => Ok(varint::encoding_length(expect_enum(value)?)),
        _ => element_length(schema, kind, value),
    }
}

/// Length of one map entry's record body: key field at tag 1, value field
/// at tag 2.
pub(crate) fn map_entry_length(
    schema: &CompiledSchema,
    key: crate::scalars::ScalarType,
    value_kind: &FieldKind,
    entry_key: &ProtoValue,
    entry_value: &ProtoValue,
) -> Result<usize, EncodeError> {
    Ok(key_length(1, key.wire_type())
        + key.encoding_length(entry_key)?
        + key_length(2, schema.field_wire_type(value_kind))
        + element_length(schema, value_kind, entry_value)?)
}

pub(crate) fn expect_map(value: &ProtoValue) -> Result<&[(ProtoValue, ProtoValue)], EncodeError> {
    match value {
        ProtoValue::Map(entries) => Ok(entries),
        other => Err(EncodeError::UnsupportedValue {
            expected: "map",
            actual: other.kind_name(),
        }),
    }
}

pub(crate) fn expect_enum(value: &ProtoValue) -> Result<u64, EncodeError> {
    value.as_u64().ok_or(EncodeError::UnsupportedValue {
        expected: "enum",
        actual: value.kind_name(),
    })
}
