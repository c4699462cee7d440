//! Wire-byte parsing for compiled messages.
//!
//! The main loop reads field keys until the bounded range is exhausted.
//! Unknown tags are skipped by wire type (the forward-compatibility path);
//! known fields dispatch on their compiled kind. A field whose arrived wire
//! type does not match its declared one is skipped the same way an unknown
//! tag is, except that packable repeated fields arriving length-delimited
//! decode as packed runs. Accumulated values are emitted in declaration
//! order, with required checks and default materialization at the end.

use protopack_buffers::{varint, Reader};

use crate::error::DecodeError;
use crate::registry::{
    CompiledSchema, FieldDescriptor, FieldKind, Label, MessageDescriptor, MessageRef,
};
use crate::scalars::ScalarType;
use crate::value::ProtoValue;
use crate::wire::{self, WireType};

/// Decodes the byte range `[offset, end)` of `bytes` as message `msg`.
pub(crate) fn decode_range(
    schema: &CompiledSchema,
    msg: MessageRef,
    bytes: &[u8],
    offset: usize,
    end: usize,
) -> Result<ProtoValue, DecodeError> {
    let len = bytes.len();
    if offset > len || end > len || offset > end {
        return Err(DecodeError::Range { offset, end, len });
    }
    let mut reader = Reader::from_range(bytes, offset, end);
    decode_message(schema, msg, &mut reader)
}

pub(crate) fn decode_message(
    schema: &CompiledSchema,
    msg: MessageRef,
    reader: &mut Reader<'_>,
) -> Result<ProtoValue, DecodeError> {
    let descriptor = schema.message_desc(msg);
    let mut slots: Vec<Option<ProtoValue>> = vec![None; descriptor.fields.len()];

    while reader.remaining() > 0 {
        let (tag, wire_type) = wire::read_key(reader)?;
        match descriptor.field_index(tag) {
            Some(index) => {
                decode_field(schema, descriptor, index, wire_type, reader, &mut slots)?;
            }
            None => wire::skip_field(reader, wire_type)?,
        }
    }

    let mut pairs = Vec::with_capacity(descriptor.fields.len());
    for (field, slot) in descriptor.fields.iter().zip(slots) {
        match slot {
            Some(value) => pairs.push((field.name.clone(), value)),
            None => {
                if field.label == Label::Required {
                    return Err(DecodeError::MissingRequiredField(field.name.clone()));
                }
                if let Some(value) = default_for(schema, field) {
                    pairs.push((field.name.clone(), value));
                }
            }
        }
    }
    Ok(ProtoValue::Message(pairs))
}

fn decode_field(
    schema: &CompiledSchema,
    descriptor: &MessageDescriptor,
    index: usize,
    wire_type: WireType,
    reader: &mut Reader<'_>,
    slots: &mut [Option<ProtoValue>],
) -> Result<(), DecodeError> {
    let field = &descriptor.fields[index];

    if let FieldKind::Map { key, value: value_kind } = &field.kind {
        if wire_type != WireType::LengthDelimited {
            return wire::skip_field(reader, wire_type);
        }
        let len = varint::read(reader)? as usize;
        let mut entry = reader.cut(len)?;
        let (entry_key, entry_value) = decode_map_entry(schema, *key, value_kind, &mut entry)?;
        let slot = slots[index].get_or_insert_with(|| ProtoValue::Map(Vec::new()));
        if let ProtoValue::Map(entries) = slot {
            // Wire order decides: a repeated key keeps its first position
            // but takes the last value.
            match entries.iter_mut().find(|(k, _)| *k == entry_key) {
                Some(existing) => existing.1 = entry_value,
                None => entries.push((entry_key, entry_value)),
            }
        }
        return Ok(());
    }

    let declared = schema.field_wire_type(&field.kind);
    if wire_type == WireType::LengthDelimited
        && declared != WireType::LengthDelimited
        && field.label == Label::Repeated
    {
        // Packed run: a varint-bounded span of back-to-back elements.
        let len = varint::read(reader)? as usize;
        let mut span = reader.cut(len)?;
        let slot = slots[index].get_or_insert_with(|| ProtoValue::List(Vec::new()));
        if let ProtoValue::List(items) = slot {
            while span.remaining() > 0 {
                items.push(decode_element(schema, &field.kind, &mut span)?);
            }
        }
        return Ok(());
    }
    if wire_type != declared {
        return wire::skip_field(reader, wire_type);
    }

    let value = decode_element(schema, &field.kind, reader)?;
    if field.label == Label::Repeated {
        let slot = slots[index].get_or_insert_with(|| ProtoValue::List(Vec::new()));
        if let ProtoValue::List(items) = slot {
            items.push(value);
        }
        return Ok(());
    }
    if let Some(group) = field.oneof.as_deref() {
        // Last one wins on the wire: clear any sibling already set.
        for (other_index, other) in descriptor.fields.iter().enumerate() {
            if other_index != index && other.oneof.as_deref() == Some(group) {
                slots[other_index] = None;
            }
        }
    }
    slots[index] = Some(value);
    Ok(())
}

fn decode_element(
    schema: &CompiledSchema,
    kind: &FieldKind,
    reader: &mut Reader<'_>,
) -> Result<ProtoValue, DecodeError> {
    match kind {
        FieldKind::Scalar(scalar) => scalar.decode(reader),
        FieldKind::Enum(e) => {
            let raw = varint::read(reader)? as i64;
            let descriptor = schema.enum_desc(*e);
            if !descriptor.contains(raw) {
                return Err(DecodeError::InvalidEnumValue {
                    enum_id: descriptor.id.clone(),
                    value: raw,
                });
            }
            Ok(ProtoValue::Int(raw))
        }
        FieldKind::Message(r) => {
            let len = varint::read(reader)? as usize;
            let mut inner = reader.cut(len)?;
            decode_message(schema, *r, &mut inner)
        }
        FieldKind::Custom(i) => schema.custom(*i).decode(reader),
        FieldKind::Map { .. } => unreachable!("map entries decode at field level"),
    }
}

fn decode_map_entry(
    schema: &CompiledSchema,
    key: ScalarType,
    value_kind: &FieldKind,
    reader: &mut Reader<'_>,
) -> Result<(ProtoValue, ProtoValue), DecodeError> {
    let mut entry_key = None;
    let mut entry_value = None;
    while reader.remaining() > 0 {
        let (tag, wire_type) = wire::read_key(reader)?;
        match tag {
            1 if wire_type == key.wire_type() => entry_key = Some(key.decode(reader)?),
            2 if wire_type == schema.field_wire_type(value_kind) => {
                entry_value = Some(decode_element(schema, value_kind, reader)?);
            }
            _ => wire::skip_field(reader, wire_type)?,
        }
    }
    let entry_key = match entry_key {
        Some(k) => k,
        None => key.default_value(),
    };
    let entry_value = match entry_value {
        Some(v) => v,
        None => default_element(schema, value_kind)?,
    };
    Ok((entry_key, entry_value))
}

/// Default for a map entry's missing value field.
fn default_element(schema: &CompiledSchema, kind: &FieldKind) -> Result<ProtoValue, DecodeError> {
    match kind {
        FieldKind::Scalar(scalar) => Ok(scalar.default_value()),
        FieldKind::Enum(e) => Ok(ProtoValue::Int(
            schema.enum_desc(*e).values.first().map_or(0, |(_, v)| *v),
        )),
        // An absent message materializes as its own empty-range decode, so
        // nested defaults fill in (and nested required fields still fail).
        FieldKind::Message(r) => decode_message(schema, *r, &mut Reader::new(&[])),
        FieldKind::Custom(i) => schema.custom(*i).decode(&mut Reader::new(&[])),
        FieldKind::Map { .. } => unreachable!("map values cannot be maps"),
    }
}

/// Default materialized for a field absent from the decoded range, or
/// `None` when absence is preserved (oneof members, message- and
/// custom-typed fields). Filling a default for an unset oneof member would
/// fabricate a second "set" member of its group.
fn default_for(schema: &CompiledSchema, field: &FieldDescriptor) -> Option<ProtoValue> {
    if field.oneof.is_some() {
        return None;
    }
    if matches!(field.kind, FieldKind::Map { .. }) {
        return Some(ProtoValue::Map(Vec::new()));
    }
    if field.label == Label::Repeated {
        return Some(ProtoValue::List(Vec::new()));
    }
    if let Some(declared) = &field.default {
        return Some(declared.clone());
    }
    match &field.kind {
        FieldKind::Scalar(scalar) => Some(scalar.default_value()),
        FieldKind::Enum(e) => schema
            .enum_desc(*e)
            .values
            .first()
            .map(|(_, v)| ProtoValue::Int(*v)),
        FieldKind::Message(_) | FieldKind::Custom(_) | FieldKind::Map { .. } => None,
    }
}
