//! Public per-type handles over a compiled schema.

use protopack_buffers::Writer;

use crate::error::{DecodeError, EncodeError};
use crate::registry::{
    CompiledSchema, EnumDescriptor, EnumRef, MessageDescriptor, MessageRef, TypeRef,
};
use crate::value::ProtoValue;
use crate::{decoder, encoder, length};

impl CompiledSchema {
    /// Handle for a message by qualified id (`"Outer"`, `"Outer.Inner"`).
    pub fn message(&self, id: &str) -> Option<MessageType<'_>> {
        match self.lookup(id)? {
            TypeRef::Message(i) => Some(MessageType {
                schema: self,
                msg: MessageRef(i),
            }),
            TypeRef::Enum(_) => None,
        }
    }

    /// Handle for an enum by qualified id.
    pub fn enum_type(&self, id: &str) -> Option<EnumType<'_>> {
        match self.lookup(id)? {
            TypeRef::Enum(i) => Some(EnumType {
                schema: self,
                enumeration: EnumRef(i),
            }),
            TypeRef::Message(_) => None,
        }
    }
}

/// A compiled message type: the encode/decode/encoding-length surface plus
/// nested-type lookup.
#[derive(Clone, Copy)]
pub struct MessageType<'a> {
    schema: &'a CompiledSchema,
    msg: MessageRef,
}

impl<'a> MessageType<'a> {
    fn descriptor(&self) -> &'a MessageDescriptor {
        self.schema.message_desc(self.msg)
    }

    pub fn name(&self) -> &'a str {
        &self.descriptor().name
    }

    /// Dot-qualified id of this message.
    pub fn id(&self) -> &'a str {
        &self.descriptor().id
    }

    pub fn fields(&self) -> &'a [crate::registry::FieldDescriptor] {
        &self.descriptor().fields
    }

    /// Total serialized size of `value`, without writing any bytes.
    pub fn encoding_length(&self, value: &ProtoValue) -> Result<usize, EncodeError> {
        length::message_length(self.schema, self.msg, value)
    }

    /// Encodes `value` into a fresh buffer sized by [`Self::encoding_length`].
    pub fn encode(&self, value: &ProtoValue) -> Result<Vec<u8>, EncodeError> {
        let mut writer = Writer::with_capacity(self.encoding_length(value)?);
        encoder::encode_message(self.schema, self.msg, value, &mut writer)?;
        Ok(writer.flush())
    }

    /// Encodes `value` into a caller-supplied writer, returning the number
    /// of bytes written.
    pub fn encode_into(
        &self,
        value: &ProtoValue,
        writer: &mut Writer,
    ) -> Result<usize, EncodeError> {
        encoder::encode_message(self.schema, self.msg, value, writer)
    }

    /// Decodes a complete buffer.
    pub fn decode(&self, bytes: &[u8]) -> Result<ProtoValue, DecodeError> {
        decoder::decode_range(self.schema, self.msg, bytes, 0, bytes.len())
    }

    /// Decodes the byte range `[offset, end)` of `bytes`.
    pub fn decode_range(
        &self,
        bytes: &[u8],
        offset: usize,
        end: usize,
    ) -> Result<ProtoValue, DecodeError> {
        decoder::decode_range(self.schema, self.msg, bytes, offset, end)
    }

    /// Nested message declared directly under this one.
    pub fn message(&self, name: &str) -> Option<MessageType<'a>> {
        self.descriptor()
            .nested_messages
            .iter()
            .map(|&i| MessageRef(i))
            .find(|&r| self.schema.message_desc(r).name == name)
            .map(|msg| MessageType {
                schema: self.schema,
                msg,
            })
    }

    /// Nested enum declared directly under this one.
    pub fn enum_type(&self, name: &str) -> Option<EnumType<'a>> {
        self.descriptor()
            .nested_enums
            .iter()
            .map(|&i| EnumRef(i))
            .find(|&r| self.schema.enum_desc(r).name == name)
            .map(|enumeration| EnumType {
                schema: self.schema,
                enumeration,
            })
    }
}

/// A compiled enum type: its constant table.
#[derive(Clone, Copy)]
pub struct EnumType<'a> {
    schema: &'a CompiledSchema,
    enumeration: EnumRef,
}

impl<'a> EnumType<'a> {
    fn descriptor(&self) -> &'a EnumDescriptor {
        self.schema.enum_desc(self.enumeration)
    }

    pub fn name(&self) -> &'a str {
        &self.descriptor().name
    }

    pub fn id(&self) -> &'a str {
        &self.descriptor().id
    }

    /// Constants in declaration order.
    pub fn values(&self) -> &'a [(String, i64)] {
        &self.descriptor().values
    }

    pub fn value(&self, name: &str) -> Option<i64> {
        self.descriptor().value(name)
    }

    pub fn name_of(&self, number: i64) -> Option<&'a str> {
        self.descriptor().name_of(number)
    }
}
