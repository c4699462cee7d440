//! Wire-level framing: field keys and unknown-field skipping.
//!
//! Every field on the wire is preceded by a varint key
//! `(field_number << 3) | wire_type`. The three low bits select one of four
//! payload layouts; the group wire types (3 and 4) are not supported.

use protopack_buffers::{varint, Reader, Writer};

use crate::error::DecodeError;

/// Payload layout selector carried in the low three bits of a field key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer.
    Varint = 0,
    /// 8 fixed bytes.
    Fixed64 = 1,
    /// Varint length followed by that many payload bytes.
    LengthDelimited = 2,
    /// 4 fixed bytes.
    Fixed32 = 5,
}

impl WireType {
    /// Decodes the low three bits of a field key. Group wire types and
    /// values above 5 are unsupported.
    pub fn from_bits(bits: u8) -> Result<Self, DecodeError> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            other => Err(DecodeError::UnsupportedWireType(other)),
        }
    }
}

/// Writes the key for `(tag, wire_type)`.
pub fn write_key(writer: &mut Writer, tag: u32, wire_type: WireType) {
    varint::write(writer, (u64::from(tag) << 3) | wire_type as u64);
}

/// Byte length of the key for `(tag, wire_type)`.
pub fn key_length(tag: u32, wire_type: WireType) -> usize {
    varint::encoding_length((u64::from(tag) << 3) | wire_type as u64)
}

/// Reads a field key, returning the tag and the wire type.
pub fn read_key(reader: &mut Reader<'_>) -> Result<(u32, WireType), DecodeError> {
    let key = varint::read(reader)?;
    let wire_type = WireType::from_bits((key & 7) as u8)?;
    Ok(((key >> 3) as u32, wire_type))
}

/// Skips one field payload according to its wire type.
pub fn skip_field(reader: &mut Reader<'_>, wire_type: WireType) -> Result<(), DecodeError> {
    match wire_type {
        WireType::Varint => {
            varint::read(reader)?;
        }
        WireType::Fixed64 => reader.skip(8)?,
        WireType::LengthDelimited => {
            let len = varint::read(reader)? as usize;
            reader.skip(len)?;
        }
        WireType::Fixed32 => reader.skip(4)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_roundtrip() {
        for (tag, wire_type) in [
            (1u32, WireType::Varint),
            (2, WireType::Fixed64),
            (15, WireType::LengthDelimited),
            (16, WireType::Fixed32),
            (1000, WireType::Varint),
        ] {
            let mut writer = Writer::new();
            write_key(&mut writer, tag, wire_type);
            let bytes = writer.flush();
            assert_eq!(bytes.len(), key_length(tag, wire_type));
            let mut reader = Reader::new(&bytes);
            assert_eq!(read_key(&mut reader).unwrap(), (tag, wire_type));
        }
    }

    #[test]
    fn canonical_single_byte_keys() {
        // Field 1 varint is 0x08, field 2 varint is 0x10.
        let mut writer = Writer::new();
        write_key(&mut writer, 1, WireType::Varint);
        write_key(&mut writer, 2, WireType::Varint);
        assert_eq!(writer.flush(), vec![0x08, 0x10]);
    }

    #[test]
    fn group_wire_types_rejected() {
        for bits in [3u8, 4, 6, 7] {
            assert_eq!(
                WireType::from_bits(bits),
                Err(DecodeError::UnsupportedWireType(bits))
            );
        }
    }

    #[test]
    fn skip_matrix() {
        let mut writer = Writer::new();
        protopack_buffers::varint::write(&mut writer, 300); // varint payload
        writer.u64_le(7); // fixed64 payload
        protopack_buffers::varint::write(&mut writer, 3); // length prefix
        writer.buf(&[1, 2, 3]); // span payload
        writer.u32_le(9); // fixed32 payload
        writer.u8(0xaa); // sentinel
        let bytes = writer.flush();

        let mut reader = Reader::new(&bytes);
        skip_field(&mut reader, WireType::Varint).unwrap();
        skip_field(&mut reader, WireType::Fixed64).unwrap();
        skip_field(&mut reader, WireType::LengthDelimited).unwrap();
        skip_field(&mut reader, WireType::Fixed32).unwrap();
        assert_eq!(reader.u8().unwrap(), 0xaa);
    }

    #[test]
    fn skip_truncated_span() {
        let mut writer = Writer::new();
        protopack_buffers::varint::write(&mut writer, 10);
        writer.buf(&[1, 2]);
        let bytes = writer.flush();
        let mut reader = Reader::new(&bytes);
        assert_eq!(
            skip_field(&mut reader, WireType::LengthDelimited),
            Err(DecodeError::Truncated)
        );
    }
}
