//! Wire-level constants: stream header and field payload tags.

/// Magic bytes opening every serialised object stream.
pub const HEADER_MAGIC: [u8; 4] = *b"WPK\0";

/// Current wire protocol version.
pub const WIRE_VERSION: u8 = 1;

/// Label of the end marker closing a whole object stream.
pub const OBJ_ROOT_END: &str = "OBJ_ROOT_END";

/// Tag byte identifying the payload form of a wire field record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireTag {
    Bool = 0x01,
    I8 = 0x02,
    I16 = 0x03,
    I32 = 0x04,
    I64 = 0x05,
    F32 = 0x06,
    F64 = 0x07,
    Str = 0x08,
    /// Bulk scalar array: element tag, count, packed values.
    Array = 0x10,
    /// Generic container (sequence or set): element tag, count, values.
    Seq = 0x11,
    /// Associative map: key tag, value tag, count, pairs.
    Map = 0x12,
    /// Enumeration value encoded by variant name.
    Enum = 0x13,
    /// Tabular dataset record.
    Data = 0x14,
    /// Nullable scalar: element tag, presence byte, value when present.
    Maybe = 0x15,
    /// Start of a composite field; children follow until [`WireTag::End`].
    Start = 0x20,
    /// End of a composite field or of the whole stream.
    End = 0x21,
}

impl WireTag {
    /// Decodes a tag byte; unknown bytes yield `None`.
    pub fn from_u8(byte: u8) -> Option<WireTag> {
        Some(match byte {
            0x01 => WireTag::Bool,
            0x02 => WireTag::I8,
            0x03 => WireTag::I16,
            0x04 => WireTag::I32,
            0x05 => WireTag::I64,
            0x06 => WireTag::F32,
            0x07 => WireTag::F64,
            0x08 => WireTag::Str,
            0x10 => WireTag::Array,
            0x11 => WireTag::Seq,
            0x12 => WireTag::Map,
            0x13 => WireTag::Enum,
            0x14 => WireTag::Data,
            0x15 => WireTag::Maybe,
            0x20 => WireTag::Start,
            0x21 => WireTag::End,
            _ => return None,
        })
    }

    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }
}
