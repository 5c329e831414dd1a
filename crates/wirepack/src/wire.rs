//! Wire codec: field record layout, framing markers, and the lookahead
//! parser that indexes a stream into a [`WireField`] tree.
//!
//! A field record is `[name length: u16][name bytes][tag: u8][payload]`.
//! Composite fields carry a [`WireTag::Start`] tag and enclose their child
//! records up to the matching [`WireTag::End`]. The parser walks the stream
//! once, skipping payloads, and records where each payload begins so the
//! decoder can seek back to it later.

use wirepack_buffers::{Reader, Writer};

use crate::constants::{WireTag, HEADER_MAGIC, WIRE_VERSION};
use crate::error::WireError;
use crate::scalar::ScalarKind;

/// One field record of the parsed wire tree.
///
/// `payload_offset` addresses the record's tag byte, so a handler seeking
/// there can validate the tag before consuming the payload. The offset is
/// meaningful only for leaf records eventually matched to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireField {
    pub name: String,
    pub children: Vec<WireField>,
    pub payload_offset: usize,
}

/// Writes the stream header.
pub fn put_header_info(w: &mut Writer) {
    w.bytes(&HEADER_MAGIC);
    w.u8(WIRE_VERSION);
}

/// Writes a start marker record opening a composite field.
pub fn put_start_marker(w: &mut Writer, name: &str) {
    put_field_name(w, name);
    w.u8(WireTag::Start.byte());
}

/// Writes an end marker record closing a composite field or the stream.
pub fn put_end_marker(w: &mut Writer, name: &str) {
    put_field_name(w, name);
    w.u8(WireTag::End.byte());
}

/// Writes a field name prefix (u16 length + UTF-8 bytes). Names longer
/// than the u16 prefix can express are a caller bug.
pub fn put_field_name(w: &mut Writer, name: &str) {
    debug_assert!(name.len() <= usize::from(u16::MAX), "field name too long");
    w.u16(name.len() as u16);
    w.utf8(name);
}

/// Writes a length-prefixed string payload.
pub fn put_str(w: &mut Writer, s: &str) {
    w.u32(s.len() as u32);
    w.utf8(s);
}

/// Reads a length-prefixed string payload.
pub fn get_str(r: &mut Reader<'_>) -> Result<String, WireError> {
    let n = r.u32()? as usize;
    Ok(r.utf8(n)?.to_owned())
}

/// Writes an f64 column (u32 count + packed values).
pub(crate) fn put_f64s(w: &mut Writer, values: &[f64]) {
    w.u32(values.len() as u32);
    for v in values {
        w.f64(*v);
    }
}

/// Reads an f64 column.
pub(crate) fn get_f64s(r: &mut Reader<'_>) -> Result<Vec<f64>, WireError> {
    let count = r.u32()? as usize;
    let mut out = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        out.push(r.f64()?);
    }
    Ok(out)
}

/// Consumes a tag byte, requiring it to match `want`.
pub(crate) fn expect_tag(r: &mut Reader<'_>, want: WireTag, field: &str) -> Result<(), WireError> {
    let found = r.u8()?;
    if found != want.byte() {
        return Err(WireError::TagMismatch {
            field: field.to_owned(),
            found,
        });
    }
    Ok(())
}

fn get_field_name(r: &mut Reader<'_>) -> Result<String, WireError> {
    let n = r.u16()? as usize;
    Ok(r.utf8(n)?.to_owned())
}

/// Validates the stream header.
pub fn check_header_info(r: &mut Reader<'_>) -> Result<(), WireError> {
    let magic = r.take(4)?;
    if magic != HEADER_MAGIC {
        return Err(WireError::BadHeader);
    }
    if r.u8()? != WIRE_VERSION {
        return Err(WireError::BadHeader);
    }
    Ok(())
}

/// One lookahead pass over the stream from the reader's current position.
///
/// Builds the full field tree (names, nesting, payload offsets) without
/// decoding any values. Returns a synthetic unnamed root whose children are
/// the stream's top-level fields. Parsing stops at an end marker on the top
/// level or at the end of the buffer.
pub fn parse_io_stream(r: &mut Reader<'_>) -> Result<WireField, WireError> {
    check_header_info(r)?;
    let mut root = WireField {
        name: String::new(),
        children: Vec::new(),
        payload_offset: 0,
    };
    while !r.is_at_end() {
        let name = get_field_name(r)?;
        let offset = r.position();
        let tag = read_tag(r)?;
        match tag {
            WireTag::Start => root.children.push(parse_children(r, name, offset)?),
            WireTag::End => break,
            other => {
                skip_payload(r, other)?;
                root.children.push(WireField {
                    name,
                    children: Vec::new(),
                    payload_offset: offset,
                });
            }
        }
    }
    Ok(root)
}

fn parse_children(
    r: &mut Reader<'_>,
    name: String,
    offset: usize,
) -> Result<WireField, WireError> {
    let mut node = WireField {
        name,
        children: Vec::new(),
        payload_offset: offset,
    };
    loop {
        if r.is_at_end() {
            return Err(WireError::UnterminatedField(node.name));
        }
        let child_name = get_field_name(r)?;
        let child_offset = r.position();
        let tag = read_tag(r)?;
        match tag {
            WireTag::Start => node
                .children
                .push(parse_children(r, child_name, child_offset)?),
            WireTag::End => return Ok(node),
            other => {
                skip_payload(r, other)?;
                node.children.push(WireField {
                    name: child_name,
                    children: Vec::new(),
                    payload_offset: child_offset,
                });
            }
        }
    }
}

fn read_tag(r: &mut Reader<'_>) -> Result<WireTag, WireError> {
    let offset = r.position();
    let byte = r.u8()?;
    WireTag::from_u8(byte).ok_or(WireError::BadTag { offset, tag: byte })
}

fn read_elem_kind(r: &mut Reader<'_>) -> Result<ScalarKind, WireError> {
    let offset = r.position();
    let byte = r.u8()?;
    WireTag::from_u8(byte)
        .and_then(ScalarKind::from_tag)
        .ok_or(WireError::BadTag { offset, tag: byte })
}

fn skip_scalar(r: &mut Reader<'_>, kind: ScalarKind) -> Result<(), WireError> {
    let n = match kind {
        ScalarKind::Bool | ScalarKind::I8 => 1,
        ScalarKind::I16 => 2,
        ScalarKind::I32 | ScalarKind::F32 => 4,
        ScalarKind::I64 | ScalarKind::F64 => 8,
        ScalarKind::Str => r.u32()? as usize,
    };
    r.skip(n)?;
    Ok(())
}

fn skip_payload(r: &mut Reader<'_>, tag: WireTag) -> Result<(), WireError> {
    match tag {
        WireTag::Bool | WireTag::I8 => r.skip(1)?,
        WireTag::I16 => r.skip(2)?,
        WireTag::I32 | WireTag::F32 => r.skip(4)?,
        WireTag::I64 | WireTag::F64 => r.skip(8)?,
        WireTag::Str | WireTag::Enum => {
            let n = r.u32()? as usize;
            r.skip(n)?;
        }
        WireTag::Maybe => {
            let kind = read_elem_kind(r)?;
            if r.u8()? != 0 {
                skip_scalar(r, kind)?;
            }
        }
        WireTag::Array | WireTag::Seq => {
            let kind = read_elem_kind(r)?;
            let count = r.u32()? as usize;
            for _ in 0..count {
                skip_scalar(r, kind)?;
            }
        }
        WireTag::Map => {
            let key_kind = read_elem_kind(r)?;
            let val_kind = read_elem_kind(r)?;
            let count = r.u32()? as usize;
            for _ in 0..count {
                skip_scalar(r, key_kind)?;
                skip_scalar(r, val_kind)?;
            }
        }
        WireTag::Data => {
            let n = r.u32()? as usize;
            r.skip(n)?; // dataset name
            for _ in 0..2 {
                let count = r.u32()? as usize;
                r.skip(count * 8)?;
            }
        }
        // markers carry no payload and are handled by the parse loop
        WireTag::Start | WireTag::End => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::OBJ_ROOT_END;

    fn put_i32_field(w: &mut Writer, name: &str, value: i32) {
        put_field_name(w, name);
        w.u8(WireTag::I32.byte());
        w.i32(value);
    }

    #[test]
    fn parses_nested_structure_with_offsets() {
        let mut w = Writer::new();
        put_header_info(&mut w);
        put_start_marker(&mut w, "Root");
        put_i32_field(&mut w, "a", 1);
        put_start_marker(&mut w, "inner");
        put_i32_field(&mut w, "b", 2);
        put_end_marker(&mut w, "inner");
        put_end_marker(&mut w, "Root");
        put_end_marker(&mut w, OBJ_ROOT_END);
        let data = w.flush();

        let mut r = Reader::new(&data);
        let root = parse_io_stream(&mut r).unwrap();
        assert_eq!(root.children.len(), 1);
        let obj = &root.children[0];
        assert_eq!(obj.name, "Root");
        assert_eq!(obj.children.len(), 2);
        assert_eq!(obj.children[0].name, "a");
        assert!(obj.children[0].children.is_empty());
        assert_eq!(obj.children[1].name, "inner");
        assert_eq!(obj.children[1].children.len(), 1);

        // the recorded offset addresses the leaf's tag byte
        let mut check = Reader::new(&data);
        check.set_position(obj.children[0].payload_offset).unwrap();
        assert_eq!(check.u8().unwrap(), WireTag::I32.byte());
        assert_eq!(check.i32().unwrap(), 1);
    }

    #[test]
    fn lookahead_pass_skips_variable_length_payloads() {
        let mut w = Writer::new();
        put_header_info(&mut w);
        put_field_name(&mut w, "tags");
        w.u8(WireTag::Seq.byte());
        w.u8(WireTag::Str.byte());
        w.u32(2);
        put_str(&mut w, "a");
        put_str(&mut w, "bc");
        put_i32_field(&mut w, "after", 7);
        let data = w.flush();

        let root = parse_io_stream(&mut Reader::new(&data)).unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].name, "tags");
        assert_eq!(root.children[1].name, "after");
    }

    #[test]
    fn missing_end_marker_is_an_error() {
        let mut w = Writer::new();
        put_header_info(&mut w);
        put_start_marker(&mut w, "open");
        put_i32_field(&mut w, "a", 1);
        let data = w.flush();

        let err = parse_io_stream(&mut Reader::new(&data)).unwrap_err();
        assert!(matches!(err, WireError::UnterminatedField(name) if name == "open"));
    }

    #[test]
    fn bad_header_is_rejected() {
        let data = b"nope\x01";
        let err = parse_io_stream(&mut Reader::new(data)).unwrap_err();
        assert!(matches!(err, WireError::BadHeader));
    }

    #[test]
    fn declared_count_beyond_buffer_fails_cleanly() {
        // a huge declared count with almost no payload must error out
        // instead of allocating for the full count up front
        let mut w = Writer::new();
        w.u32(u32::MAX);
        w.f64(1.0);
        let data = w.flush();
        assert!(get_f64s(&mut Reader::new(&data)).is_err());
    }

    #[test]
    #[should_panic(expected = "field name too long")]
    fn oversized_field_name_is_rejected() {
        let mut w = Writer::new();
        let name = "x".repeat(usize::from(u16::MAX) + 1);
        put_field_name(&mut w, &name);
    }

    #[test]
    fn unknown_tag_is_rejected_with_offset() {
        let mut w = Writer::new();
        put_header_info(&mut w);
        put_field_name(&mut w, "x");
        let offset = w.position();
        w.u8(0x7F);
        let data = w.flush();

        let err = parse_io_stream(&mut Reader::new(&data)).unwrap_err();
        assert!(matches!(err, WireError::BadTag { offset: o, tag: 0x7F } if o == offset));
    }
}
