//! Codec for encoding and decoding htsmsg maps and frames.
//!
//! Frame format:
//! ```text
//! +----------------+-------------------------------------------+
//! | Length (u32 BE)| Payload: field*                           |
//! +----------------+-------------------------------------------+
//!
//! field = | tag u8 | name_len u8 | name | body |
//!
//! body (by tag):
//!   Integer  | len u8 | len bytes, big-endian two's complement (0 => value 0)
//!   String   | len u32 BE | UTF-8 bytes
//!   Binary   | len u32 BE | raw bytes
//!   List     | len u32 BE | field* (each with an empty name)
//!   Map      | len u32 BE | field*
//! ```

use std::collections::HashSet;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::types::MAX_FRAME_SIZE;
use crate::value::{Map, Value};

/// Length prefix size.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Maximum nesting of lists/maps accepted by the decoder.
pub const MAX_NESTING_DEPTH: usize = 32;

/// htsmsg type tags.
pub mod tag {
    pub const MAP: u8 = 1;
    pub const S64: u8 = 2;
    pub const STR: u8 = 3;
    pub const BIN: u8 = 4;
    pub const LIST: u8 = 5;
    /// Decoded as an integer; never emitted.
    pub const BOOL: u8 = 7;
}

/// Encode a map into its payload bytes (no length prefix).
pub fn encode_map(map: &Map) -> Result<Bytes, EncodeError> {
    let mut buf = BytesMut::new();
    encode_fields(&mut buf, map)?;
    Ok(buf.freeze())
}

/// Encode a map into a complete frame: length prefix followed by the payload.
pub fn encode_frame(map: &Map) -> Result<Bytes, EncodeError> {
    let mut frame = BytesMut::with_capacity(256);
    frame.put_u32(0);
    encode_fields(&mut frame, map)?;

    let payload_len = frame.len() - LENGTH_PREFIX_SIZE;
    if payload_len > MAX_FRAME_SIZE as usize {
        return Err(EncodeError::PayloadTooLarge(payload_len));
    }
    frame[..LENGTH_PREFIX_SIZE].copy_from_slice(&(payload_len as u32).to_be_bytes());
    Ok(frame.freeze())
}

fn encode_fields(buf: &mut BytesMut, map: &Map) -> Result<(), EncodeError> {
    for (name, value) in map.iter() {
        encode_field(buf, name, value)?;
    }
    Ok(())
}

fn encode_field(buf: &mut BytesMut, name: &str, value: &Value) -> Result<(), EncodeError> {
    let name_len = u8::try_from(name.len()).map_err(|_| EncodeError::NameTooLong(name.len()))?;

    match value {
        Value::Integer(v) => {
            buf.put_u8(tag::S64);
            buf.put_u8(name_len);
            buf.put_slice(name.as_bytes());
            encode_integer(buf, *v);
        }
        Value::String(s) => {
            buf.put_u8(tag::STR);
            buf.put_u8(name_len);
            buf.put_slice(name.as_bytes());
            put_len(buf, s.len())?;
            buf.put_slice(s.as_bytes());
        }
        Value::Binary(b) => {
            buf.put_u8(tag::BIN);
            buf.put_u8(name_len);
            buf.put_slice(name.as_bytes());
            put_len(buf, b.len())?;
            buf.put_slice(b);
        }
        Value::List(items) => {
            buf.put_u8(tag::LIST);
            buf.put_u8(name_len);
            buf.put_slice(name.as_bytes());
            let mark = reserve_len(buf);
            for item in items {
                encode_field(buf, "", item)?;
            }
            patch_len(buf, mark)?;
        }
        Value::Map(inner) => {
            buf.put_u8(tag::MAP);
            buf.put_u8(name_len);
            buf.put_slice(name.as_bytes());
            let mark = reserve_len(buf);
            encode_fields(buf, inner)?;
            patch_len(buf, mark)?;
        }
    }
    Ok(())
}

/// Minimal big-endian two's complement: strip leading bytes that are pure
/// sign extension of the next byte. Zero encodes as an empty body.
fn encode_integer(buf: &mut BytesMut, v: i64) {
    let bytes = v.to_be_bytes();
    let mut start = 0;
    if v == 0 {
        start = bytes.len();
    } else {
        while start < bytes.len() - 1 {
            let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
                || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
            if !redundant {
                break;
            }
            start += 1;
        }
    }
    let body = &bytes[start..];
    buf.put_u8(body.len() as u8);
    buf.put_slice(body);
}

fn put_len(buf: &mut BytesMut, len: usize) -> Result<(), EncodeError> {
    let len = u32::try_from(len).map_err(|_| EncodeError::PayloadTooLarge(len))?;
    buf.put_u32(len);
    Ok(())
}

fn reserve_len(buf: &mut BytesMut) -> usize {
    let mark = buf.len();
    buf.put_u32(0);
    mark
}

fn patch_len(buf: &mut BytesMut, mark: usize) -> Result<(), EncodeError> {
    let len = buf.len() - mark - LENGTH_PREFIX_SIZE;
    let len = u32::try_from(len).map_err(|_| EncodeError::PayloadTooLarge(len))?;
    buf[mark..mark + LENGTH_PREFIX_SIZE].copy_from_slice(&len.to_be_bytes());
    Ok(())
}

/// Read the payload length of the frame at the start of `buf`.
/// Returns None if the length prefix is not complete yet.
pub fn peek_frame_len(buf: &[u8]) -> Option<u32> {
    let prefix: [u8; LENGTH_PREFIX_SIZE] = buf.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
    Some(u32::from_be_bytes(prefix))
}

/// Decode exactly one complete frame.
///
/// Any proper prefix of a valid frame fails with [`DecodeError::TruncatedInput`];
/// bytes after the frame are ignored.
pub fn decode_frame(buf: &[u8]) -> Result<Map, DecodeError> {
    let payload_len = peek_frame_len(buf).ok_or(DecodeError::TruncatedInput {
        expected: LENGTH_PREFIX_SIZE,
        actual: buf.len(),
    })? as usize;

    let body = &buf[LENGTH_PREFIX_SIZE..];
    if body.len() < payload_len {
        return Err(DecodeError::TruncatedInput {
            expected: payload_len,
            actual: body.len(),
        });
    }
    decode_map(&body[..payload_len])
}

/// Decode a payload (a sequence of fields) into a map.
pub fn decode_map(payload: &[u8]) -> Result<Map, DecodeError> {
    decode_fields(payload, 0)
}

fn decode_fields(mut buf: &[u8], depth: usize) -> Result<Map, DecodeError> {
    let mut map = Map::new();
    let mut seen = HashSet::new();
    while buf.has_remaining() {
        let (name, value) = decode_field(&mut buf, depth)?;
        if !seen.insert(name.clone()) {
            return Err(DecodeError::DuplicateField(name));
        }
        map.push_unchecked(name, value);
    }
    Ok(map)
}

fn decode_list(mut buf: &[u8], depth: usize) -> Result<Vec<Value>, DecodeError> {
    let mut items = Vec::new();
    while buf.has_remaining() {
        // Element names are ignored; htsmsg writers leave them empty.
        let (_, value) = decode_field(&mut buf, depth)?;
        items.push(value);
    }
    Ok(items)
}

fn decode_field(buf: &mut &[u8], depth: usize) -> Result<(String, Value), DecodeError> {
    ensure(*buf, 2)?;
    let type_tag = buf.get_u8();
    let name_len = buf.get_u8() as usize;
    let name = take(buf, name_len)?;
    let name = utf8(name)?;

    let value = match type_tag {
        tag::S64 | tag::BOOL => {
            ensure(*buf, 1)?;
            let len = buf.get_u8() as usize;
            let body = take(buf, len)?;
            Value::Integer(decode_integer(body)?)
        }
        tag::STR => {
            let body = take_sized(buf)?;
            Value::String(utf8(body)?)
        }
        tag::BIN => {
            let body = take_sized(buf)?;
            Value::Binary(Bytes::copy_from_slice(body))
        }
        tag::LIST => {
            let body = take_sized(buf)?;
            let depth = nested(depth)?;
            Value::List(decode_list(body, depth)?)
        }
        tag::MAP => {
            let body = take_sized(buf)?;
            let depth = nested(depth)?;
            Value::Map(decode_fields(body, depth)?)
        }
        other => return Err(DecodeError::UnknownTypeTag(other)),
    };
    Ok((name, value))
}

fn decode_integer(body: &[u8]) -> Result<i64, DecodeError> {
    if body.len() > 8 {
        return Err(DecodeError::IntegerTooWide(body.len()));
    }
    let Some(&first) = body.first() else {
        return Ok(0);
    };
    let mut acc: i64 = if first & 0x80 != 0 { -1 } else { 0 };
    for &b in body {
        acc = (acc << 8) | i64::from(b);
    }
    Ok(acc)
}

fn nested(depth: usize) -> Result<usize, DecodeError> {
    let depth = depth + 1;
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::DepthLimitExceeded(MAX_NESTING_DEPTH));
    }
    Ok(depth)
}

fn ensure(buf: &[u8], needed: usize) -> Result<(), DecodeError> {
    if buf.remaining() < needed {
        return Err(DecodeError::TruncatedInput {
            expected: needed,
            actual: buf.remaining(),
        });
    }
    Ok(())
}

/// Split off `len` bytes; the declared length must fit what is left.
fn take<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8], DecodeError> {
    let whole: &'a [u8] = *buf;
    if whole.len() < len {
        return Err(DecodeError::LengthOverflow {
            declared: len,
            remaining: whole.len(),
        });
    }
    let (head, tail) = whole.split_at(len);
    *buf = tail;
    Ok(head)
}

/// Read a u32 length and split off that many bytes.
fn take_sized<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], DecodeError> {
    ensure(*buf, LENGTH_PREFIX_SIZE)?;
    let len = buf.get_u32() as usize;
    take(buf, len)
}

fn utf8(bytes: &[u8]) -> Result<String, DecodeError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| DecodeError::InvalidUtf8(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(map: &Map) -> Map {
        let frame = encode_frame(map).unwrap();
        decode_frame(&frame).unwrap()
    }

    fn int_body(v: i64) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_integer(&mut buf, v);
        buf.to_vec()
    }

    #[test]
    fn test_hello_frame_layout() {
        let map = Map::new().with("method", "hello").with("htspversion", 27);
        let frame = encode_frame(&map).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&[tag::STR, 6]);
        expected.extend_from_slice(b"method");
        expected.extend_from_slice(&5u32.to_be_bytes());
        expected.extend_from_slice(b"hello");
        expected.extend_from_slice(&[tag::S64, 11]);
        expected.extend_from_slice(b"htspversion");
        expected.extend_from_slice(&[1, 27]);

        assert_eq!(peek_frame_len(&frame), Some(expected.len() as u32));
        assert_eq!(&frame[LENGTH_PREFIX_SIZE..], &expected[..]);
        assert_eq!(decode_frame(&frame).unwrap(), map);
    }

    #[test]
    fn test_integer_encoding_is_minimal() {
        assert_eq!(int_body(0), vec![0]);
        assert_eq!(int_body(1), vec![1, 0x01]);
        assert_eq!(int_body(127), vec![1, 0x7F]);
        assert_eq!(int_body(128), vec![2, 0x00, 0x80]);
        assert_eq!(int_body(-1), vec![1, 0xFF]);
        assert_eq!(int_body(-128), vec![1, 0x80]);
        assert_eq!(int_body(-129), vec![2, 0xFF, 0x7F]);
        assert_eq!(int_body(i64::MIN).len(), 9);
    }

    #[test]
    fn test_integer_roundtrip() {
        for v in [
            0,
            1,
            -1,
            127,
            128,
            -128,
            -129,
            255,
            256,
            65535,
            -65536,
            i64::from(u32::MAX),
            i64::from(i32::MIN),
            i64::MAX,
            i64::MIN,
        ] {
            let map = Map::new().with("v", v);
            assert_eq!(roundtrip(&map), map, "value {v}");
        }
    }

    #[test]
    fn test_empty_values_roundtrip() {
        let map = Map::new()
            .with("s", "")
            .with("b", Bytes::new())
            .with("l", Vec::<Value>::new())
            .with("m", Map::new())
            .with("", "unnamed");
        assert_eq!(roundtrip(&map), map);
        assert_eq!(roundtrip(&Map::new()), Map::new());
    }

    #[test]
    fn test_nested_roundtrip() {
        let service = Map::new().with("name", "Mux/530/BBC TWO").with("type", "SDTV");
        let channel = Map::new()
            .with("channelId", 2)
            .with("services", vec![Value::Map(service.clone()), Value::Map(service)])
            .with("tags", vec![Value::from(1), Value::from("x"), Value::from(-7)]);
        let map = Map::new()
            .with("method", "getChannels")
            .with("channels", vec![Value::Map(channel.clone())])
            .with("meta", Map::new().with("inner", Map::new().with("deep", channel)))
            .with("challenge", Bytes::from_static(&[0, 1, 2, 0xFF]));
        assert_eq!(roundtrip(&map), map);
    }

    #[test]
    fn test_field_order_is_preserved() {
        let map = Map::new().with("z", 1).with("a", 2).with("m", 3);
        let payload = encode_map(&map).unwrap();
        let decoded = decode_map(&payload).unwrap();
        let names: Vec<&str> = decoded.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["z", "a", "m"]);
        assert_eq!(encode_map(&decoded).unwrap(), payload);
    }

    #[test]
    fn test_every_prefix_is_truncated() {
        let map = Map::new()
            .with("method", "channelAdd")
            .with("channelId", 300)
            .with("list", vec![Value::Map(Map::new().with("k", -5))])
            .with("bin", Bytes::from_static(b"abc"));
        let frame = encode_frame(&map).unwrap();

        for cut in 0..frame.len() {
            let result = decode_frame(&frame[..cut]);
            assert!(
                matches!(result, Err(DecodeError::TruncatedInput { .. })),
                "prefix {cut}: {result:?}"
            );
        }
        assert_eq!(decode_frame(&frame).unwrap(), map);
    }

    #[test]
    fn test_unknown_tag() {
        let payload = [9u8, 1, b'x', 0];
        assert_eq!(decode_map(&payload), Err(DecodeError::UnknownTypeTag(9)));
    }

    #[test]
    fn test_length_overflow_stays_in_region() {
        // Map whose declared body (8) runs past the 3 bytes that follow.
        let mut payload = vec![tag::MAP, 1, b'm'];
        payload.extend_from_slice(&8u32.to_be_bytes());
        payload.extend_from_slice(&[tag::S64, 0, 0]);
        assert_eq!(
            decode_map(&payload),
            Err(DecodeError::LengthOverflow {
                declared: 8,
                remaining: 3,
            })
        );

        // String inside a map claims more than the map body holds, even though
        // trailing bytes exist outside the map.
        let mut inner = vec![tag::STR, 1, b's'];
        inner.extend_from_slice(&10u32.to_be_bytes());
        inner.extend_from_slice(b"abc");
        let mut payload = vec![tag::MAP, 1, b'm'];
        payload.extend_from_slice(&(inner.len() as u32).to_be_bytes());
        payload.extend_from_slice(&inner);
        payload.extend_from_slice(&[tag::STR, 1, b't']);
        payload.extend_from_slice(&7u32.to_be_bytes());
        payload.extend_from_slice(b"1234567");
        assert!(matches!(
            decode_map(&payload),
            Err(DecodeError::LengthOverflow { declared: 10, .. })
        ));
    }

    #[test]
    fn test_integer_too_wide() {
        let mut payload = vec![tag::S64, 1, b'i', 9];
        payload.extend_from_slice(&[0; 9]);
        assert_eq!(decode_map(&payload), Err(DecodeError::IntegerTooWide(9)));
    }

    #[test]
    fn test_bool_tag_decodes_as_integer() {
        let payload = [tag::BOOL, 1, b'b', 1, 1];
        let map = decode_map(&payload).unwrap();
        assert_eq!(map.get("b"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let payload = [tag::S64, 1, b'a', 0, tag::S64, 1, b'a', 1, 5];
        assert_eq!(
            decode_map(&payload),
            Err(DecodeError::DuplicateField("a".to_string()))
        );
    }

    #[test]
    fn test_many_unique_fields_decode_quickly() {
        const FIELDS: usize = 200_000;
        let mut payload = Vec::new();
        for i in 0..FIELDS {
            let name = format!("f{i}");
            payload.extend_from_slice(&[tag::S64, name.len() as u8]);
            payload.extend_from_slice(name.as_bytes());
            payload.extend_from_slice(&int_body(i as i64));
        }
        assert!(payload.len() < MAX_FRAME_SIZE as usize);

        let started = std::time::Instant::now();
        let map = decode_map(&payload).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(map.len(), FIELDS);
        assert_eq!(map.get("f199999"), Some(&Value::Integer(199_999)));
        assert!(
            elapsed < std::time::Duration::from_secs(10),
            "decode took {elapsed:?}"
        );
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let payload = [tag::STR, 1, b's', 0, 0, 0, 2, 0xC3, 0x28];
        assert!(matches!(decode_map(&payload), Err(DecodeError::InvalidUtf8(_))));
    }

    #[test]
    fn test_depth_limit() {
        let mut value = Value::Map(Map::new());
        for _ in 0..MAX_NESTING_DEPTH {
            value = Value::List(vec![value]);
        }
        let map = Map::new().with("deep", value);
        let payload = encode_map(&map).unwrap();
        assert_eq!(
            decode_map(&payload),
            Err(DecodeError::DepthLimitExceeded(MAX_NESTING_DEPTH))
        );
    }

    #[test]
    fn test_name_too_long() {
        let name = "n".repeat(256);
        let map = Map::new().with(name, 1);
        assert_eq!(encode_map(&map), Err(EncodeError::NameTooLong(256)));

        let ok = Map::new().with("n".repeat(255), 1);
        assert_eq!(roundtrip(&ok), ok);
    }
}
