//! Canonical encoding helpers shared by every message kind.
//!
//! Every entity encodes its fields in declaration order. Variable-length fields carry a
//! length prefix and optional fields carry a one-byte presence tag, so the encoding of a
//! value is unambiguous and can be used directly as hashing input.

use bytes::{Buf, BufMut};
use commonware_codec::{Encode, EncodeSize, Error, FixedSize, Read, ReadExt, Write};

/// Tag written for an absent value. An absent top-level entity encodes to exactly this byte.
pub const ABSENT: u8 = 0x00;

/// Tag written in front of a present value.
pub const PRESENT: u8 = 0x01;

/// Maximum length of identifiers (node ids, database ids, column names, declared types).
pub const MAX_ID_LENGTH: usize = 1024;

/// Maximum length of an SQL pattern or a text value.
pub const MAX_TEXT_LENGTH: usize = 1024 * 1024;

/// Maximum length of a binary value.
pub const MAX_BINARY_LENGTH: usize = 16 * 1024 * 1024;

/// Encoding limits a value must respect for its encoding to decode again.
///
/// Checked before signing so that a signed message can always be read back by peers.
pub trait Bounded {
    fn check_bounds(&self) -> Result<(), crate::Error>;
}

/// Fail with [crate::Error::LimitExceeded] when `len` is above `max`.
pub fn ensure_within(field: &'static str, len: usize, max: usize) -> Result<(), crate::Error> {
    if len > max {
        return Err(crate::Error::LimitExceeded(field));
    }
    Ok(())
}

/// Check a string sequence written by [write_strings] against its read limits.
pub fn ensure_strings_within(
    field: &'static str,
    values: &[String],
    max_count: usize,
    max_len: usize,
) -> Result<(), crate::Error> {
    ensure_within(field, values.len(), max_count)?;
    values
        .iter()
        .try_for_each(|value| ensure_within(field, value.len(), max_len))
}

/// Canonical bytes of an optional entity.
///
/// `None` encodes to `[ABSENT]`; `Some(entity)` encodes to `PRESENT` followed by the
/// entity's encoding, so the two can never collide.
pub fn canonical_bytes<T: Write + EncodeSize>(entity: Option<&T>) -> Vec<u8> {
    match entity {
        None => vec![ABSENT],
        Some(entity) => {
            let mut buf = Vec::with_capacity(1 + entity.encode_size());
            PRESENT.write(&mut buf);
            buf.extend_from_slice(entity.encode().as_ref());
            buf
        }
    }
}

/// Write a string as length-prefixed UTF-8 bytes.
pub fn write_string(s: &str, writer: &mut impl BufMut) {
    write_bytes(s.as_bytes(), writer);
}

/// Read a string from length-prefixed UTF-8 bytes.
pub fn read_string(reader: &mut impl Buf, max_len: usize) -> Result<String, Error> {
    let bytes = read_bytes(reader, max_len)?;
    String::from_utf8(bytes).map_err(|_| Error::Invalid("String", "invalid UTF-8"))
}

/// Encode size of a length-prefixed string.
pub fn string_encode_size(s: &str) -> usize {
    bytes_encode_size(s.as_bytes())
}

/// Write a byte string with a `u32` length prefix.
///
/// Lengths are bounded by [Bounded] checks long before `u32::MAX`.
pub fn write_bytes(bytes: &[u8], writer: &mut impl BufMut) {
    (bytes.len() as u32).write(writer);
    writer.put_slice(bytes);
}

/// Read a `u32` length-prefixed byte string.
pub fn read_bytes(reader: &mut impl Buf, max_len: usize) -> Result<Vec<u8>, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("Bytes", "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    Ok(bytes)
}

pub fn bytes_encode_size(bytes: &[u8]) -> usize {
    u32::SIZE + bytes.len()
}

/// Write an optional value behind a presence tag.
pub fn write_optional<T: Write>(value: &Option<T>, writer: &mut impl BufMut) {
    match value {
        None => ABSENT.write(writer),
        Some(value) => {
            PRESENT.write(writer);
            value.write(writer);
        }
    }
}

/// Read an optional value written by [write_optional].
pub fn read_optional<T: Read<Cfg = ()>>(reader: &mut impl Buf) -> Result<Option<T>, Error> {
    match u8::read(reader)? {
        ABSENT => Ok(None),
        PRESENT => Ok(Some(T::read(reader)?)),
        tag => Err(Error::InvalidEnum(tag)),
    }
}

pub fn optional_encode_size<T: EncodeSize>(value: &Option<T>) -> usize {
    u8::SIZE + value.as_ref().map_or(0, EncodeSize::encode_size)
}

/// Write a sequence of strings with a `u32` count prefix.
pub fn write_strings(values: &[String], writer: &mut impl BufMut) {
    (values.len() as u32).write(writer);
    for value in values {
        write_string(value, writer);
    }
}

/// Read a sequence written by [write_strings].
pub fn read_strings(
    reader: &mut impl Buf,
    max_count: usize,
    max_len: usize,
) -> Result<Vec<String>, Error> {
    let count = u32::read(reader)? as usize;
    if count > max_count {
        return Err(Error::Invalid("Strings", "too many"));
    }
    let mut values = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        values.push(read_string(reader, max_len)?);
    }
    Ok(values)
}

pub fn strings_encode_size(values: &[String]) -> usize {
    u32::SIZE + values.iter().map(|v| string_encode_size(v)).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use commonware_cryptography::sha256::{Digest, Sha256};
    use commonware_cryptography::Hasher;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    #[test]
    fn absent_entity_is_single_sentinel() {
        let first = canonical_bytes::<u64>(None);
        let second = canonical_bytes::<u64>(None);
        assert_eq!(first, vec![ABSENT]);
        assert_eq!(first, second);
        assert_ne!(canonical_bytes(Some(&0u8)), first);
        assert_eq!(canonical_bytes(Some(&0u8)), vec![PRESENT, 0]);
    }

    #[test]
    fn optional_roundtrip() {
        let digest: Option<Digest> = Some(Sha256::hash(b"x"));
        let mut buf = BytesMut::new();
        write_optional(&digest, &mut buf);
        write_optional::<Digest>(&None, &mut buf);
        assert_eq!(
            buf.len(),
            optional_encode_size(&digest) + optional_encode_size::<Digest>(&None)
        );

        let mut reader = buf.as_ref();
        assert_eq!(read_optional::<Digest>(&mut reader).unwrap(), digest);
        assert_eq!(read_optional::<Digest>(&mut reader).unwrap(), None);
        assert!(reader.is_empty());
    }

    #[test]
    fn optional_rejects_unknown_tag() {
        let mut reader: &[u8] = &[7u8];
        let err = read_optional::<u64>(&mut reader).expect_err("unknown tag");
        assert!(matches!(err, Error::InvalidEnum(7)));
    }

    #[test]
    fn bounds_helpers_reject_over_limit() {
        assert_eq!(ensure_within("field", 4, 4), Ok(()));
        assert_eq!(
            ensure_within("field", 5, 4),
            Err(crate::Error::LimitExceeded("field"))
        );

        let values = vec!["ab".to_string(), "abc".to_string()];
        assert_eq!(ensure_strings_within("columns", &values, 2, 3), Ok(()));
        assert_eq!(
            ensure_strings_within("columns", &values, 1, 3),
            Err(crate::Error::LimitExceeded("columns"))
        );
        assert_eq!(
            ensure_strings_within("columns", &values, 2, 2),
            Err(crate::Error::LimitExceeded("columns"))
        );
    }

    #[test]
    fn length_prefix_prevents_concatenation_collisions() {
        let mut left = BytesMut::new();
        write_strings(&["ab".to_string(), "c".to_string()], &mut left);
        let mut right = BytesMut::new();
        write_strings(&["a".to_string(), "bc".to_string()], &mut right);
        assert_ne!(left, right);
    }

    #[test]
    fn read_string_rejects_too_long() {
        let mut buf = BytesMut::new();
        (5u32).write(&mut buf);
        buf.extend_from_slice(b"hello");

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 4).expect_err("should reject too-long string");
        assert!(matches!(err, Error::Invalid("Bytes", "too long")));
    }

    #[test]
    fn read_string_rejects_truncated_buffers() {
        let mut buf = BytesMut::new();
        (3u32).write(&mut buf);
        buf.extend_from_slice(b"ab");

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 10).expect_err("should reject truncated buffer");
        assert!(matches!(err, Error::EndOfBuffer));
    }

    #[test]
    fn read_string_rejects_invalid_utf8() {
        let mut buf = BytesMut::new();
        (2u32).write(&mut buf);
        buf.extend_from_slice(&[0xff, 0xff]);

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 10).expect_err("should reject invalid UTF-8");
        assert!(matches!(err, Error::Invalid("String", "invalid UTF-8")));
    }

    #[test]
    fn read_strings_handles_malformed_inputs() {
        let mut rng = StdRng::seed_from_u64(0x5eed_c0de);

        for _ in 0..500 {
            let len = (rng.next_u32() as usize) % 512;
            let mut buf = vec![0u8; len];
            rng.fill_bytes(&mut buf);
            let mut reader = buf.as_slice();
            if let Ok(values) = read_strings(&mut reader, 16, 64) {
                assert!(values.len() <= 16);
                assert!(values.iter().all(|v| v.len() <= 64));
            }
        }
    }
}
