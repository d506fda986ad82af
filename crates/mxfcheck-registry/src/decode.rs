//! Primitive field decoders.
//!
//! Every decoder is total: malformed or short input falls back to
//! [`DecodedValue::Bytes`] so a damaged file degrades to raw bytes instead
//! of aborting the parse.

use uuid::Uuid;

use crate::DecodedValue;

fn take16(bytes: &[u8]) -> Option<[u8; 16]> {
    if bytes.len() < 16 {
        return None;
    }
    let mut out = [0u8; 16];
    out.copy_from_slice(&bytes[..16]);
    Some(out)
}

fn raw(bytes: &[u8]) -> DecodedValue {
    DecodedValue::Bytes(bytes.to_vec())
}

/// 16-byte instance UUID.
pub fn decode_uuid(bytes: &[u8]) -> DecodedValue {
    match take16(bytes) {
        Some(b) => DecodedValue::Uuid(Uuid::from_bytes(b)),
        None => raw(bytes),
    }
}

/// 16-byte AUID / universal label value.
pub fn decode_auid(bytes: &[u8]) -> DecodedValue {
    match take16(bytes) {
        Some(b) => DecodedValue::Auid(b),
        None => raw(bytes),
    }
}

/// Single strong reference: a 16-byte target Instance-ID.
pub fn decode_strong_ref(bytes: &[u8]) -> DecodedValue {
    match take16(bytes) {
        Some(b) => DecodedValue::StrongRef(b),
        None => raw(bytes),
    }
}

/// Strong reference batch: `count:u32, item_len:u32, items`.
pub fn decode_strong_ref_batch(bytes: &[u8]) -> DecodedValue {
    match decode_batch(bytes) {
        Some(ids) => DecodedValue::StrongRefVector(ids),
        None => raw(bytes),
    }
}

/// Single weak reference: a 16-byte label.
pub fn decode_weak_ref(bytes: &[u8]) -> DecodedValue {
    match take16(bytes) {
        Some(b) => DecodedValue::WeakRef(b),
        None => raw(bytes),
    }
}

/// Weak reference batch: `count:u32, item_len:u32, items`.
pub fn decode_weak_ref_batch(bytes: &[u8]) -> DecodedValue {
    match decode_batch(bytes) {
        Some(ids) => DecodedValue::WeakRefVector(ids),
        None => raw(bytes),
    }
}

/// Shared batch layout used by reference sets and vectors.
fn decode_batch(bytes: &[u8]) -> Option<Vec<[u8; 16]>> {
    if bytes.len() < 8 {
        return None;
    }
    let count = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let item_len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    if item_len < 16 {
        return None;
    }

    let mut out = Vec::with_capacity(count);
    let mut offset = 8;
    for _ in 0..count {
        if offset + 16 > bytes.len() {
            return None;
        }
        let mut id = [0u8; 16];
        id.copy_from_slice(&bytes[offset..offset + 16]);
        out.push(id);
        offset += item_len;
    }
    Some(out)
}

/// UTF-16BE string, stopping at the first NUL.
pub fn decode_utf16(bytes: &[u8]) -> DecodedValue {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .take_while(|&c| c != 0)
        .collect();
    DecodedValue::Utf16(String::from_utf16_lossy(&units))
}

pub fn decode_u8(bytes: &[u8]) -> DecodedValue {
    match bytes.first() {
        Some(&b) => DecodedValue::U8(b),
        None => raw(bytes),
    }
}

pub fn decode_u16(bytes: &[u8]) -> DecodedValue {
    if bytes.len() < 2 {
        return raw(bytes);
    }
    DecodedValue::U16(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub fn decode_u32(bytes: &[u8]) -> DecodedValue {
    if bytes.len() < 4 {
        return raw(bytes);
    }
    DecodedValue::U32(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub fn decode_u64(bytes: &[u8]) -> DecodedValue {
    if bytes.len() < 8 {
        return raw(bytes);
    }
    let mut be = [0u8; 8];
    be.copy_from_slice(&bytes[..8]);
    DecodedValue::U64(u64::from_be_bytes(be))
}

/// `numerator:i32, denominator:i32` rational.
pub fn decode_rational(bytes: &[u8]) -> DecodedValue {
    if bytes.len() < 8 {
        return raw(bytes);
    }
    DecodedValue::Rational {
        numerator: i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        denominator: i32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
    }
}

/// `major:u16, minor:u16` version pair.
pub fn decode_version(bytes: &[u8]) -> DecodedValue {
    if bytes.len() < 4 {
        return raw(bytes);
    }
    DecodedValue::Version {
        major: u16::from_be_bytes([bytes[0], bytes[1]]),
        minor: u16::from_be_bytes([bytes[2], bytes[3]]),
    }
}

/// 8-byte timestamp: `year:u16, month, day, hour, minute, second, fraction`.
pub fn decode_timestamp(bytes: &[u8]) -> DecodedValue {
    if bytes.len() < 8 {
        return raw(bytes);
    }
    DecodedValue::Timestamp {
        year: u16::from_be_bytes([bytes[0], bytes[1]]),
        month: bytes[2],
        day: bytes[3],
        hour: bytes[4],
        minute: bytes[5],
        second: bytes[6],
        fraction: bytes[7],
    }
}

/// Opaque bytes.
pub fn decode_bytes(bytes: &[u8]) -> DecodedValue {
    raw(bytes)
}
