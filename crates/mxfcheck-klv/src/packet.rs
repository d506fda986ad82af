//! KLV packet type and BER length decoding.

/// One KLV triplet read from the stream.
///
/// The raw length bytes are kept so that byte positions in the source can be
/// reconstructed exactly; packets are immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Klv {
    /// 16-byte universal label key.
    pub key: [u8; 16],
    /// Raw BER length bytes as they appeared on the wire.
    pub length: Vec<u8>,
    /// Value bytes.
    pub value: Vec<u8>,
}

impl Klv {
    /// Total encoded size of the packet: key + length bytes + value bytes.
    pub fn total_len(&self) -> usize {
        self.key.len() + self.length.len() + self.value.len()
    }

    /// The decoded value length carried by the BER length field.
    pub fn length_value(&self) -> usize {
        ber_decode(&self.length).map(|(len, _)| len).unwrap_or(0)
    }
}

/// Decode a BER length at the start of `bytes`.
///
/// Short form is a single byte 0-127; long form is `0x80 | n` followed by
/// `n` big-endian bytes of length. Returns `(length, bytes_consumed)` or
/// `None` when the slice is too short or the long form is wider than 8
/// bytes.
pub fn ber_decode(bytes: &[u8]) -> Option<(usize, usize)> {
    let first = *bytes.first()?;

    if first < 0x80 {
        return Some((first as usize, 1));
    }

    let count = (first & 0x7f) as usize;
    if count > 8 || bytes.len() < 1 + count {
        return None;
    }

    let mut out = [0u8; 8];
    out[8 - count..].copy_from_slice(&bytes[1..1 + count]);
    Some((u64::from_be_bytes(out) as usize, 1 + count))
}
