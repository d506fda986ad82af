//! Decoded field values.

use uuid::Uuid;

/// The kind of link a reference field establishes between metadata objects.
///
/// Strong references are ownership links: the referenced object becomes a
/// child of the referrer. Weak references are labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Strong,
    Weak,
}

/// A decoded metadata field value.
///
/// Reference kinds are carried as explicit variants so reference extraction
/// is a plain match rather than any runtime type inspection.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum DecodedValue {
    Uuid(Uuid),
    Auid([u8; 16]),
    StrongRef([u8; 16]),
    StrongRefVector(Vec<[u8; 16]>),
    WeakRef([u8; 16]),
    WeakRefVector(Vec<[u8; 16]>),
    Utf16(String),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Rational {
        numerator: i32,
        denominator: i32,
    },
    Version {
        major: u16,
        minor: u16,
    },
    Timestamp {
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        fraction: u8,
    },
    /// Raw bytes for fields with no richer decoding, and the fallback for
    /// malformed input.
    Bytes(Vec<u8>),
}

impl DecodedValue {
    /// All raw 16-byte identifiers this value carries for the given
    /// reference kind. Non-reference values return nothing.
    pub fn references(&self, kind: RefKind) -> Vec<[u8; 16]> {
        match (kind, self) {
            (RefKind::Strong, DecodedValue::StrongRef(id)) => vec![*id],
            (RefKind::Strong, DecodedValue::StrongRefVector(ids)) => ids.clone(),
            (RefKind::Weak, DecodedValue::WeakRef(id)) => vec![*id],
            (RefKind::Weak, DecodedValue::WeakRefVector(ids)) => ids.clone(),
            _ => Vec::new(),
        }
    }
}
