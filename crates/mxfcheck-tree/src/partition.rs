//! Partition pack recognition and decoding.

use std::fmt;

use mxfcheck_klv::{full_name, full_name_masked, Klv};

/// Masked prototype of the partition pack key (bytes 7, 13 and 14 wild).
pub const PARTITION_PACK_UL: &str = "060e2b34.0205017f.0d010201.017f7f00";

/// Masked prototype of the primer pack key (byte 5 wild).
pub const PRIMER_PACK_UL: &str = "060e2b34.027f0101.0d010201.01050100";

/// Whether a packet key is a partition pack.
pub fn is_partition_pack(key: &[u8; 16]) -> bool {
    full_name_masked(key, &[7, 13, 14]) == PARTITION_PACK_UL
}

/// Whether a packet key is a primer pack.
pub fn is_primer_pack(key: &[u8; 16]) -> bool {
    full_name_masked(key, &[5]) == PRIMER_PACK_UL
}

/// The class of a partition, derived from the partition pack key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PartitionClass {
    Header,
    Body,
    GenericStream,
    Footer,
    Rip,
    #[default]
    Invalid,
}

impl PartitionClass {
    /// Derive the class from key byte 13, with the generic-stream variant
    /// flagged by key byte 14.
    pub fn from_key(key: &[u8; 16]) -> Self {
        match key[13] {
            0x02 => PartitionClass::Header,
            0x03 => {
                if key[14] == 0x11 {
                    PartitionClass::GenericStream
                } else {
                    PartitionClass::Body
                }
            }
            0x04 => PartitionClass::Footer,
            0x11 => PartitionClass::Rip,
            _ => PartitionClass::Invalid,
        }
    }

    /// The class string used in partition properties and queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionClass::Header => "header",
            PartitionClass::Body => "body",
            PartitionClass::GenericStream => "genericstreampartition",
            PartitionClass::Footer => "footer",
            PartitionClass::Rip => "rip",
            PartitionClass::Invalid => "invalid",
        }
    }
}

impl fmt::Display for PartitionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded partition pack with its fixed 64-byte layout, plus the derived
/// values the harness and tests consume.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Partition {
    /// Full UL of the partition pack key.
    pub signature: String,
    /// Decoded BER length of the pack value.
    pub partition_length: usize,
    pub major_version: u16,
    pub minor_version: u16,
    pub kag_size: u32,
    pub this_partition: u64,
    pub previous_partition: u64,
    pub footer_partition: u64,
    pub header_byte_count: u64,
    pub index_byte_count: u64,
    pub index_sid: u32,
    pub body_offset: u64,
    pub body_sid: u32,

    pub partition_class: PartitionClass,
    /// Set when the partition declares index table bytes.
    pub index_table: bool,
    /// Offset from the start of the pack at which header metadata begins.
    pub metadata_start: usize,
    /// Total bytes from the start of the pack to the end of metadata and
    /// index tables.
    pub total_header_length: usize,
}

/// Decode a partition pack packet.
///
/// Returns an `Invalid` partition with zeroed fields when the value is
/// shorter than the fixed 64-byte layout or the key does not carry a
/// header, body or footer class.
pub fn partition_extract(klv: &Klv) -> Partition {
    let mut pack = Partition::default();

    if klv.value.len() < 64 {
        return pack;
    }

    pack.partition_class = PartitionClass::from_key(&klv.key);
    match pack.partition_class {
        PartitionClass::Header
        | PartitionClass::Body
        | PartitionClass::GenericStream
        | PartitionClass::Footer => {}
        _ => {
            pack.partition_class = PartitionClass::Invalid;
            return pack;
        }
    }

    let v = &klv.value;
    pack.signature = full_name(&klv.key);
    pack.partition_length = klv.length_value();
    pack.major_version = u16::from_be_bytes([v[0], v[1]]);
    pack.minor_version = u16::from_be_bytes([v[2], v[3]]);
    pack.kag_size = u32::from_be_bytes([v[4], v[5], v[6], v[7]]);
    pack.this_partition = be_u64(&v[8..16]);
    pack.previous_partition = be_u64(&v[16..24]);
    pack.footer_partition = be_u64(&v[24..32]);
    pack.header_byte_count = be_u64(&v[32..40]);
    pack.index_byte_count = be_u64(&v[40..48]);
    pack.index_sid = u32::from_be_bytes([v[48], v[49], v[50], v[51]]);
    pack.body_offset = be_u64(&v[52..60]);
    pack.body_sid = u32::from_be_bytes([v[60], v[61], v[62], v[63]]);

    let kag = pack.kag_size as usize;
    let mut total = kag + pack.header_byte_count as usize + pack.index_byte_count as usize;
    pack.metadata_start = kag;

    if kag == 1 {
        let pack_length = klv.total_len();
        total += pack_length - kag;
        pack.metadata_start = pack_length;
    }

    pack.index_table = pack.index_byte_count > 0;
    pack.total_header_length = total;

    pack
}

fn be_u64(bytes: &[u8]) -> u64 {
    let mut be = [0u8; 8];
    be.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(be)
}

/// One entry of the random index pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rip {
    pub sid: u32,
    pub byte_offset: u64,
}
