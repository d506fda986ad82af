//! Whole-group decoding for test callbacks.
//!
//! Tests hold only byte positions; when one needs a node's value it
//! re-reads the slice from the source with [`node_to_klv`] and decodes it
//! against the registry. Unknown fields are skipped, the registry being
//! incomplete by design.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

use mxfcheck_klv::{full_name, full_name_masked, Klv};
use mxfcheck_registry::{DecodedValue, Registry};

use crate::builder::{decode_builder, read_local_key, read_local_len};
use crate::error::{DecodeError, Result};
use crate::node::{Node, Primer};
use crate::spec::ReadSeek;

/// Re-read a node's KLV triplet from the source stream.
pub fn node_to_klv(stream: &mut dyn ReadSeek, node: &Node) -> Result<Klv> {
    stream.seek(SeekFrom::Start(node.key.start as u64))?;

    let mut key = [0u8; 16];
    stream.read_exact(&mut key)?;

    let mut length = vec![0u8; node.length.len()];
    stream.read_exact(&mut length)?;

    let mut value = vec![0u8; node.value.len()];
    stream.read_exact(&mut value)?;

    Ok(Klv { key, length, value })
}

/// Re-read a partition's pack KLV from the source stream.
pub fn partition_to_klv(
    stream: &mut dyn ReadSeek,
    partition: &crate::node::PartitionNode,
) -> Result<Klv> {
    stream.seek(SeekFrom::Start(partition.key.start as u64))?;

    let mut key = [0u8; 16];
    stream.read_exact(&mut key)?;

    let mut length = vec![0u8; partition.length.len()];
    stream.read_exact(&mut length)?;

    let mut value = vec![0u8; partition.value.len()];
    stream.read_exact(&mut value)?;

    Ok(Klv { key, length, value })
}

/// Decode a group KLV into a map of field name to decoded value.
///
/// Local tags are resolved through `primer`; fields the registry does not
/// know are skipped. Fails when the packet's local encoding byte is
/// unknown or no group matches the key after wildcard masking.
pub fn decode_group(
    group: &Klv,
    primer: &Primer,
    registry: &Registry,
) -> std::result::Result<HashMap<String, DecodedValue>, DecodeError> {
    let decoder =
        decode_builder(group.key[5]).ok_or(DecodeError::UnknownEncoding(group.key[5]))?;

    let def = registry
        .group(&full_name(&group.key))
        .or_else(|| registry.group(&full_name_masked(&group.key, &[5])))
        .or_else(|| registry.group(&full_name_masked(&group.key, &[5, 13])))
        .ok_or_else(|| DecodeError::UnknownGroup(full_name(&group.key)))?;

    let data = &group.value;
    let mut out = HashMap::new();
    let mut pos = 0usize;

    while pos < data.len() {
        let Some((raw_key, key_len)) = read_local_key(decoder.key_kind, &data[pos..]) else {
            break;
        };
        let Some((value_len, len_len)) = read_local_len(decoder.len_kind, &data[pos + key_len..])
        else {
            break;
        };

        let local_key = if key_len != 16 {
            primer.get(&raw_key).cloned().unwrap_or_default()
        } else {
            raw_key
        };

        let value_start = pos + key_len + len_len;
        let value_end = value_start + value_len;
        if value_end > data.len() {
            break;
        }

        if let Some(field) = def.field(&local_key) {
            out.insert(field.name.clone(), (field.decode)(&data[value_start..value_end]));
        }

        pos += key_len + len_len + value_len;
    }

    Ok(out)
}

/// Re-read a node from the source and decode it as a group.
pub fn decode_group_node(
    stream: &mut dyn ReadSeek,
    node: &Node,
    primer: &Primer,
    registry: &Registry,
) -> Result<HashMap<String, DecodedValue>> {
    let klv = node_to_klv(stream, node)?;
    decode_group(&klv, primer, registry).map_err(Into::into)
}
