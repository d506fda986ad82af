//! Helpers for synthesizing small MXF byte streams in memory.
#![allow(dead_code)]

use mxfcheck_registry::{decode, FieldDef, GroupDef, Registry, INSTANCE_ID_UL};

/// Wire key of the test parent group (local sets, 2-byte tags).
pub const PARENT_GROUP_KEY: [u8; 16] = [
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x01, 0x01, 0x77,
    0x01,
];
/// Registry (masked) form of the parent group UL.
pub const PARENT_GROUP_UL: &str = "060e2b34.027f0101.0d010101.01017701";

/// Wire key of the test child group.
pub const CHILD_GROUP_KEY: [u8; 16] = [
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x01, 0x01, 0x77,
    0x02,
];
pub const CHILD_GROUP_UL: &str = "060e2b34.027f0101.0d010101.01017702";

/// Field UL for the parent group's strong reference batch.
pub const CHILDREN_FIELD_UL: &str = "060e2b34.01010102.06010104.06090000";
/// Field UL for the parent group's weak reference label.
pub const LABEL_FIELD_UL: &str = "060e2b34.01010105.01020210.02010000";

/// Known essence key and its wildcard family form.
pub const ESSENCE_KEY: [u8; 16] = [
    0x06, 0x0e, 0x2b, 0x34, 0x01, 0x02, 0x01, 0x05, 0x0e, 0x09, 0x05, 0x02, 0x01, 0x01, 0x01,
    0x06,
];
pub const ESSENCE_FAMILY_UL: &str = "060e2b34.01020105.0e090502.017f017f";

/// Local tags resolved through the primer.
pub const INSTANCE_TAG: [u8; 2] = [0x3c, 0x0a];
pub const CHILDREN_TAG: [u8; 2] = [0x10, 0x01];
pub const LABEL_TAG: [u8; 2] = [0x10, 0x02];

/// A registry fake covering the two test groups and the essence family.
pub fn fake_registry() -> Registry {
    let mut registry = Registry::new();
    registry.add_group(
        PARENT_GROUP_UL,
        GroupDef {
            name: "ParentGroup".to_string(),
            fields: vec![
                FieldDef {
                    name: "InstanceID".to_string(),
                    ul: INSTANCE_ID_UL.to_string(),
                    decode: decode::decode_uuid,
                },
                FieldDef {
                    name: "Children".to_string(),
                    ul: CHILDREN_FIELD_UL.to_string(),
                    decode: decode::decode_strong_ref_batch,
                },
                FieldDef {
                    name: "Label".to_string(),
                    ul: LABEL_FIELD_UL.to_string(),
                    decode: decode::decode_weak_ref,
                },
            ],
        },
    );
    registry.add_group(
        CHILD_GROUP_UL,
        GroupDef {
            name: "ChildGroup".to_string(),
            fields: vec![FieldDef {
                name: "InstanceID".to_string(),
                ul: INSTANCE_ID_UL.to_string(),
                decode: decode::decode_uuid,
            }],
        },
    );
    registry.add_essence(ESSENCE_FAMILY_UL);
    registry
}

/// Frame a value as a KLV packet with a short or long BER length.
pub fn klv_bytes(key: [u8; 16], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + 3 + value.len());
    out.extend_from_slice(&key);
    if value.len() < 0x80 {
        out.push(value.len() as u8);
    } else {
        out.push(0x82);
        out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    }
    out.extend_from_slice(value);
    out
}

/// A partition pack packet. `class` is key byte 13, `byte14` key byte 14.
pub fn partition_pack(class: u8, byte14: u8, header_byte_count: u64, index_byte_count: u64) -> Vec<u8> {
    let key = [
        0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, class,
        byte14, 0x00,
    ];
    let mut value = vec![0u8; 64];
    value[0..2].copy_from_slice(&1u16.to_be_bytes());
    value[4..8].copy_from_slice(&512u32.to_be_bytes());
    value[32..40].copy_from_slice(&header_byte_count.to_be_bytes());
    value[40..48].copy_from_slice(&index_byte_count.to_be_bytes());
    klv_bytes(key, &value)
}

/// The primer pack mapping the test tags to their field ULs.
pub fn primer_pack() -> Vec<u8> {
    let key = [
        0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x05, 0x01,
        0x00,
    ];

    let entries: [([u8; 2], &str); 3] = [
        (INSTANCE_TAG, INSTANCE_ID_UL),
        (CHILDREN_TAG, CHILDREN_FIELD_UL),
        (LABEL_TAG, LABEL_FIELD_UL),
    ];

    let mut value = Vec::new();
    value.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    value.extend_from_slice(&18u32.to_be_bytes());
    for (tag, ul) in entries {
        value.extend_from_slice(&tag);
        value.extend_from_slice(&ul_bytes(ul));
    }
    klv_bytes(key, &value)
}

/// Parse a dotted UL string back into bytes.
pub fn ul_bytes(ul: &str) -> [u8; 16] {
    let hex: String = ul.chars().filter(|c| *c != '.').collect();
    let mut out = [0u8; 16];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).expect("valid hex");
    }
    out
}

/// One local item in 2-byte tag, 2-byte length form.
pub fn local_item(tag: [u8; 2], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + value.len());
    out.extend_from_slice(&tag);
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
    out
}

/// A strong reference batch of the given instance IDs.
pub fn ref_batch(ids: &[[u8; 16]]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(ids.len() as u32).to_be_bytes());
    out.extend_from_slice(&16u32.to_be_bytes());
    for id in ids {
        out.extend_from_slice(id);
    }
    out
}

/// A parent group packet holding its instance ID, children refs and label.
pub fn parent_group(id: [u8; 16], children: &[[u8; 16]], label: Option<[u8; 16]>) -> Vec<u8> {
    let mut value = Vec::new();
    value.extend_from_slice(&local_item(INSTANCE_TAG, &id));
    value.extend_from_slice(&local_item(CHILDREN_TAG, &ref_batch(children)));
    if let Some(label) = label {
        value.extend_from_slice(&local_item(LABEL_TAG, &label));
    }
    klv_bytes(PARENT_GROUP_KEY, &value)
}

/// A child group packet holding only its instance ID.
pub fn child_group(id: [u8; 16]) -> Vec<u8> {
    klv_bytes(CHILD_GROUP_KEY, &local_item(INSTANCE_TAG, &id))
}

/// A header partition followed by primer, one parent and two children.
pub fn header_with_graph() -> Vec<u8> {
    let id_parent = [0xaa; 16];
    let id_b = [0xbb; 16];
    let id_c = [0xcc; 16];

    let mut metadata = primer_pack();
    metadata.extend(parent_group(id_parent, &[id_b, id_c], Some([0x11; 16])));
    metadata.extend(child_group(id_b));
    metadata.extend(child_group(id_c));

    let mut file = partition_pack(0x02, 0x00, metadata.len() as u64, 0);
    file.extend(metadata);
    file
}

/// `count` essence packets with the given final key byte variants.
pub fn essence_packets(variants: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for &variant in variants {
        let mut key = ESSENCE_KEY;
        key[15] = variant;
        out.extend(klv_bytes(key, b"<r>data</r>"));
    }
    out
}
