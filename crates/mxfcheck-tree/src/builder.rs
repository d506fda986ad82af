//! Structural tree builder.
//!
//! Two cooperating tasks: the packet reader runs on a blocking task feeding
//! a bounded channel, and the builder consumes it here, decoding partition
//! packs, stitching the header metadata forest through a partition scoped
//! primer and the injected registry, and sniffing essence payloads. On a
//! builder error the channel is drained so the reader always terminates.
//!
//! Unknown group or field ULs are not fatal: the registry is incomplete by
//! design and undecodable items are skipped with a trace.

use std::collections::HashMap;
use std::io::Read;
use std::mem;
use std::rc::Rc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use mxfcheck_klv::{ber_decode, full_name, full_name_masked, stream_klv, Klv};
use mxfcheck_registry::{DecodedValue, RefKind, Registry, INSTANCE_ID_UL};

use crate::error::{Result, TreeError};
use crate::node::{
    EssenceProperties, GroupProperties, MxfNode, Node, NodeParent, NodeRef, PartitionNode,
    PartitionProperties, Position, Primer, Properties, TestBundle,
};
use crate::partition::{is_partition_pack, is_primer_pack, partition_extract, PartitionClass};
use crate::sniff::sniff;
use crate::spec::MergedSpecification;

/// How local item keys are encoded inside a metadata packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocalKeyKind {
    /// 16-byte full UL.
    FullUl,
    /// 1-byte tag, rendered as two hex digits.
    OneByte,
    /// 2-byte tag, rendered as four hex digits and resolved via the primer.
    TwoByte,
}

/// How local item lengths are encoded inside a metadata packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocalLenKind {
    /// BER within an 8-byte window.
    Ber8,
    /// Big-endian u16.
    BigEndian2,
}

/// Per-packet local item decoder, chosen from key byte 5.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LocalDecoder {
    pub key_kind: LocalKeyKind,
    pub len_kind: LocalLenKind,
}

/// Derive the local decoder from packet key byte 5, split into a length
/// nibble and a key nibble. Unknown combinations return `None` and the
/// packet's locals are not parsed.
pub(crate) fn decode_builder(byte: u8) -> Option<LocalDecoder> {
    let len_nibble = byte >> 4;
    let key_nibble = byte & 0x0f;

    let len_kind = match len_nibble {
        0 | 1 => LocalLenKind::Ber8,
        4 | 5 => LocalLenKind::BigEndian2,
        _ => return None,
    };

    let key_kind = match (len_nibble % 2) + key_nibble {
        0 | 1 | 2 | 0x0b => LocalKeyKind::FullUl,
        3 => LocalKeyKind::OneByte,
        4 => LocalKeyKind::TwoByte,
        // 0xC is reserved
        _ => return None,
    };

    Some(LocalDecoder { key_kind, len_kind })
}

/// Read a local key at the start of `bytes`, returning its hex or UL form
/// and the bytes consumed.
pub(crate) fn read_local_key(kind: LocalKeyKind, bytes: &[u8]) -> Option<(String, usize)> {
    match kind {
        LocalKeyKind::FullUl => {
            if bytes.len() < 16 {
                return None;
            }
            Some((full_name(&bytes[..16]), 16))
        }
        LocalKeyKind::OneByte => bytes.first().map(|b| (format!("{b:02x}"), 1)),
        LocalKeyKind::TwoByte => {
            if bytes.len() < 2 {
                return None;
            }
            Some((format!("{:02x}{:02x}", bytes[0], bytes[1]), 2))
        }
    }
}

/// Read a local length at the start of `bytes`, returning the value length
/// and the bytes consumed.
pub(crate) fn read_local_len(kind: LocalLenKind, bytes: &[u8]) -> Option<(usize, usize)> {
    match kind {
        LocalLenKind::Ber8 => {
            let window = &bytes[..bytes.len().min(8)];
            ber_decode(window)
        }
        LocalLenKind::BigEndian2 => {
            if bytes.len() < 2 {
                return None;
            }
            Some((u16::from_be_bytes([bytes[0], bytes[1]]) as usize, 2))
        }
    }
}

/// Unpack a primer pack value into the tag to UL table.
///
/// Layout: `count:u32, entry_length:u32`, then `count` entries of a 2-byte
/// local tag followed by a 16-byte UL, with `entry_length` stride.
pub(crate) fn primer_unpack(value: &[u8]) -> Primer {
    let mut out = HashMap::new();
    if value.len() < 8 {
        return out;
    }

    let count = u32::from_be_bytes([value[0], value[1], value[2], value[3]]);
    let stride = u32::from_be_bytes([value[4], value[5], value[6], value[7]]) as usize;
    if stride < 18 {
        warn!(%stride, "primer entry length too small, ignoring primer");
        return out;
    }

    let mut offset = 8;
    for _ in 0..count {
        if offset + 18 > value.len() {
            warn!("primer pack truncated, keeping the entries read so far");
            break;
        }
        let tag = format!("{:02x}{:02x}", value[offset], value[offset + 1]);
        out.insert(tag, full_name(&value[offset + 2..offset + 18]));
        offset += stride;
    }
    out
}

/// A metadata node still under construction.
#[derive(Default)]
struct PendingNode {
    key: Position,
    length: Position,
    value: Position,
    properties: GroupProperties,
    child_refs: Vec<[u8; 16]>,
    test_handles: Vec<usize>,
    tag_handles: Vec<usize>,
    is_child: bool,
}

/// A partition still under construction.
struct PendingPartition {
    key: Position,
    length: Position,
    value: Position,
    class: PartitionClass,
    partition_index: usize,
    primer: Rc<Primer>,
    essence_order: Vec<String>,
    pattern_tally: bool,
    nodes: Vec<PendingNode>,
    id_map: HashMap<[u8; 16], usize>,
    index_table: Option<NodeRef>,
    essence: Vec<NodeRef>,
    test_handles: Vec<usize>,
    tag_handles: Vec<usize>,
}

impl PendingPartition {
    fn new(
        klv: &Klv,
        offset: usize,
        partition_index: usize,
        primer: Rc<Primer>,
        specs: &MergedSpecification,
    ) -> Self {
        let class = PartitionClass::from_key(&klv.key);
        let spec_key = match class {
            // footers run the header-class test list
            PartitionClass::Header | PartitionClass::Footer => Some("header"),
            PartitionClass::Body => Some("essence"),
            PartitionClass::GenericStream => Some("generickey"),
            PartitionClass::Rip | PartitionClass::Invalid => None,
        };
        let handles = |index: &HashMap<&'static str, Vec<usize>>| {
            spec_key
                .and_then(|k| index.get(k))
                .cloned()
                .unwrap_or_default()
        };

        Self {
            key: Position::new(offset, offset + klv.key.len()),
            length: Position::new(offset + klv.key.len(), offset + klv.key.len() + klv.length.len()),
            value: Position::new(
                offset + klv.key.len() + klv.length.len(),
                offset + klv.total_len(),
            ),
            class,
            partition_index,
            primer,
            essence_order: Vec::new(),
            pattern_tally: true,
            nodes: Vec::new(),
            id_map: HashMap::new(),
            index_table: None,
            essence: Vec::new(),
            test_handles: handles(&specs.part_test_index),
            tag_handles: handles(&specs.part_tag_index),
        }
    }

    /// Track the repeating essence key pattern. The pattern extends while
    /// the tally holds and closes when the head key reappears.
    fn track_essence_order(&mut self, name: &str) {
        if self.essence_order.is_empty() {
            self.essence_order.push(name.to_string());
        } else if self.essence_order[0] == name {
            self.pattern_tally = false;
        } else if self.pattern_tally {
            self.essence_order.push(name.to_string());
        }
    }

    /// Stitch the metadata forest and freeze the partition.
    fn finish(mut self) -> Rc<PartitionNode> {
        // resolve strong references to node indices, marking children
        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for i in 0..self.nodes.len() {
            let refs = mem::take(&mut self.nodes[i].child_refs);
            for reference in refs {
                match self.id_map.get(&reference) {
                    Some(&child) => {
                        children_of[i].push(child);
                        self.nodes[child].is_child = true;
                    }
                    None => debug!(
                        reference = %full_name(&reference),
                        "strong reference to an unknown instance, skipping"
                    ),
                }
            }
        }

        // partition level roots are the nodes nothing referenced, in file
        // order
        let mut roots: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| !self.nodes[i].is_child)
            .collect();
        roots.sort_by_key(|&i| self.nodes[i].key.start);

        let mut built: Vec<Option<NodeRef>> = vec![None; self.nodes.len()];
        let mut building = vec![false; self.nodes.len()];
        let header_metadata: Vec<NodeRef> = roots
            .into_iter()
            .map(|i| freeze_node(i, &mut self.nodes, &children_of, &mut built, &mut building))
            .collect();

        let partition = Rc::new(PartitionNode {
            key: self.key,
            length: self.length,
            value: self.value,
            header_metadata,
            essence: self.essence,
            index_table: self.index_table,
            props: PartitionProperties {
                partition_index: self.partition_index,
                partition_class: self.class,
                primer: self.primer,
                essence_order: self.essence_order,
            },
            tests: TestBundle::with_attached(self.test_handles),
            tags: TestBundle::with_attached(self.tag_handles),
            partition_index: self.partition_index,
            parent: std::cell::RefCell::new(std::rc::Weak::new()),
        });

        for root in &partition.header_metadata {
            *root.parent.borrow_mut() = NodeParent::Partition(Rc::downgrade(&partition));
        }
        for essence in &partition.essence {
            *essence.parent.borrow_mut() = NodeParent::Partition(Rc::downgrade(&partition));
        }
        if let Some(index) = &partition.index_table {
            *index.parent.borrow_mut() = NodeParent::Partition(Rc::downgrade(&partition));
        }

        partition
    }
}

/// Freeze one pending node and, recursively, the subtree it references.
/// Reference cycles are broken at the second visit; shared children keep a
/// single allocation.
fn freeze_node(
    index: usize,
    nodes: &mut Vec<PendingNode>,
    children_of: &[Vec<usize>],
    built: &mut Vec<Option<NodeRef>>,
    building: &mut Vec<bool>,
) -> NodeRef {
    if let Some(node) = &built[index] {
        return node.clone();
    }

    building[index] = true;
    let mut children = Vec::with_capacity(children_of[index].len());
    for &child in &children_of[index] {
        if building[child] {
            warn!("reference cycle in header metadata, dropping the back edge");
            continue;
        }
        children.push(freeze_node(child, nodes, children_of, built, building));
    }
    building[index] = false;

    let pending = mem::take(&mut nodes[index]);
    let node = Rc::new(Node {
        key: pending.key,
        length: pending.length,
        value: pending.value,
        properties: Properties::Group(pending.properties),
        children,
        sniffs: HashMap::new(),
        tests: TestBundle::with_attached(pending.test_handles),
        tags: TestBundle::with_attached(pending.tag_handles),
        parent: std::cell::RefCell::new(NodeParent::None),
    });

    for child in &node.children {
        *child.parent.borrow_mut() = NodeParent::Node(Rc::downgrade(&node));
    }

    built[index] = Some(node.clone());
    node
}

fn positions(klv: &Klv, offset: usize) -> (Position, Position, Position) {
    let key_end = offset + klv.key.len();
    let len_end = key_end + klv.length.len();
    (
        Position::new(offset, key_end),
        Position::new(key_end, len_end),
        Position::new(len_end, offset + klv.total_len()),
    )
}

/// Build the structural tree of an MXF byte stream.
///
/// The packet reader runs on a blocking task producing into a bounded
/// channel of `capacity`; the tree is assembled here as the consumer. The
/// stream is returned alongside the tree so callers can re-read node
/// values. A reader error takes precedence over a builder error, matching
/// error-group semantics.
pub async fn build_tree<R>(
    mut doc: R,
    capacity: usize,
    specs: &MergedSpecification,
    registry: &Registry,
) -> Result<(Rc<MxfNode>, R)>
where
    R: Read + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Klv>(capacity.max(1));

    let producer = tokio::task::spawn_blocking(move || {
        let result = stream_klv(&mut doc, &tx);
        (doc, result)
    });

    let built = build_partitions(&mut rx, specs, registry).await;
    if built.is_err() {
        // drain so the producer can always finish
        while rx.recv().await.is_some() {}
    }

    let (doc, read_result) = producer
        .await
        .map_err(|e| TreeError::ReaderTask(e.to_string()))?;
    read_result?;
    let mxf = built?;

    Ok((mxf, doc))
}

async fn build_partitions(
    rx: &mut mpsc::Receiver<Klv>,
    specs: &MergedSpecification,
    registry: &Registry,
) -> Result<Rc<MxfNode>> {
    let mut offset = 0usize;
    let mut current_primer: Rc<Primer> = Rc::new(HashMap::new());
    let mut current: Option<PendingPartition> = None;
    let mut partitions: Vec<Rc<PartitionNode>> = Vec::new();

    while let Some(item) = rx.recv().await {
        if is_partition_pack(&item.key) {
            if let Some(done) = current.take() {
                partitions.push(done.finish());
            }

            let layout = partition_extract(&item);
            let mut partition = PendingPartition::new(
                &item,
                offset,
                partitions.len(),
                current_primer.clone(),
                specs,
            );
            offset += item.total_len();

            let mut metadata_bytes = 0usize;
            while metadata_bytes < layout.header_byte_count as usize {
                let metadata = rx
                    .recv()
                    .await
                    .ok_or(TreeError::Interrupted("reading header metadata"))?;
                extract_metadata(
                    &metadata,
                    offset,
                    &mut partition,
                    &mut current_primer,
                    specs,
                    registry,
                );
                offset += metadata.total_len();
                metadata_bytes += metadata.total_len();
            }

            if layout.index_table {
                // the index table sits straight after the metadata
                let index = rx
                    .recv()
                    .await
                    .ok_or(TreeError::Interrupted("reading the index table"))?;
                let (key, length, value) = positions(&index, offset);
                partition.index_table = Some(Rc::new(Node {
                    key,
                    length,
                    value,
                    properties: Properties::default(),
                    children: Vec::new(),
                    sniffs: HashMap::new(),
                    tests: TestBundle::default(),
                    tags: TestBundle::default(),
                    parent: std::cell::RefCell::new(NodeParent::None),
                }));
                offset += index.total_len();
            }

            current = Some(partition);
        } else {
            let Some(partition) = current.as_mut() else {
                return Err(TreeError::InvalidStructure(
                    "essence encountered before any partitions".to_string(),
                ));
            };

            let essence = extract_essence(&item, offset, partition, specs, registry);
            partition.essence.push(essence);
            offset += item.total_len();
        }
    }

    if let Some(done) = current.take() {
        partitions.push(done.finish());
    }

    if offset == 0 {
        return Err(TreeError::NoDataFound);
    }

    let mxf = Rc::new(MxfNode {
        partitions,
        tests: TestBundle::with_attached((0..specs.structure_tests.len()).collect()),
        tags: TestBundle::with_attached((0..specs.structure_tags.len()).collect()),
    });
    for partition in &mxf.partitions {
        *partition.parent.borrow_mut() = Rc::downgrade(&mxf);
    }

    Ok(mxf)
}

/// Decode one header metadata packet into a pending node.
fn extract_metadata(
    klv: &Klv,
    offset: usize,
    partition: &mut PendingPartition,
    current_primer: &mut Rc<Primer>,
    specs: &MergedSpecification,
    registry: &Registry,
) {
    let (key, length, value) = positions(klv, offset);
    let mut pending = PendingNode {
        key,
        length,
        value,
        ..PendingNode::default()
    };

    let Some(decoder) = decode_builder(klv.key[5]) else {
        if is_primer_pack(&klv.key) {
            *current_primer = Rc::new(primer_unpack(&klv.value));
            partition.primer = current_primer.clone();
            pending.properties.universal_label = crate::partition::PRIMER_PACK_UL.to_string();
        } else {
            debug!(
                key = %full_name(&klv.key),
                encoding = %klv.key[5],
                "unknown local encoding, not parsing locals"
            );
            pending.properties.universal_label = full_name(&klv.key);
        }
        partition.nodes.push(pending);
        return;
    };

    // group lookup with progressive wildcard masking; the node records the
    // masked form that matched
    let mut lookup = full_name(&klv.key);
    let mut group = registry.group(&lookup);
    if group.is_none() {
        lookup = full_name_masked(&klv.key, &[5]);
        group = registry.group(&lookup);
    }
    if group.is_none() {
        lookup = full_name_masked(&klv.key, &[5, 13]);
        group = registry.group(&lookup);
    }

    pending.properties.universal_label = lookup.clone();
    if group.is_some() {
        if let Some(handles) = specs.node_test_index.get(&lookup) {
            pending.test_handles = handles.clone();
        }
        if let Some(handles) = specs.node_tag_index.get(&lookup) {
            pending.tag_handles = handles.clone();
        }
    }

    let data = &klv.value;
    let mut pos = 0usize;
    while pos < data.len() {
        let Some((raw_key, key_len)) = read_local_key(decoder.key_kind, &data[pos..]) else {
            warn!("truncated local item key, abandoning the rest of the packet");
            break;
        };
        let Some((value_len, len_len)) = read_local_len(decoder.len_kind, &data[pos + key_len..])
        else {
            warn!("truncated local item length, abandoning the rest of the packet");
            break;
        };

        let local_key = if key_len != 16 {
            current_primer.get(&raw_key).cloned().unwrap_or_default()
        } else {
            raw_key
        };

        let value_start = pos + key_len + len_len;
        let value_end = value_start + value_len;
        if value_end > data.len() {
            warn!("local item value runs past the packet, abandoning the rest");
            break;
        }
        let item = &data[value_start..value_end];

        if local_key == INSTANCE_ID_UL {
            if let DecodedValue::Uuid(id) = mxfcheck_registry::decode::decode_uuid(item) {
                pending.properties.instance_id = Some(id);
                partition
                    .id_map
                    .insert(*id.as_bytes(), partition.nodes.len());
            }
        } else if let Some(group) = group {
            if let Some(field) = group.field(&local_key) {
                let decoded = (field.decode)(item);
                let strong = decoded.references(RefKind::Strong);
                if !strong.is_empty() {
                    pending.child_refs.extend(strong);
                } else {
                    let weak = decoded.references(RefKind::Weak);
                    if !weak.is_empty() {
                        pending.properties.group_labels =
                            weak.iter().map(|w| full_name(w)).collect();
                    }
                }
            }
        }

        pos += key_len + len_len + value_len;
    }

    partition.nodes.push(pending);
}

/// Build an essence node, applying wildcard masking against the registry's
/// essence lookup and feeding the partition's essence order pattern.
fn extract_essence(
    klv: &Klv,
    offset: usize,
    partition: &mut PendingPartition,
    specs: &MergedSpecification,
    registry: &Registry,
) -> NodeRef {
    let raw_name = full_name(&klv.key);
    partition.track_essence_order(&raw_name);

    let mut name = raw_name;
    if !registry.is_essence(&name) {
        let masked_15 = full_name_masked(&klv.key, &[15]);
        if registry.is_essence(&masked_15) {
            name = masked_15;
        } else {
            let masked_13_15 = full_name_masked(&klv.key, &[13, 15]);
            if registry.is_essence(&masked_13_15) {
                name = masked_13_15;
            }
        }
    }

    let (key, length, value) = positions(klv, offset);
    Rc::new(Node {
        key,
        length,
        value,
        properties: Properties::Essence(EssenceProperties { essence_ul: name }),
        children: Vec::new(),
        sniffs: sniff(&klv.value, &specs.sniffers),
        tests: TestBundle::default(),
        tags: TestBundle::default(),
        parent: std::cell::RefCell::new(NodeParent::None),
    })
}
