//! Tree building against synthesized MXF streams.

mod common;

use std::io::Cursor;
use std::sync::Arc;

use common::*;
use mxfcheck_klv::KlvError;
use mxfcheck_tree::{
    build_tree, new_specification, with_sniff_test, DataIdentifier, MergedSpecification,
    PartitionClass, SniffTest, TreeError, CONTENT_TYPE_KEY,
};

fn empty_merged() -> MergedSpecification {
    MergedSpecification::merge([new_specification(vec![])])
}

#[tokio::test]
async fn header_only_file_yields_one_empty_partition() {
    let file = partition_pack(0x02, 0x00, 0, 0);
    let total = file.len();

    let (mxf, _) = build_tree(Cursor::new(file), 10, &empty_merged(), &fake_registry())
        .await
        .unwrap();

    assert_eq!(mxf.partitions.len(), 1);
    let partition = &mxf.partitions[0];
    assert_eq!(partition.props.partition_class, PartitionClass::Header);
    assert!(partition.header_metadata.is_empty());
    assert!(partition.essence.is_empty());
    assert!(partition.index_table.is_none());

    // the partition covers the whole pack, key then length then value
    assert_eq!(partition.key.start, 0);
    assert_eq!(partition.key.end, 16);
    assert_eq!(partition.length.end, 17);
    assert_eq!(partition.value.end, total);
}

#[tokio::test]
async fn metadata_graph_is_stitched_through_instance_ids() {
    let file = header_with_graph();

    let (mxf, _) = build_tree(Cursor::new(file), 10, &empty_merged(), &fake_registry())
        .await
        .unwrap();

    let partition = &mxf.partitions[0];
    // roots in file order: the primer node, then the parent group
    assert_eq!(partition.header_metadata.len(), 2);
    let primer_node = &partition.header_metadata[0];
    let parent = &partition.header_metadata[1];

    assert_eq!(primer_node.ul(), "060e2b34.027f0101.0d010201.01050100");
    assert_eq!(parent.ul(), PARENT_GROUP_UL);
    assert_eq!(parent.id(), "aa".repeat(16));

    // strong references became children, in registration order
    assert_eq!(parent.children.len(), 2);
    assert_eq!(parent.children[0].id(), "bb".repeat(16));
    assert_eq!(parent.children[1].id(), "cc".repeat(16));
    assert_eq!(parent.children[0].ul(), CHILD_GROUP_UL);

    // the weak reference became a group label
    assert_eq!(
        parent.properties.label(),
        vec!["11111111.11111111.11111111.11111111".to_string()]
    );

    // the primer was recorded on the partition
    assert_eq!(partition.props.primer.len(), 3);
    assert_eq!(
        partition.props.primer["3c0a"],
        "060e2b34.01010101.01011502.00000000"
    );
}

#[tokio::test]
async fn node_positions_partition_the_consumed_stream() {
    let mut file = header_with_graph();
    file.extend(partition_pack(0x03, 0x00, 0, 0));
    file.extend(essence_packets(&[0x01, 0x02]));

    let (mxf, _) = build_tree(
        Cursor::new(file.clone()),
        10,
        &empty_merged(),
        &fake_registry(),
    )
    .await
    .unwrap();

    // walk every position in reading order; they must tile the stream
    let mut cursor = 0usize;
    for partition in &mxf.partitions {
        assert_eq!(partition.key.start, cursor);
        assert_eq!(partition.key.end, partition.length.start);
        assert_eq!(partition.length.end, partition.value.start);
        cursor = partition.value.end;

        for node in &partition.header_metadata {
            assert_eq!(node.key.start, cursor);
            assert_eq!(node.key.end, node.length.start);
            assert_eq!(node.length.end, node.value.start);
            cursor = node.value.end;
        }
        for node in &partition.essence {
            assert_eq!(node.key.start, cursor);
            cursor = node.value.end;
        }
    }
    assert_eq!(cursor, file.len());
}

#[tokio::test]
async fn essence_is_masked_and_pattern_tracked() {
    let mut file = header_with_graph();
    file.extend(partition_pack(0x03, 0x00, 0, 0));
    // pattern a b a b a: two distinct keys repeating
    file.extend(essence_packets(&[0x01, 0x02, 0x01, 0x02, 0x01]));

    let (mxf, _) = build_tree(Cursor::new(file), 10, &empty_merged(), &fake_registry())
        .await
        .unwrap();

    let body = &mxf.partitions[1];
    assert_eq!(body.props.partition_class, PartitionClass::Body);
    assert_eq!(body.essence.len(), 5);

    // both keys resolve to the wildcard family form
    for essence in &body.essence {
        assert_eq!(essence.ul(), ESSENCE_FAMILY_UL);
        assert_eq!(essence.properties.label(), vec!["essence".to_string()]);
    }

    // the order pattern keeps the raw, unmasked names
    assert_eq!(
        body.props.essence_order,
        vec![
            "060e2b34.01020105.0e090502.01010101".to_string(),
            "060e2b34.01020105.0e090502.01010102".to_string(),
        ]
    );
}

#[tokio::test]
async fn essence_is_sniffed_during_the_build() {
    let mut file = header_with_graph();
    file.extend(partition_pack(0x03, 0x00, 0, 0));
    file.extend(essence_packets(&[0x01]));

    let spec = new_specification(vec![with_sniff_test(SniffTest {
        data_id: DataIdentifier {
            content_type: "text/xml".into(),
            data_fn: Arc::new(|data| data.starts_with(b"<")),
        },
        sniffs: vec![],
    })]);
    let merged = MergedSpecification::merge([spec]);

    let (mxf, _) = build_tree(Cursor::new(file), 10, &merged, &fake_registry())
        .await
        .unwrap();

    let essence = &mxf.partitions[1].essence[0];
    assert_eq!(essence.sniffs[CONTENT_TYPE_KEY].field, "text/xml");

    // the sniff is queryable through the partition table
    let found = mxf.partitions[1]
        .search("select * from essence where sniff:ContentType = text/xml")
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn unknown_groups_still_record_instance_ids() {
    // a 53-coded group the registry has never heard of
    let unknown_key = [
        0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x01, 0x01, 0x99,
        0x99,
    ];
    let mut metadata = primer_pack();
    metadata.extend(klv_bytes(unknown_key, &local_item(INSTANCE_TAG, &[0xdd; 16])));

    let mut file = partition_pack(0x02, 0x00, metadata.len() as u64, 0);
    file.extend(metadata);

    let (mxf, _) = build_tree(Cursor::new(file), 10, &empty_merged(), &fake_registry())
        .await
        .unwrap();

    let node = &mxf.partitions[0].header_metadata[1];
    // both wildcard lookups failed, so the fully masked form is recorded
    assert_eq!(node.ul(), "060e2b34.027f0101.0d010101.017f9999");
    assert_eq!(node.id(), "dd".repeat(16));
}

#[tokio::test]
async fn index_table_is_attached_to_the_partition() {
    let index_value = vec![0u8; 32];
    let index_key = [
        0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x10, 0x01,
        0x00,
    ];
    let index = klv_bytes(index_key, &index_value);

    let mut file = partition_pack(0x02, 0x00, 0, index.len() as u64);
    file.extend(index);

    let (mxf, _) = build_tree(Cursor::new(file), 10, &empty_merged(), &fake_registry())
        .await
        .unwrap();

    let partition = &mxf.partitions[0];
    let index_node = partition.index_table.as_ref().expect("index table node");
    assert_eq!(index_node.key.start, 81);
    assert!(partition.essence.is_empty());
}

#[tokio::test]
async fn empty_stream_errors() {
    let err = build_tree(Cursor::new(vec![]), 10, &empty_merged(), &fake_registry())
        .await
        .unwrap_err();
    assert!(matches!(err, TreeError::Klv(KlvError::EmptyStream)));
}

#[tokio::test]
async fn truncated_stream_errors() {
    let err = build_tree(
        Cursor::new(vec![0x06]),
        10,
        &empty_merged(),
        &fake_registry(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        TreeError::Klv(KlvError::TruncatedStream { expected: 15 })
    ));
}

#[tokio::test]
async fn essence_before_any_partition_errors() {
    // one whole zero-key packet: not a partition pack
    let mut input = vec![0u8; 16];
    input.push(0);

    let err = build_tree(Cursor::new(input), 10, &empty_merged(), &fake_registry())
        .await
        .unwrap_err();
    assert!(matches!(err, TreeError::InvalidStructure(_)));
    assert_eq!(
        err.to_string(),
        "invalid mxf file structure, essence encountered before any partitions"
    );
}

#[tokio::test]
async fn reader_error_takes_precedence_over_builder_error() {
    // the zero packets are essence-before-partition for the builder, and
    // the trailing four bytes are a truncated key for the reader
    let mut input = vec![0u8; 17];
    input.extend_from_slice(&[0, 0, 0, 0]);

    let err = build_tree(Cursor::new(input), 10, &empty_merged(), &fake_registry())
        .await
        .unwrap_err();
    assert!(matches!(err, TreeError::Klv(KlvError::TruncatedStream { .. })));
}

#[tokio::test]
async fn partition_search_with_conjunction_over_built_tree() {
    // header with metadata, three empty bodies
    let mut file = header_with_graph();
    for _ in 0..3 {
        file.extend(partition_pack(0x03, 0x00, 0, 0));
    }

    let (mxf, _) = build_tree(Cursor::new(file), 10, &empty_merged(), &fake_registry())
        .await
        .unwrap();

    let found = mxf
        .search("select * from partition where metadata <> 0 AND essence <> 0")
        .unwrap();
    assert!(found.is_empty());

    let with_metadata = mxf
        .search("select * from partition where metadata <> 0")
        .unwrap();
    assert_eq!(with_metadata.len(), 1);
    assert_eq!(with_metadata[0].partition_index, 0);
}
