//! Baseline structural checks applied to any MXF file.

use std::sync::Arc;

use mxfcheck_sniff::xml;
use mxfcheck_tree::{
    new_specification, partition_extract, partition_to_klv, with_partition_tests,
    with_sniff_test, with_structure_tests, Check, PartitionClass, PartitionTest,
    PartitionTestFn, PartitionType, SniffContext, SniffTest, Specification,
    SpecificationDetails, StructureTestFn,
};

const DOC: &str = "ST 377-1";

fn details(section: &str, count: u32) -> SpecificationDetails {
    SpecificationDetails::new(DOC, section, "shall", count)
}

/// The baseline specification: file layout checks plus XML sniffing of
/// essence payloads.
pub fn specification(sc: &SniffContext) -> Specification {
    new_specification(vec![
        with_sniff_test(SniffTest {
            data_id: xml::identifier(),
            sniffs: vec![
                xml::path_sniffer(sc, "/*"),
                xml::path_sniffer(sc, xml::ROOT_NAMESPACE),
            ],
        }),
        with_structure_tests(vec![header_comes_first(), generic_streams_at_the_tail()]),
        with_partition_tests(vec![PartitionTest {
            partition_type: PartitionType::GenericKey,
            test: generic_partition_is_bare(),
        }]),
    ])
}

/// The file opens with a header partition.
fn header_comes_first() -> StructureTestFn {
    Arc::new(|_, mxf, t| {
        let first_is_header = mxf
            .partitions
            .first()
            .map(|p| p.props.partition_class == PartitionClass::Header)
            .unwrap_or(false);

        t.test(
            "checking the file opens with a header partition",
            details("6.1", 1),
            vec![Check::expect(
                first_is_header,
                "the first partition pack is not a header partition",
            )],
        );
    })
}

/// Generic stream partitions sit together at the end of the body, before
/// any footer and random index partitions.
fn generic_streams_at_the_tail() -> StructureTestFn {
    Arc::new(|_, mxf, t| {
        let generics = mxf.search("select * from partition where type = genericstreampartition");
        let footers = mxf.search("select * from partition where type = footer");
        let rips = mxf.search("select * from partition where type = rip");

        let (Ok(generics), Ok(footers), Ok(rips)) = (&generics, &footers, &rips) else {
            t.test(
                "querying the partition layout",
                details("6.1", 2),
                vec![Check::expect(false, "partition queries failed")],
            );
            return;
        };

        if generics.is_empty() {
            return;
        }

        let mut end = mxf.partitions.len();
        if !footers.is_empty() {
            end -= 1;
        }
        if !rips.is_empty() {
            end -= 1;
        }

        let positions: Vec<usize> = generics.iter().map(|p| p.partition_index).collect();
        let expected: Vec<usize> = (end.saturating_sub(positions.len())..end).collect();

        t.test(
            "checking generic stream partitions sit at the end of the file body",
            details("6.1", 2),
            vec![Check::expect_eq(positions, expected)],
        );
    })
}

/// A generic stream partition carries no header metadata or index table.
fn generic_partition_is_bare() -> PartitionTestFn {
    Arc::new(|doc, partition, t| {
        let klv = match partition_to_klv(doc, partition) {
            Ok(klv) => klv,
            Err(e) => {
                t.test(
                    "re-reading the generic partition pack",
                    details("6.2", 1),
                    vec![Check::expect(
                        false,
                        format!("could not re-read the partition pack: {e}"),
                    )],
                );
                return;
            }
        };

        let pack = partition_extract(&klv);
        t.test(
            "checking the generic stream partition carries no metadata or index",
            details("6.2", 1),
            vec![
                Check::expect_eq(pack.header_byte_count, 0),
                Check::expect_eq(pack.index_byte_count, 0),
                Check::expect_eq(pack.index_sid, 0),
            ],
        );
    })
}
