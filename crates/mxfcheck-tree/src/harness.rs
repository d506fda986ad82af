//! The two-phase conformance harness.
//!
//! A run merges the supplied specifications, builds the tree with the
//! merged tests attached, then executes two phases over it:
//!
//! 1. **Tag phase** - every tag runs into a discarded reporter. A failing
//!    tag disables the test registered at the same position in the same
//!    source specification, collected as a set of disabled handles the
//!    test phase consumes immutably.
//! 2. **Test phase** - structure tests first, then partitions in file
//!    order: header metadata roots depth-first, then partition level
//!    tests. Body and generic-stream partitions run their essence
//!    oriented tests; RIP partitions get none.
//!
//! Registrations never visited by either phase are reported as skipped.
//! Test execution order is single threaded throughout; test callbacks
//! assume a single threaded report context.

use std::collections::HashSet;
use std::io::{Read, Seek, Write};

use mxfcheck_registry::Registry;

use crate::builder::build_tree;
use crate::error::{Result, TreeError};
use crate::node::{MxfNode, NodeRef, PartitionNode, Primer};
use crate::partition::PartitionClass;
use crate::report::{Report, TestContext, TestRun};
use crate::spec::{MergedSpecification, ReadSeek, SkipKey, Specification};

/// Capacity of the packet queue between the reader and the builder.
const PACKET_QUEUE_CAPACITY: usize = 1000;

/// Handles of tests disabled by a failing tag.
#[derive(Debug, Default)]
struct DisabledTests {
    node: HashSet<usize>,
    part: HashSet<usize>,
    structure: HashSet<usize>,
}

/// Validate an MXF stream against the given specifications and return the
/// structured report.
///
/// With no specifications no tests are run and the report is empty but
/// passing. Parse errors abort the run; test failures only show in the
/// report.
pub async fn run_tests<R>(
    doc: R,
    specs: Vec<Specification>,
    registry: &Registry,
) -> Result<Report>
where
    R: Read + Seek + Send + 'static,
{
    let merged = MergedSpecification::merge(specs);
    let mut skips = merged.skip_keys();

    let (mxf, mut doc) = build_tree(doc, PACKET_QUEUE_CAPACITY, &merged, registry).await?;

    let disabled = run_tags(&mut doc, &mxf, &merged, &mut skips);

    let mut tc = TestContext::new();

    tc.section("testing mxf file structure", |t| {
        for &handle in &mxf.tests.attached {
            if disabled.structure.contains(&handle) {
                continue;
            }
            (merged.structure_tests[handle])(&mut doc, &mxf, t);
        }
    });

    for partition in &mxf.partitions {
        match partition.props.partition_class {
            PartitionClass::Header | PartitionClass::Footer => {
                if !partition.header_metadata.is_empty() {
                    skips.remove(&SkipKey::Partition("header".to_string()));

                    tc.section(
                        format!(
                            "testing header metadata of a {} partition at offset {}",
                            partition.props.partition_class, partition.key.start
                        ),
                        |t| {
                            for root in &partition.header_metadata {
                                test_child_nodes(
                                    &mut doc,
                                    root,
                                    &partition.props.primer,
                                    t,
                                    &merged,
                                    &disabled,
                                    &mut skips,
                                );
                            }
                        },
                    );

                    tc.section(
                        format!(
                            "testing header properties of a {} partition at offset {}",
                            partition.props.partition_class, partition.key.start
                        ),
                        |t| {
                            run_partition_tests(&mut doc, partition, t, &merged, &disabled);
                        },
                    );
                }
            }
            PartitionClass::Body | PartitionClass::GenericStream => {
                let key = partition_skip_key(partition.props.partition_class);
                skips.remove(&SkipKey::Partition(key.to_string()));

                tc.section(
                    format!(
                        "testing essence properties at {} partition at offset {}",
                        partition.props.partition_class, partition.key.start
                    ),
                    |t| {
                        run_partition_tests(&mut doc, partition, t, &merged, &disabled);
                    },
                );
            }
            // no default tests for random index partitions
            PartitionClass::Rip | PartitionClass::Invalid => {}
        }
    }

    let mut remaining: Vec<SkipKey> = skips.into_iter().collect();
    remaining.sort();
    for key in remaining {
        match key {
            SkipKey::Node(ul) => tc.register_skipped_test(ul, "a skipped node test"),
            SkipKey::Partition(class) => {
                tc.register_skipped_test(class, "a skipped partition test")
            }
        }
    }

    Ok(tc.into_report())
}

/// Validate an MXF stream and write the report to `report_to` as YAML.
pub async fn mrx_test<R, W>(
    doc: R,
    report_to: W,
    specs: Vec<Specification>,
    registry: &Registry,
) -> Result<Report>
where
    R: Read + Seek + Send + 'static,
    W: Write,
{
    let report = run_tests(doc, specs, registry).await?;
    serde_yaml::to_writer(report_to, &report).map_err(|e| TreeError::Report(e.to_string()))?;
    Ok(report)
}

/// The registration key a partition class is tested under.
fn partition_skip_key(class: PartitionClass) -> &'static str {
    match class {
        PartitionClass::Header | PartitionClass::Footer => "header",
        PartitionClass::GenericStream => "generickey",
        _ => "essence",
    }
}

fn run_partition_tests(
    doc: &mut dyn ReadSeek,
    partition: &PartitionNode,
    t: &mut TestRun,
    merged: &MergedSpecification,
    disabled: &DisabledTests,
) {
    for &handle in &partition.tests.attached {
        if disabled.part.contains(&handle) {
            continue;
        }
        (merged.part_tests[handle].run)(&mut *doc, partition, t);
        if !t.passed() {
            partition.flag_fail();
        }
    }
}

/// Run node tests on a metadata node and, depth-first, its children.
fn test_child_nodes(
    doc: &mut dyn ReadSeek,
    node: &NodeRef,
    primer: &Primer,
    t: &mut TestRun,
    merged: &MergedSpecification,
    disabled: &DisabledTests,
    skips: &mut HashSet<SkipKey>,
) {
    if !node.tests.attached.is_empty() {
        skips.remove(&SkipKey::Node(node.ul().to_string()));
    }
    for &handle in &node.tests.attached {
        if disabled.node.contains(&handle) {
            continue;
        }
        (merged.node_tests[handle].run)(&mut *doc, node, primer, t);
        if !t.passed() {
            node.flag_fail();
        }
    }

    for child in &node.children {
        test_child_nodes(doc, child, primer, t, merged, disabled, skips);
    }
}

/// Run every tag over the tree into a discarded reporter, collecting the
/// handles of the tests their failures disable. Visited registrations are
/// removed from the skip tracker.
fn run_tags(
    doc: &mut dyn ReadSeek,
    mxf: &MxfNode,
    merged: &MergedSpecification,
    skips: &mut HashSet<SkipKey>,
) -> DisabledTests {
    let mut disabled = DisabledTests::default();
    let mut tc = TestContext::new();

    tc.section("testing mxf file structure", |t| {
        for &handle in &mxf.tags.attached {
            let tag = &merged.structure_tags[handle];
            (tag.run)(&mut *doc, mxf, t);
            if !t.passed() {
                if let Some(paired) = tag.paired {
                    disabled.structure.insert(paired);
                }
            }
        }
    });

    for partition in &mxf.partitions {
        match partition.props.partition_class {
            PartitionClass::Header | PartitionClass::Footer => {
                if !partition.header_metadata.is_empty() {
                    skips.remove(&SkipKey::Partition("header".to_string()));

                    tc.section("tagging header metadata", |t| {
                        for root in &partition.header_metadata {
                            tag_child_nodes(
                                &mut *doc,
                                root,
                                &partition.props.primer,
                                t,
                                merged,
                                &mut disabled,
                                skips,
                            );
                        }
                    });

                    tc.section("tagging header properties", |t| {
                        run_partition_tags(&mut *doc, partition, t, merged, &mut disabled);
                    });
                }
            }
            PartitionClass::Body | PartitionClass::GenericStream => {
                let key = partition_skip_key(partition.props.partition_class);
                skips.remove(&SkipKey::Partition(key.to_string()));

                tc.section("tagging essence properties", |t| {
                    run_partition_tags(&mut *doc, partition, t, merged, &mut disabled);
                });
            }
            PartitionClass::Rip | PartitionClass::Invalid => {}
        }
    }

    // the tag phase report is never emitted
    drop(tc);
    disabled
}

fn run_partition_tags(
    doc: &mut dyn ReadSeek,
    partition: &PartitionNode,
    t: &mut TestRun,
    merged: &MergedSpecification,
    disabled: &mut DisabledTests,
) {
    for &handle in &partition.tags.attached {
        let tag = &merged.part_tags[handle];
        (tag.run)(&mut *doc, partition, t);
        if !t.passed() {
            if let Some(paired) = tag.paired {
                disabled.part.insert(paired);
            }
        }
    }
}

fn tag_child_nodes(
    doc: &mut dyn ReadSeek,
    node: &NodeRef,
    primer: &Primer,
    t: &mut TestRun,
    merged: &MergedSpecification,
    disabled: &mut DisabledTests,
    skips: &mut HashSet<SkipKey>,
) {
    if !node.tags.attached.is_empty() {
        skips.remove(&SkipKey::Node(node.ul().to_string()));
    }
    for &handle in &node.tags.attached {
        let tag = &merged.node_tags[handle];
        (tag.run)(&mut *doc, node, primer, t);
        if !t.passed() {
            if let Some(paired) = tag.paired {
                disabled.node.insert(paired);
            }
        }
    }

    for child in &node.children {
        tag_child_nodes(doc, child, primer, t, merged, disabled, skips);
    }
}
