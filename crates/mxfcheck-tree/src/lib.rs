//! Structural tree and conformance harness for MXF files.
//!
//! An MXF file is parsed into a tree - file, partitions, header metadata
//! objects, essence items - and pluggable conformance specifications are
//! run over it in two phases, producing a structured report:
//!
//! - [`build_tree`] - streaming parse into an [`MxfNode`] tree, with the
//!   header metadata object graph stitched through each partition's primer
//!   and an injected [UL registry](mxfcheck_registry::Registry)
//! - `search` methods on [`Node`], [`PartitionNode`] and [`MxfNode`] - a
//!   small SQL flavoured selector over the tree
//! - [`sniff`] - content type detection and probing for essence payloads
//! - [`new_specification`] and the `with_*` options - containers of node,
//!   partition and structure tests, each gated by a parallel tag
//! - [`run_tests`] / [`mrx_test`] - the two phase harness and its report
//!
//! # Example
//!
//! ```no_run
//! use mxfcheck_registry::Registry;
//! use mxfcheck_tree::{mrx_test, new_specification};
//!
//! # async fn demo() -> Result<(), mxfcheck_tree::TreeError> {
//! let file = std::fs::File::open("archive.mxf")?;
//! let registry = Registry::builtin();
//! let spec = new_specification(vec![]);
//! let report = mrx_test(file, std::io::stdout(), vec![spec], &registry).await?;
//! assert!(report.test_pass);
//! # Ok(())
//! # }
//! ```

mod builder;
mod decode;
mod error;
mod harness;
mod node;
mod partition;
mod query;
mod report;
mod sniff;
mod spec;

pub use builder::build_tree;
pub use decode::{decode_group, decode_group_node, node_to_klv, partition_to_klv};
pub use error::{DecodeError, QueryError, Result, TreeError};
pub use node::{
    EssenceProperties, GroupProperties, MxfNode, Node, NodeRef, PartitionNode,
    PartitionProperties, Position, Primer, Properties, TestBundle,
};
pub use partition::{
    is_partition_pack, is_primer_pack, partition_extract, Partition, PartitionClass, Rip,
    PARTITION_PACK_UL, PRIMER_PACK_UL,
};
pub use report::{
    Check, CheckResult, Report, SkippedTest, SpecificationDetails, TestContext, TestResult,
    TestRun, TestSection,
};
pub use sniff::{
    sniff, CType, DataIdentifier, SniffContext, SniffKey, SniffResult, SniffTest, Sniffer,
    CONTENT_TYPE_KEY,
};
pub use spec::{
    new_specification, with_node_tags, with_node_tests, with_partition_tags,
    with_partition_tests, with_sniff_test, with_structure_tag, with_structure_tests,
    MergedSpecification, NodeTest, NodeTestFn, PartitionTest, PartitionTestFn, PartitionType,
    ReadSeek, SpecOption, Specification, StructureTestFn,
};
pub use harness::{mrx_test, run_tests};
