//! Conformance specifications.
//!
//! A [`Specification`] aggregates the tests a standards document attaches
//! to the tree: per-UL node tests, per-class partition tests, whole file
//! structure tests, each with a parallel tag (a gating pre-test), plus one
//! sniff test for essence payloads. Specifications are built with ordered
//! options and merged at run time; the merge assigns every test an integer
//! handle and pairs each tag with the test registered at the same position
//! in the same source specification.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use std::sync::Arc;

use crate::node::{MxfNode, Node, PartitionNode, Primer};
use crate::report::TestRun;
use crate::sniff::{DataIdentifier, SniffTest, Sniffer};

/// Combined trait for Read + Seek, needed for trait objects.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// A test against one header metadata node.
pub type NodeTestFn = Arc<dyn Fn(&mut dyn ReadSeek, &Node, &Primer, &mut TestRun)>;

/// A test against one partition.
pub type PartitionTestFn = Arc<dyn Fn(&mut dyn ReadSeek, &PartitionNode, &mut TestRun)>;

/// A test against the whole file.
pub type StructureTestFn = Arc<dyn Fn(&mut dyn ReadSeek, &MxfNode, &mut TestRun)>;

/// The partition classes a partition test can target.
///
/// `Header` also covers footer partitions: a footer's header metadata is
/// validated under the same rules as a header's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionType {
    Header,
    Essence,
    GenericKey,
}

impl PartitionType {
    /// The registration key used in specification maps.
    pub fn as_key(&self) -> &'static str {
        match self {
            PartitionType::Header => "header",
            PartitionType::Essence => "essence",
            PartitionType::GenericKey => "generickey",
        }
    }
}

/// A node test targeting every object with the given UL.
#[derive(Clone)]
pub struct NodeTest {
    pub ul: String,
    pub test: NodeTestFn,
}

/// A partition test targeting every partition of the given type.
#[derive(Clone)]
pub struct PartitionTest {
    pub partition_type: PartitionType,
    pub test: PartitionTestFn,
}

/// A container of tests making up one conformance specification.
///
/// Every field is optional; an empty specification is still valid.
#[derive(Default)]
pub struct Specification {
    pub(crate) node_tests: HashMap<String, Vec<NodeTestFn>>,
    pub(crate) node_tags: HashMap<String, Vec<NodeTestFn>>,
    pub(crate) part_tests: HashMap<&'static str, Vec<PartitionTestFn>>,
    pub(crate) part_tags: HashMap<&'static str, Vec<PartitionTestFn>>,
    pub(crate) structure_tests: Vec<StructureTestFn>,
    pub(crate) structure_tags: Vec<StructureTestFn>,
    pub(crate) sniff_test: Option<SniffTest>,
}

/// One builder option for [`new_specification`].
pub type SpecOption = Box<dyn FnOnce(&mut Specification)>;

/// Build a specification from ordered options. The options are applied in
/// the order given; no options yields an empty, valid specification.
pub fn new_specification(options: Vec<SpecOption>) -> Specification {
    let mut spec = Specification::default();
    for option in options {
        option(&mut spec);
    }
    spec
}

/// Add node tests to the specification.
pub fn with_node_tests(tests: Vec<NodeTest>) -> SpecOption {
    Box::new(move |spec| {
        for t in tests {
            spec.node_tests.entry(t.ul).or_default().push(t.test);
        }
    })
}

/// Add node tags to the specification.
pub fn with_node_tags(tags: Vec<NodeTest>) -> SpecOption {
    Box::new(move |spec| {
        for t in tags {
            spec.node_tags.entry(t.ul).or_default().push(t.test);
        }
    })
}

/// Add partition tests to the specification.
pub fn with_partition_tests(tests: Vec<PartitionTest>) -> SpecOption {
    Box::new(move |spec| {
        for t in tests {
            spec.part_tests
                .entry(t.partition_type.as_key())
                .or_default()
                .push(t.test);
        }
    })
}

/// Add partition tags to the specification.
pub fn with_partition_tags(tags: Vec<PartitionTest>) -> SpecOption {
    Box::new(move |spec| {
        for t in tags {
            spec.part_tags
                .entry(t.partition_type.as_key())
                .or_default()
                .push(t.test);
        }
    })
}

/// Add whole file structure tests to the specification.
pub fn with_structure_tests(tests: Vec<StructureTestFn>) -> SpecOption {
    Box::new(move |spec| spec.structure_tests.extend(tests))
}

/// Add whole file structure tags to the specification.
pub fn with_structure_tag(tags: Vec<StructureTestFn>) -> SpecOption {
    Box::new(move |spec| spec.structure_tags.extend(tags))
}

/// Set the sniff test run on essence payloads found in the file.
pub fn with_sniff_test(sniff_test: SniffTest) -> SpecOption {
    Box::new(move |spec| spec.sniff_test = Some(sniff_test))
}

pub(crate) struct RegisteredNodeTest {
    pub ul: String,
    pub run: NodeTestFn,
}

pub(crate) struct RegisteredNodeTag {
    pub run: NodeTestFn,
    /// Handle of the test this tag gates, when one was registered at the
    /// same position.
    pub paired: Option<usize>,
}

pub(crate) struct RegisteredPartitionTest {
    pub key: &'static str,
    pub run: PartitionTestFn,
}

pub(crate) struct RegisteredPartitionTag {
    pub run: PartitionTestFn,
    pub paired: Option<usize>,
}

pub(crate) struct RegisteredStructureTag {
    pub run: StructureTestFn,
    pub paired: Option<usize>,
}

/// Keys tracked for the skipped-registration report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum SkipKey {
    Node(String),
    Partition(String),
}

/// The union of every supplied specification, with integer handles
/// assigned to each registered test.
#[derive(Default)]
pub struct MergedSpecification {
    pub(crate) node_tests: Vec<RegisteredNodeTest>,
    pub(crate) node_tags: Vec<RegisteredNodeTag>,
    pub(crate) part_tests: Vec<RegisteredPartitionTest>,
    pub(crate) part_tags: Vec<RegisteredPartitionTag>,
    pub(crate) structure_tests: Vec<StructureTestFn>,
    pub(crate) structure_tags: Vec<RegisteredStructureTag>,

    pub(crate) node_test_index: HashMap<String, Vec<usize>>,
    pub(crate) node_tag_index: HashMap<String, Vec<usize>>,
    pub(crate) part_test_index: HashMap<&'static str, Vec<usize>>,
    pub(crate) part_tag_index: HashMap<&'static str, Vec<usize>>,

    pub(crate) sniffers: Vec<(DataIdentifier, Vec<Sniffer>)>,
}

impl MergedSpecification {
    /// Merge specifications in order, assigning handles and pairing tags
    /// with tests by registration position within each source
    /// specification.
    pub fn merge(specs: impl IntoIterator<Item = Specification>) -> Self {
        let mut merged = MergedSpecification::default();

        for spec in specs {
            // node tests first so the spec's tags can pair against them
            let mut node_handles: HashMap<String, Vec<usize>> = HashMap::new();
            for (ul, tests) in spec.node_tests {
                for test in tests {
                    let handle = merged.node_tests.len();
                    merged.node_tests.push(RegisteredNodeTest {
                        ul: ul.clone(),
                        run: test,
                    });
                    merged
                        .node_test_index
                        .entry(ul.clone())
                        .or_default()
                        .push(handle);
                    node_handles.entry(ul.clone()).or_default().push(handle);
                }
            }
            for (ul, tags) in spec.node_tags {
                for (i, tag) in tags.into_iter().enumerate() {
                    let handle = merged.node_tags.len();
                    merged.node_tags.push(RegisteredNodeTag {
                        run: tag,
                        paired: node_handles.get(&ul).and_then(|h| h.get(i)).copied(),
                    });
                    merged
                        .node_tag_index
                        .entry(ul.clone())
                        .or_default()
                        .push(handle);
                }
            }

            let mut part_handles: HashMap<&'static str, Vec<usize>> = HashMap::new();
            for (key, tests) in spec.part_tests {
                for test in tests {
                    let handle = merged.part_tests.len();
                    merged
                        .part_tests
                        .push(RegisteredPartitionTest { key, run: test });
                    merged.part_test_index.entry(key).or_default().push(handle);
                    part_handles.entry(key).or_default().push(handle);
                }
            }
            for (key, tags) in spec.part_tags {
                for (i, tag) in tags.into_iter().enumerate() {
                    let handle = merged.part_tags.len();
                    merged.part_tags.push(RegisteredPartitionTag {
                        run: tag,
                        paired: part_handles.get(&key).and_then(|h| h.get(i)).copied(),
                    });
                    merged.part_tag_index.entry(key).or_default().push(handle);
                }
            }

            let structure_base = merged.structure_tests.len();
            let structure_count = spec.structure_tests.len();
            merged.structure_tests.extend(spec.structure_tests);
            for (i, tag) in spec.structure_tags.into_iter().enumerate() {
                merged.structure_tags.push(RegisteredStructureTag {
                    run: tag,
                    paired: (i < structure_count).then_some(structure_base + i),
                });
            }

            if let Some(sniff_test) = spec.sniff_test {
                merged.sniffers.push((sniff_test.data_id, sniff_test.sniffs));
            }
        }

        merged
    }

    /// Registration keys that must be visited during a run; whatever is
    /// left afterwards is reported as skipped.
    pub(crate) fn skip_keys(&self) -> HashSet<SkipKey> {
        let mut keys = HashSet::new();
        for ul in self.node_test_index.keys() {
            keys.insert(SkipKey::Node(ul.clone()));
        }
        for key in self.part_test_index.keys() {
            keys.insert(SkipKey::Partition(key.to_string()));
        }
        keys
    }
}
