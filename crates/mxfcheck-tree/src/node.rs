//! Nodes of the structural tree.
//!
//! The tree has three levels: [`MxfNode`] owns the partitions, each
//! [`PartitionNode`] owns its header metadata forest, essence items and
//! optional index table, and each [`Node`] owns its children. Upward links
//! are weak back references assigned after construction, used only by
//! failure propagation, so the owning direction stays acyclic.
//!
//! Nodes are never mutated after the build except for test pass flags and
//! the precomputed sniff results stored at creation.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::partition::PartitionClass;
use crate::sniff::SniffResult;

/// Shared handle to a metadata or essence node.
pub type NodeRef = Rc<Node>;

/// Partition scoped table mapping local tag hex strings to full ULs.
pub type Primer = HashMap<String, String>;

/// Half-open byte range into the source stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

impl Position {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Properties of a header metadata group object.
#[derive(Debug, Clone, Default)]
pub struct GroupProperties {
    /// Instance-ID of the object, when one was present.
    pub instance_id: Option<uuid::Uuid>,
    /// UL of the group, in the masked form that matched the registry.
    pub universal_label: String,
    /// Weak reference labels attached to the group.
    pub group_labels: Vec<String>,
}

/// Properties of an essence item.
#[derive(Debug, Clone)]
pub struct EssenceProperties {
    /// UL of the essence key, masked where a wildcard form matched.
    pub essence_ul: String,
}

/// Tagged property variants held by a [`Node`].
#[derive(Debug, Clone)]
pub enum Properties {
    Group(GroupProperties),
    Essence(EssenceProperties),
}

impl Default for Properties {
    fn default() -> Self {
        Properties::Group(GroupProperties::default())
    }
}

impl Properties {
    /// The UL associated with the node.
    pub fn ul(&self) -> &str {
        match self {
            Properties::Group(g) => &g.universal_label,
            Properties::Essence(e) => &e.essence_ul,
        }
    }

    /// Hex form of the instance UUID, empty when the node has none.
    pub fn id(&self) -> String {
        match self {
            Properties::Group(g) => g
                .instance_id
                .map(|u| u.simple().to_string())
                .unwrap_or_default(),
            Properties::Essence(_) => String::new(),
        }
    }

    /// Classification labels for the node.
    pub fn label(&self) -> Vec<String> {
        match self {
            Properties::Group(g) => g.group_labels.clone(),
            Properties::Essence(_) => vec!["essence".to_string()],
        }
    }
}

/// Properties of a partition, held only by [`PartitionNode`].
#[derive(Debug, Clone, Default)]
pub struct PartitionProperties {
    /// Index of the partition along the file, starting at 0.
    pub partition_index: usize,
    /// Partition class derived from the partition pack key.
    pub partition_class: PartitionClass,
    /// The primer in force for this partition.
    pub primer: Rc<Primer>,
    /// Repeating pattern of essence ULs detected at the start of the
    /// essence stream.
    pub essence_order: Vec<String>,
}

impl PartitionProperties {
    pub fn ul(&self) -> &str {
        self.partition_class.as_str()
    }

    pub fn id(&self) -> String {
        String::new()
    }

    pub fn label(&self) -> Vec<String> {
        vec!["partition".to_string()]
    }
}

/// Test state attached to a node: the pass flag plus the handles of the
/// registered tests that target it.
pub struct TestBundle {
    pass: Cell<bool>,
    pub(crate) attached: Vec<usize>,
}

impl Default for TestBundle {
    fn default() -> Self {
        Self {
            pass: Cell::new(true),
            attached: Vec::new(),
        }
    }
}

impl TestBundle {
    pub(crate) fn with_attached(attached: Vec<usize>) -> Self {
        Self {
            pass: Cell::new(true),
            attached,
        }
    }

    /// Whether every executed test against this node has passed so far.
    pub fn passed(&self) -> bool {
        self.pass.get()
    }

    pub(crate) fn flag(&self) {
        self.pass.set(false);
    }
}

impl fmt::Debug for TestBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestBundle")
            .field("pass", &self.pass.get())
            .field("attached", &self.attached.len())
            .finish()
    }
}

#[derive(Debug, Default)]
pub(crate) enum NodeParent {
    #[default]
    None,
    Node(Weak<Node>),
    Partition(Weak<PartitionNode>),
}

/// A header metadata object, essence item or index table in the tree.
#[derive(Debug)]
pub struct Node {
    pub key: Position,
    pub length: Position,
    pub value: Position,
    pub properties: Properties,
    pub children: Vec<NodeRef>,
    /// Sniff results precomputed for essence payloads, keyed by probe name.
    pub sniffs: HashMap<String, SniffResult>,
    pub tests: TestBundle,
    pub tags: TestBundle,
    pub(crate) parent: RefCell<NodeParent>,
}

impl Node {
    /// The UL of the node's properties.
    pub fn ul(&self) -> &str {
        self.properties.ul()
    }

    /// The instance ID of the node's properties, empty when absent.
    pub fn id(&self) -> String {
        self.properties.id()
    }

    /// Mark the node's tests failed and propagate the failure to every
    /// ancestor up to the file node.
    pub fn flag_fail(&self) {
        self.tests.flag();
        match &*self.parent.borrow() {
            NodeParent::None => {}
            NodeParent::Node(parent) => {
                if let Some(parent) = parent.upgrade() {
                    parent.flag_fail();
                }
            }
            NodeParent::Partition(parent) => {
                if let Some(parent) = parent.upgrade() {
                    parent.flag_fail();
                }
            }
        }
    }
}

/// One partition of the file.
#[derive(Debug)]
pub struct PartitionNode {
    pub key: Position,
    pub length: Position,
    pub value: Position,
    /// Partition level metadata roots, in file order.
    pub header_metadata: Vec<NodeRef>,
    /// Essence items, in file order.
    pub essence: Vec<NodeRef>,
    pub index_table: Option<NodeRef>,
    pub props: PartitionProperties,
    pub tests: TestBundle,
    pub tags: TestBundle,
    /// Index of the partition along the file.
    pub partition_index: usize,
    pub(crate) parent: RefCell<Weak<MxfNode>>,
}

impl PartitionNode {
    /// Mark the partition's tests failed and propagate to the file node.
    pub fn flag_fail(&self) {
        self.tests.flag();
        if let Some(parent) = self.parent.borrow().upgrade() {
            parent.flag_fail();
        }
    }
}

/// Root of the tree: the whole MXF file.
#[derive(Debug, Default)]
pub struct MxfNode {
    pub partitions: Vec<Rc<PartitionNode>>,
    pub tests: TestBundle,
    pub tags: TestBundle,
}

impl MxfNode {
    /// Mark the file level tests failed.
    pub fn flag_fail(&self) {
        self.tests.flag();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_node(properties: Properties) -> Node {
        Node {
            key: Position::default(),
            length: Position::default(),
            value: Position::default(),
            properties,
            children: Vec::new(),
            sniffs: HashMap::new(),
            tests: TestBundle::default(),
            tags: TestBundle::default(),
            parent: RefCell::new(NodeParent::None),
        }
    }

    #[test]
    fn group_properties_answer_queries() {
        let props = Properties::Group(GroupProperties {
            instance_id: Some(uuid::Uuid::from_bytes([0xab; 16])),
            universal_label: "060e2b34.027f0101.0d010101.01012f00".to_string(),
            group_labels: vec!["060e2b34.04010101.0d010301.027e0100".to_string()],
        });

        assert_eq!(props.ul(), "060e2b34.027f0101.0d010101.01012f00");
        assert_eq!(props.id(), "ab".repeat(16));
        assert_eq!(props.label().len(), 1);
    }

    #[test]
    fn essence_properties_answer_queries() {
        let props = Properties::Essence(EssenceProperties {
            essence_ul: "060e2b34.0101010c.0d010509.01000000".to_string(),
        });

        assert_eq!(props.ul(), "060e2b34.0101010c.0d010509.01000000");
        assert_eq!(props.id(), "");
        assert_eq!(props.label(), vec!["essence".to_string()]);
    }

    #[test]
    fn missing_instance_id_is_empty() {
        let node = bare_node(Properties::default());
        assert_eq!(node.id(), "");
    }

    #[test]
    fn flag_fail_reaches_every_ancestor() {
        let mxf = Rc::new(MxfNode::default());
        let partition = Rc::new(PartitionNode {
            key: Position::default(),
            length: Position::default(),
            value: Position::default(),
            header_metadata: Vec::new(),
            essence: Vec::new(),
            index_table: None,
            props: PartitionProperties::default(),
            tests: TestBundle::default(),
            tags: TestBundle::default(),
            partition_index: 0,
            parent: RefCell::new(Rc::downgrade(&mxf)),
        });

        let child = Rc::new(bare_node(Properties::default()));
        let parent = Rc::new(bare_node(Properties::default()));
        *child.parent.borrow_mut() = NodeParent::Node(Rc::downgrade(&parent));
        *parent.parent.borrow_mut() = NodeParent::Partition(Rc::downgrade(&partition));

        assert!(mxf.tests.passed());
        child.flag_fail();

        assert!(!child.tests.passed());
        assert!(!parent.tests.passed());
        assert!(!partition.tests.passed());
        assert!(!mxf.tests.passed());
    }
}
