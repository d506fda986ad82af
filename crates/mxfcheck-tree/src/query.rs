//! Declarative search over the tree.
//!
//! A minimal SQL flavoured selector, case insensitive and whitespace
//! tokenized. Three surfaces:
//!
//! - [`Node::search`]: `select * where <field> <op> <value>` over a node's
//!   descendants, with fields `ul` and `sniff:<key>`
//! - [`PartitionNode::search`]: `select * from <essence|metadata> [where ...]`
//! - [`MxfNode::search`]: `select * from partition [where <cond> [AND <cond>]*]`
//!   with fields `type`, `essence` and `metadata`
//!
//! Operators are `=` and `<>`; UL values are compared verbatim as strings.

use std::rc::Rc;

use crate::error::QueryError;
use crate::node::{MxfNode, Node, NodeRef, PartitionNode};

const NODE_USAGE: &str = "select * where field = value";
const TABLE_USAGE: &str = "select * from table";
const CLAUSE_USAGE: &str = "select * from table where field = value";

impl Node {
    /// Search the node's descendants. The node itself is never returned.
    pub fn search(&self, query: &str) -> Result<Vec<NodeRef>, QueryError> {
        let command: Vec<&str> = query.split_whitespace().collect();

        if command.len() < 6 {
            return Err(QueryError::Malformed(query.to_string(), NODE_USAGE));
        }
        if !command[0].eq_ignore_ascii_case("select") {
            return Err(QueryError::FirstWordNotSelect);
        }
        if !command[2].eq_ignore_ascii_case("where") {
            return Err(QueryError::Malformed(query.to_string(), NODE_USAGE));
        }

        let mut out = Vec::new();
        for child in &self.children {
            recurse_search(child, command[3], command[4], command[5], &mut out)?;
        }
        Ok(out)
    }
}

impl PartitionNode {
    /// Search inside one of the partition's tables, `essence` or
    /// `metadata`. Without a `where` clause the whole table is returned.
    pub fn search(&self, query: &str) -> Result<Vec<NodeRef>, QueryError> {
        let command: Vec<&str> = query.split_whitespace().collect();

        if command.len() < 4 {
            return Err(QueryError::Malformed(query.to_string(), TABLE_USAGE));
        }
        if !command[0].eq_ignore_ascii_case("select") {
            return Err(QueryError::FirstWordNotSelect);
        }
        if !command[2].eq_ignore_ascii_case("from") {
            return Err(QueryError::Malformed(query.to_string(), TABLE_USAGE));
        }

        let table = match command[3].to_ascii_lowercase().as_str() {
            "essence" => &self.essence,
            "metadata" => &self.header_metadata,
            _ => return Err(QueryError::UnknownTable(command[3].to_string())),
        };

        match command.len() {
            4 => return Ok(table.clone()),
            8 => {}
            _ => return Err(QueryError::Malformed(query.to_string(), CLAUSE_USAGE)),
        }
        if !command[4].eq_ignore_ascii_case("where") {
            return Err(QueryError::Malformed(query.to_string(), CLAUSE_USAGE));
        }

        let mut out = Vec::new();
        for node in table {
            recurse_search(node, command[5], command[6], command[7], &mut out)?;
        }
        Ok(out)
    }
}

impl MxfNode {
    /// Search the file's partitions. Conditions are joined with `AND` and
    /// short-circuit on the first false.
    pub fn search(&self, query: &str) -> Result<Vec<Rc<PartitionNode>>, QueryError> {
        let command: Vec<&str> = query.split_whitespace().collect();

        if command.len() < 4 {
            return Err(QueryError::Malformed(query.to_string(), TABLE_USAGE));
        }
        if !command[0].eq_ignore_ascii_case("select") {
            return Err(QueryError::FirstWordNotSelectPartitions);
        }
        if !command[2].eq_ignore_ascii_case("from") {
            return Err(QueryError::Malformed(query.to_string(), TABLE_USAGE));
        }

        match command[3].to_ascii_lowercase().as_str() {
            "partition" | "partitions" => {}
            _ => return Err(QueryError::UnknownTable(command[3].to_string())),
        }

        if command.len() == 4 {
            return Ok(self.partitions.clone());
        }
        if command.len() % 4 != 0 {
            return Err(QueryError::Malformed(query.to_string(), CLAUSE_USAGE));
        }
        if !command[4].eq_ignore_ascii_case("where") {
            return Err(QueryError::Malformed(query.to_string(), CLAUSE_USAGE));
        }

        // break the command into conjunction clauses of four tokens
        let clause_count = (command.len() - 4) / 4;
        let mut clauses = Vec::with_capacity(clause_count);
        for i in 0..clause_count {
            if i == 0 {
                clauses.push(["and", command[5], command[6], command[7]]);
            } else {
                clauses.push([
                    command[4 + i * 4],
                    command[5 + i * 4],
                    command[6 + i * 4],
                    command[7 + i * 4],
                ]);
            }
        }

        let mut out = Vec::new();
        for partition in &self.partitions {
            let mut all_pass = true;
            for clause in &clauses {
                if !clause[0].eq_ignore_ascii_case("and") {
                    return Err(QueryError::UnknownConjunction(clause[0].to_string()));
                }
                if !compare_partition(partition, clause[1], clause[2], clause[3])? {
                    all_pass = false;
                    break;
                }
            }
            if all_pass {
                out.push(partition.clone());
            }
        }
        Ok(out)
    }
}

/// Depth-first match of a node and its descendants against one clause.
fn recurse_search(
    node: &NodeRef,
    field: &str,
    operator: &str,
    target: &str,
    out: &mut Vec<NodeRef>,
) -> Result<(), QueryError> {
    let compare_field = if field.eq_ignore_ascii_case("ul") {
        node.ul().to_string()
    } else if field.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("sniff:")) {
        node.sniffs
            .get(&field[6..])
            .map(|s| s.field.clone())
            .unwrap_or_default()
    } else {
        return Err(QueryError::UnknownField(field.to_string()));
    };

    if evaluate(&compare_field, operator, target)? {
        out.push(node.clone());
    }

    for child in &node.children {
        recurse_search(child, field, operator, target, out)?;
    }
    Ok(())
}

fn compare_partition(
    partition: &PartitionNode,
    field: &str,
    operator: &str,
    target: &str,
) -> Result<bool, QueryError> {
    let compare_field = match field.to_ascii_lowercase().as_str() {
        "type" => partition.props.partition_class.as_str().to_string(),
        "essence" => partition.essence.len().to_string(),
        "metadata" => partition.header_metadata.len().to_string(),
        _ => return Err(QueryError::UnknownField(field.to_string())),
    };

    evaluate(&compare_field, operator, target)
}

fn evaluate(field: &str, operator: &str, target: &str) -> Result<bool, QueryError> {
    match operator {
        "=" => Ok(field == target),
        "<>" => Ok(field != target),
        _ => Err(QueryError::UnknownOperator(operator.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Weak;

    use super::*;
    use crate::node::{
        EssenceProperties, NodeParent, PartitionProperties, Position, Properties, TestBundle,
    };
    use crate::partition::PartitionClass;
    use crate::sniff::SniffResult;

    fn essence_node(ul: &str, children: Vec<NodeRef>) -> NodeRef {
        Rc::new(Node {
            key: Position::default(),
            length: Position::default(),
            value: Position::default(),
            properties: Properties::Essence(EssenceProperties {
                essence_ul: ul.to_string(),
            }),
            children,
            sniffs: HashMap::new(),
            tests: TestBundle::default(),
            tags: TestBundle::default(),
            parent: RefCell::new(NodeParent::None),
        })
    }

    fn sniffed_node(ul: &str, sniff_key: &str, sniff_field: &str) -> NodeRef {
        let node = essence_node(ul, Vec::new());
        let mut sniffs = HashMap::new();
        sniffs.insert(
            sniff_key.to_string(),
            SniffResult {
                key: "test".to_string(),
                field: sniff_field.to_string(),
                certainty: 0.0,
                data: None,
            },
        );
        // rebuild with the sniffs in place, nodes are immutable once shared
        Rc::new(Node {
            key: node.key,
            length: node.length,
            value: node.value,
            properties: node.properties.clone(),
            children: Vec::new(),
            sniffs,
            tests: TestBundle::default(),
            tags: TestBundle::default(),
            parent: RefCell::new(NodeParent::None),
        })
    }

    const TARGET_UL: &str = "060e2b34.027f0101.0d010101.01010f00";

    /// parent -> middle -> { target, bad sibling }
    fn family() -> (NodeRef, NodeRef, NodeRef, NodeRef) {
        let target = sniffed_node(TARGET_UL, "dummy", "testfield");
        let sibling = essence_node("anInvalidField", Vec::new());
        let middle = essence_node("middle", vec![target.clone(), sibling.clone()]);
        let parent = essence_node("Parent", vec![middle.clone()]);
        (parent, middle, target, sibling)
    }

    fn partition_with(parent: NodeRef) -> PartitionNode {
        PartitionNode {
            key: Position::default(),
            length: Position::default(),
            value: Position::default(),
            header_metadata: vec![parent.clone()],
            essence: vec![parent],
            index_table: None,
            props: PartitionProperties {
                partition_class: PartitionClass::Header,
                ..PartitionProperties::default()
            },
            tests: TestBundle::default(),
            tags: TestBundle::default(),
            partition_index: 0,
            parent: RefCell::new(Weak::new()),
        }
    }

    fn empty_partition() -> Rc<PartitionNode> {
        Rc::new(PartitionNode {
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
            parent: RefCell::new(Weak::new()),
        })
    }

    #[test]
    fn node_search_by_ul() {
        let (parent, _, target, _) = family();
        let found = parent
            .search(&format!("select * where UL = {TARGET_UL}"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(Rc::ptr_eq(&found[0], &target));
    }

    #[test]
    fn node_search_by_sniff_field() {
        let (parent, _, target, _) = family();
        let found = parent.search("select * where sniff:dummy = testfield").unwrap();
        assert_eq!(found.len(), 1);
        assert!(Rc::ptr_eq(&found[0], &target));
    }

    #[test]
    fn node_search_not_equal() {
        let (parent, middle, target, _) = family();
        let found = parent.search("select * where UL <> anInvalidField").unwrap();
        assert_eq!(found.len(), 2);
        assert!(Rc::ptr_eq(&found[0], &middle));
        assert!(Rc::ptr_eq(&found[1], &target));
    }

    #[test]
    fn node_search_errors() {
        let (parent, ..) = family();

        assert_eq!(
            parent
                .search(&format!("selec * where UL = {TARGET_UL}"))
                .unwrap_err()
                .to_string(),
            "first word not select"
        );
        assert_eq!(
            parent
                .search("select * where unknownField = testfield")
                .unwrap_err()
                .to_string(),
            "unknown field \"unknownField\""
        );
        assert_eq!(
            parent
                .search("select * where UL <=> anInvalidField")
                .unwrap_err()
                .to_string(),
            "unknown comparison operator \"<=>\""
        );
        assert!(matches!(
            parent.search("select *").unwrap_err(),
            QueryError::Malformed(..)
        ));
    }

    #[test]
    fn partition_search_tables() {
        let (parent, middle, target, _) = family();
        let partition = partition_with(parent.clone());

        let found = partition
            .search(&format!("select * from metadata where UL = {TARGET_UL}"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(Rc::ptr_eq(&found[0], &target));

        let found = partition
            .search("select * from essence where UL <> anInvalidField")
            .unwrap();
        assert_eq!(found.len(), 3);
        assert!(Rc::ptr_eq(&found[0], &parent));
        assert!(Rc::ptr_eq(&found[1], &middle));

        let all = partition.search("select * from essence").unwrap();
        assert_eq!(all.len(), 1);
        assert!(Rc::ptr_eq(&all[0], &parent));
    }

    #[test]
    fn partition_search_errors() {
        let (parent, ..) = family();
        let partition = partition_with(parent);

        assert_eq!(
            partition
                .search("select * from nowhere")
                .unwrap_err()
                .to_string(),
            "invalid field of \"nowhere\""
        );
        assert_eq!(
            partition
                .search("select * from essence where UL <=> x")
                .unwrap_err()
                .to_string(),
            "unknown comparison operator \"<=>\""
        );
        assert!(matches!(
            partition
                .search("select * from essence where a = b extra")
                .unwrap_err(),
            QueryError::Malformed(..)
        ));
    }

    #[test]
    fn mxf_search_with_conjunction() {
        let (parent, ..) = family();
        let full = Rc::new(partition_with(parent));
        let mxf = MxfNode {
            partitions: vec![full.clone(), empty_partition(), empty_partition()],
            tests: TestBundle::default(),
            tags: TestBundle::default(),
        };

        let found = mxf.search("select * from partition where type = header").unwrap();
        assert_eq!(found.len(), 1);
        assert!(Rc::ptr_eq(&found[0], &full));

        let found = mxf
            .search("select * from partition where metadata <> 0 AND essence <> 0")
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(Rc::ptr_eq(&found[0], &full));

        let none = mxf
            .search("select * from partition where metadata <> 0 AND type = invalid")
            .unwrap();
        assert!(none.is_empty());

        let all = mxf.search("select * from partitions").unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn mxf_search_errors() {
        let mxf = MxfNode {
            partitions: vec![empty_partition()],
            tests: TestBundle::default(),
            tags: TestBundle::default(),
        };

        assert_eq!(
            mxf.search("selec * from partition").unwrap_err().to_string(),
            "first word is not select, please use the correct formatting"
        );
        assert_eq!(
            mxf.search("select * from partition where unknownField = x")
                .unwrap_err()
                .to_string(),
            "unknown field \"unknownField\""
        );
        assert_eq!(
            mxf.search("select * from partition where metadata <=> 1")
                .unwrap_err()
                .to_string(),
            "unknown comparison operator \"<=>\""
        );
        // the first clause holds, so the bad conjunction of the second is hit
        assert_eq!(
            mxf.search("select * from partition where metadata = 0 OR essence = 1")
                .unwrap_err()
                .to_string(),
            "unknown comparison OR"
        );
        assert!(matches!(
            mxf.search("select * from partition where a =").unwrap_err(),
            QueryError::Malformed(..)
        ));
    }
}
