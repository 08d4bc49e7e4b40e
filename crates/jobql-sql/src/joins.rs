//! Join-set collection

use std::collections::BTreeSet;

use jobql_ir::{Field, QueryNode};

/// Every field referenced by a condition anywhere in the tree.
///
/// How the condition is combined (AND/OR/NOT) does not matter, only that it
/// appears.
pub fn required_fields(node: &QueryNode) -> BTreeSet<Field> {
    let mut fields = BTreeSet::new();
    collect(node, &mut fields);
    fields
}

fn collect(node: &QueryNode, fields: &mut BTreeSet<Field>) {
    match node {
        QueryNode::Condition(condition) => {
            fields.insert(condition.field);
        }
        QueryNode::Operator { children, .. } => {
            for child in children {
                collect(child, fields);
            }
        }
    }
}
