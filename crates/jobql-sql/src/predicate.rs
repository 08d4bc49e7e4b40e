//! WHERE predicate emission
//!
//! Values never appear in the predicate text. Each condition emits a `$N`
//! placeholder and pushes its value onto the parameter list, so the Nth
//! parameter always belongs to the Nth placeholder from the left.

use jobql_ir::{Condition, LogicalOperator, QueryNode, ValidationError};

use crate::schema;

/// Case-insensitive pattern match
pub const MATCH_OPERATOR: &str = "ILIKE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub sql: String,
    pub params: Vec<String>,
    /// Number of placeholders used so far, including this predicate's
    pub next_offset: usize,
}

/// Compile `node`, numbering placeholders from `offset + 1`.
pub fn compile_predicate(node: &QueryNode, offset: usize) -> Result<Predicate, ValidationError> {
    match node {
        QueryNode::Condition(condition) => Ok(compile_condition(condition, offset)),
        QueryNode::Operator { op, children } => {
            node.check_arity()?;
            match op {
                // arity checked above
                LogicalOperator::Not => compile_not(&children[0], offset),
                LogicalOperator::And => compile_junction(children, " AND ", offset),
                LogicalOperator::Or => compile_junction(children, " OR ", offset),
            }
        }
    }
}

/// `value` wrapped for substring matching
pub fn substring_pattern(value: &str) -> String {
    format!("%{}%", value)
}

fn compile_condition(condition: &Condition, offset: usize) -> Predicate {
    let column = schema::mapping(condition.field).column;
    let index = offset + 1;

    Predicate {
        sql: format!("{} {} ${}", column, MATCH_OPERATOR, index),
        params: vec![substring_pattern(&condition.value)],
        next_offset: index,
    }
}

fn compile_not(child: &QueryNode, offset: usize) -> Result<Predicate, ValidationError> {
    let inner = compile_predicate(child, offset)?;
    Ok(Predicate {
        sql: format!("NOT ({})", inner.sql),
        ..inner
    })
}

fn compile_junction(
    children: &[QueryNode],
    separator: &str,
    offset: usize,
) -> Result<Predicate, ValidationError> {
    let mut clauses = Vec::with_capacity(children.len());
    let mut params = Vec::new();
    let mut next_offset = offset;

    for child in children {
        let compiled = compile_predicate(child, next_offset)?;
        clauses.push(format!("({})", compiled.sql));
        params.extend(compiled.params);
        next_offset = compiled.next_offset;
    }

    Ok(Predicate {
        sql: clauses.join(separator),
        params,
        next_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobql_ir::Field;

    #[test]
    fn test_condition() {
        let node = QueryNode::condition(Field::Organization, "apple");
        let predicate = compile_predicate(&node, 0).unwrap();

        assert_eq!(predicate.sql, "o.name ILIKE $1");
        assert_eq!(predicate.params, vec!["%apple%"]);
        assert_eq!(predicate.next_offset, 1);
    }

    #[test]
    fn test_offset_shifts_placeholders() {
        let node = QueryNode::or(vec![
            QueryNode::condition(Field::Technology, "go"),
            QueryNode::condition(Field::Technology, "rust"),
        ]);
        let predicate = compile_predicate(&node, 4).unwrap();

        assert_eq!(predicate.sql, "(t.name ILIKE $5) OR (t.name ILIKE $6)");
        assert_eq!(predicate.next_offset, 6);
    }

    #[test]
    fn test_single_child_junction_is_parenthesized() {
        let node = QueryNode::and(vec![QueryNode::condition(Field::JobFunction, "sales")]);
        let predicate = compile_predicate(&node, 0).unwrap();
        assert_eq!(predicate.sql, "(jf.name ILIKE $1)");
    }

    #[test]
    fn test_double_negation() {
        let node = QueryNode::not(QueryNode::not(QueryNode::condition(Field::Technology, "php")));
        let predicate = compile_predicate(&node, 0).unwrap();
        assert_eq!(predicate.sql, "NOT (NOT (t.name ILIKE $1))");
        assert_eq!(predicate.params, vec!["%php%"]);
    }

    #[test]
    fn test_value_is_not_interpolated() {
        let node = QueryNode::condition(Field::Organization, "x'; DROP TABLE job_posts; --");
        let predicate = compile_predicate(&node, 0).unwrap();

        assert_eq!(predicate.sql, "o.name ILIKE $1");
        assert_eq!(predicate.params, vec!["%x'; DROP TABLE job_posts; --%"]);
    }

    #[test]
    fn test_empty_junction_fails() {
        let node = QueryNode::and(vec![QueryNode::condition(Field::Technology, "c"), QueryNode::or(vec![])]);
        let err = compile_predicate(&node, 0).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Arity {
                op: LogicalOperator::Or,
                expected: "at least one",
                actual: 0,
            }
        );
    }

    #[test]
    fn test_not_with_two_children_fails() {
        let node = QueryNode::Operator {
            op: LogicalOperator::Not,
            children: vec![
                QueryNode::condition(Field::Technology, "a"),
                QueryNode::condition(Field::Technology, "b"),
            ],
        };
        assert!(matches!(
            compile_predicate(&node, 0),
            Err(ValidationError::Arity { op: LogicalOperator::Not, actual: 2, .. })
        ));
    }
}
