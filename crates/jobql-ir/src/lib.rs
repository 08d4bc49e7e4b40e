//! JobQL query tree
//!
//! Boolean job-search expressions: conditions on a posting field combined
//! with AND/OR/NOT. Trees arrive as JSON (see [`RawQueryNode`]) and are only
//! ever handled in their validated form.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

mod types;
mod wire;
pub use types::*;
pub use wire::RawQueryNode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Condition node is missing its condition")]
    MissingCondition,

    #[error("Operator node is missing its operator")]
    MissingOperator,

    #[error("{op} operator expects {expected} child node(s), got {actual}")]
    Arity {
        op: LogicalOperator,
        expected: &'static str,
        actual: usize,
    },
}

/// A node of the query tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQueryNode", into = "RawQueryNode")]
pub enum QueryNode {
    Condition(Condition),
    Operator {
        op: LogicalOperator,
        children: Vec<QueryNode>,
    },
}

impl QueryNode {
    pub fn condition(field: Field, value: impl Into<String>) -> Self {
        QueryNode::Condition(Condition {
            field,
            value: value.into(),
        })
    }

    pub fn and(children: Vec<QueryNode>) -> Self {
        QueryNode::Operator {
            op: LogicalOperator::And,
            children,
        }
    }

    pub fn or(children: Vec<QueryNode>) -> Self {
        QueryNode::Operator {
            op: LogicalOperator::Or,
            children,
        }
    }

    pub fn not(child: QueryNode) -> Self {
        QueryNode::Operator {
            op: LogicalOperator::Not,
            children: vec![child],
        }
    }

    /// Check the child count of this node only.
    pub fn check_arity(&self) -> Result<(), ValidationError> {
        let QueryNode::Operator { op, children } = self else {
            return Ok(());
        };

        match op {
            LogicalOperator::Not if children.len() != 1 => Err(ValidationError::Arity {
                op: *op,
                expected: "exactly one",
                actual: children.len(),
            }),
            LogicalOperator::And | LogicalOperator::Or if children.is_empty() => {
                Err(ValidationError::Arity {
                    op: *op,
                    expected: "at least one",
                    actual: 0,
                })
            }
            _ => Ok(()),
        }
    }

    /// Check the whole tree. Trees decoded from JSON are already valid; this
    /// is for trees assembled in code.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.check_arity()?;
        if let QueryNode::Operator { children, .. } = self {
            for child in children {
                child.validate()?;
            }
        }
        Ok(())
    }

    /// Calculate fingerprint (SHA-256 of the canonical JSON form)
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("query tree should always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
