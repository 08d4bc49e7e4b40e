//! JSON wire shape of a query node
//!
//! The request body carries a string `type` tag with optional payload fields.
//! Conversion into [`QueryNode`] is where the tag and payloads are checked.

use serde::{Deserialize, Serialize};

use crate::{Condition, LogicalOperator, QueryNode, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawQueryNode {
    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<LogicalOperator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RawQueryNode>>,
}

impl TryFrom<RawQueryNode> for QueryNode {
    type Error = ValidationError;

    fn try_from(raw: RawQueryNode) -> Result<Self, Self::Error> {
        match raw.node_type.as_str() {
            "condition" => raw
                .condition
                .map(QueryNode::Condition)
                .ok_or(ValidationError::MissingCondition),
            "operator" => {
                let op = raw.operator.ok_or(ValidationError::MissingOperator)?;
                let children = raw
                    .children
                    .unwrap_or_default()
                    .into_iter()
                    .map(QueryNode::try_from)
                    .collect::<Result<Vec<_>, _>>()?;

                let node = QueryNode::Operator { op, children };
                node.check_arity()?;
                Ok(node)
            }
            other => Err(ValidationError::UnknownNodeType(other.to_string())),
        }
    }
}

impl From<QueryNode> for RawQueryNode {
    fn from(node: QueryNode) -> Self {
        match node {
            QueryNode::Condition(condition) => RawQueryNode {
                node_type: "condition".to_string(),
                operator: None,
                condition: Some(condition),
                children: None,
            },
            QueryNode::Operator { op, children } => RawQueryNode {
                node_type: "operator".to_string(),
                operator: Some(op),
                condition: None,
                children: Some(children.into_iter().map(RawQueryNode::from).collect()),
            },
        }
    }
}
