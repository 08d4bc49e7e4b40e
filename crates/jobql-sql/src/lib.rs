//! Compiler - transforms a JobQL query tree to parameterized SQL
//!
//! The tree is walked twice: once to find which tables must be joined, once
//! to emit the WHERE predicate and collect its bound values. Compilation is a
//! pure function of the tree and the row cap.

pub mod joins;
pub mod predicate;
pub mod schema;
pub mod statement;

use jobql_ir::{QueryNode, ValidationError};

pub use predicate::{compile_predicate, Predicate};

/// Statement text plus positional parameters for `$1..$N`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<String>,
}

/// Compile a query tree into a single SELECT capped at `limit` rows.
pub fn compile(tree: &QueryNode, limit: u32) -> Result<CompiledStatement, ValidationError> {
    let fields = joins::required_fields(tree);
    let base = statement::base_statement(&fields);
    let predicate = compile_predicate(tree, 0)?;

    Ok(CompiledStatement {
        sql: statement::finalize(&base, &predicate.sql, limit),
        params: predicate.params,
    })
}
