//! SELECT/JOIN assembly and the final statement text

use std::collections::BTreeSet;

use jobql_ir::Field;

use crate::schema::{FIELD_MAPPINGS, FROM_CLAUSE, SELECT_CLAUSE};

/// SELECT and JOIN clauses for the given join-set.
///
/// Joins come out in table order regardless of the order fields appear in the
/// query, so equal join-sets always give equal text.
pub fn base_statement(fields: &BTreeSet<Field>) -> String {
    let mut parts = vec![SELECT_CLAUSE, FROM_CLAUSE];

    for mapping in FIELD_MAPPINGS.iter().filter(|m| fields.contains(&m.field)) {
        parts.extend(mapping.joins.iter().copied());
    }

    parts.join(" ")
}

/// The row cap is a literal, not a bound parameter.
pub fn finalize(base: &str, predicate: &str, limit: u32) -> String {
    format!("{} WHERE {} LIMIT {}", base, predicate, limit)
}
