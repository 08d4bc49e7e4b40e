//! Field to table mapping for the job postings schema

use jobql_ir::Field;

pub const SELECT_CLAUSE: &str = "SELECT DISTINCT jp.id, jp.datetime_pulled";
pub const FROM_CLAUSE: &str = "FROM job_posts jp";

/// Joins and filter column needed to test one field
#[derive(Debug)]
pub struct FieldMapping {
    pub field: Field,
    pub joins: &'static [&'static str],
    pub column: &'static str,
}

/// In join emission order
pub static FIELD_MAPPINGS: [FieldMapping; 3] = [
    FieldMapping {
        field: Field::Organization,
        joins: &["INNER JOIN organizations o ON jp.organization_id = o.id"],
        column: "o.name",
    },
    FieldMapping {
        field: Field::Technology,
        joins: &[
            "INNER JOIN job_posts_tech jpt ON jp.id = jpt.job_post_id",
            "INNER JOIN tech t ON jpt.tech_id = t.id",
        ],
        column: "t.name",
    },
    FieldMapping {
        field: Field::JobFunction,
        joins: &[
            "INNER JOIN job_posts_job_functions jpjf ON jp.id = jpjf.job_post_id",
            "INNER JOIN job_functions jf ON jpjf.job_function_id = jf.id",
        ],
        column: "jf.name",
    },
];

pub fn mapping(field: Field) -> &'static FieldMapping {
    match field {
        Field::Organization => &FIELD_MAPPINGS[0],
        Field::Technology => &FIELD_MAPPINGS[1],
        Field::JobFunction => &FIELD_MAPPINGS[2],
    }
}
