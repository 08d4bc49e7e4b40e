//! Compiled searches executed against a seeded in-memory job postings database

use std::collections::BTreeSet;
use std::time::Duration;

use jobql_duck::{DuckPool, ExecutionError, PoolConfig, QueryResult};
use jobql_ir::{Field, QueryNode};
use jobql_sql::{compile, CompiledStatement};

const SCHEMA: &str = r#"
CREATE TABLE organizations (id INTEGER PRIMARY KEY, name VARCHAR);
CREATE TABLE tech (id INTEGER PRIMARY KEY, name VARCHAR);
CREATE TABLE job_functions (id INTEGER PRIMARY KEY, name VARCHAR);
CREATE TABLE job_posts (id INTEGER PRIMARY KEY, organization_id INTEGER, datetime_pulled TIMESTAMP);
CREATE TABLE job_posts_tech (job_post_id INTEGER, tech_id INTEGER);
CREATE TABLE job_posts_job_functions (job_post_id INTEGER, job_function_id INTEGER);

INSERT INTO organizations VALUES (1, 'Apple Inc.'), (2, 'Google LLC'), (3, 'Acme Corp');
INSERT INTO tech VALUES (1, 'Python 3.11'), (2, '.NET'), (3, 'Rust'), (4, 'Swift');
INSERT INTO job_functions VALUES (1, 'Data Science'), (2, 'Sales'), (3, 'Engineering');

INSERT INTO job_posts VALUES
    (1, 1, TIMESTAMP '2024-01-15 09:30:00'),
    (2, 1, TIMESTAMP '2024-01-16 10:00:00'),
    (3, 2, TIMESTAMP '2024-01-17 11:00:00'),
    (4, 3, TIMESTAMP '2024-01-18 12:00:00'),
    (5, 2, TIMESTAMP '2024-01-19 13:00:00');

INSERT INTO job_posts_tech VALUES (1, 2), (1, 4), (2, 1), (3, 1), (3, 3), (4, 3), (5, 2);
INSERT INTO job_posts_job_functions VALUES (1, 3), (2, 1), (3, 1), (4, 2), (5, 3);
"#;

async fn seeded_pool(max_connections: usize) -> DuckPool {
    let pool = DuckPool::open(&PoolConfig {
        path: None,
        min_connections: 1,
        max_connections,
    })
    .unwrap();
    pool.acquire().await.unwrap().execute_batch(SCHEMA).unwrap();
    pool
}

fn ids(result: &QueryResult) -> BTreeSet<i64> {
    result
        .rows
        .iter()
        .map(|row| row["id"].as_i64().unwrap())
        .collect()
}

async fn search(pool: &DuckPool, tree: QueryNode, limit: u32) -> QueryResult {
    let statement = compile(&tree, limit).unwrap();
    pool.execute(&statement).await.unwrap()
}

#[tokio::test]
async fn test_organization_substring() {
    let pool = seeded_pool(2).await;
    let result = search(&pool, QueryNode::condition(Field::Organization, "apple"), 10).await;

    assert_eq!(ids(&result), BTreeSet::from([1, 2]));
    assert_eq!(result.columns, vec!["id", "datetime_pulled"]);
}

#[tokio::test]
async fn test_and_across_joins() {
    let pool = seeded_pool(2).await;
    let tree = QueryNode::and(vec![
        QueryNode::condition(Field::Organization, "apple"),
        QueryNode::condition(Field::Technology, ".net"),
    ]);

    let result = search(&pool, tree, 10).await;
    assert_eq!(ids(&result), BTreeSet::from([1]));
    assert_eq!(result.rows[0]["datetime_pulled"], "2024-01-15T09:30:00+00:00");
}

#[tokio::test]
async fn test_match_is_case_insensitive() {
    let pool = seeded_pool(2).await;

    let upper = search(&pool, QueryNode::condition(Field::Technology, "PYTHON"), 10).await;
    let lower = search(&pool, QueryNode::condition(Field::Technology, "python"), 10).await;

    assert_eq!(ids(&upper), BTreeSet::from([2, 3]));
    assert_eq!(ids(&upper), ids(&lower));
}

#[tokio::test]
async fn test_negated_or_with_job_function() {
    let pool = seeded_pool(2).await;
    let tree = QueryNode::and(vec![
        QueryNode::not(QueryNode::or(vec![
            QueryNode::condition(Field::Organization, "google"),
            QueryNode::condition(Field::Organization, "apple"),
        ])),
        QueryNode::condition(Field::JobFunction, "sales"),
    ]);

    let result = search(&pool, tree, 10).await;
    assert_eq!(ids(&result), BTreeSet::from([4]));
}

#[tokio::test]
async fn test_postings_are_distinct() {
    let pool = seeded_pool(2).await;
    let tree = QueryNode::or(vec![
        QueryNode::condition(Field::Technology, "python"),
        QueryNode::condition(Field::Technology, "rust"),
    ]);

    let result = search(&pool, tree, 10).await;
    assert_eq!(result.row_count, 3);
    assert_eq!(ids(&result), BTreeSet::from([2, 3, 4]));
}

#[tokio::test]
async fn test_row_cap() {
    let pool = seeded_pool(2).await;
    let result = search(&pool, QueryNode::condition(Field::Organization, ""), 2).await;
    assert_eq!(result.row_count, 2);
}

#[tokio::test]
async fn test_connection_released_after_error() {
    let pool = seeded_pool(1).await;
    let broken = CompiledStatement {
        sql: "SELECT * FROM no_such_table".to_string(),
        params: vec![],
    };

    let err = pool.execute(&broken).await.unwrap_err();
    assert!(matches!(err, ExecutionError::Database(_)));
    assert_eq!(pool.available(), 1);

    let statement = compile(&QueryNode::condition(Field::Technology, "swift"), 10).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), pool.execute(&statement))
        .await
        .expect("pool slot should have been released")
        .unwrap();
    assert_eq!(ids(&result), BTreeSet::from([1]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_searches_share_bounded_pool() {
    let pool = seeded_pool(2).await;

    let handles: Vec<_> = ["apple", "google", "acme", "inc", "llc", "corp", "o", "e"]
        .into_iter()
        .map(|value| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let statement = compile(&QueryNode::condition(Field::Organization, value), 10).unwrap();
                pool.execute(&statement).await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(pool.available(), 2);
    assert!(pool.idle_connections() <= pool.max_connections());
}
