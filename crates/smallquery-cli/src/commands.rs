//! The `query` and `upload` commands.
//!
//! Each command reports its own failures to the terminal and returns
//! whether it succeeded.

use std::path::Path;

use colored::Colorize;
use tracing::{debug, warn};

use smallquery_client::{Client, ResolutionError};
use smallquery_common::QueryRequest;

use crate::formatter::{self, report_error};

/// Rewrites the friendly table name in `sql`.
///
/// A missing mapping (or no bucket to keep one in) leaves the query
/// unchanged. An unreadable or malformed mapping is an error.
pub async fn resolve_table(client: &Client, sql: &str) -> Result<String, ResolutionError> {
    match client.resolve(sql).await {
        Ok(resolved) => Ok(resolved),
        Err(ResolutionError::NotFound { key }) => {
            warn!("no table mapping at {}, running query as written", key);
            Ok(sql.to_string())
        }
        Err(ResolutionError::NotConfigured) => {
            debug!("no bucket configured, skipping table resolution");
            Ok(sql.to_string())
        }
        Err(e) => Err(e),
    }
}

/// Prints the banner shown before a one-off query.
pub fn announce_query(sql: &str, limit: i64) {
    let message = format!(
        "Executing query {} with max rows returned = {}",
        sql,
        QueryRequest::clamp_limit(Some(limit))
    );
    println!("{}", message.blue().bold());
}

/// Resolves, submits and renders one query.
///
/// Results go to the terminal, or to `output` as CSV when given.
pub async fn run_query(client: &Client, sql: &str, limit: i64, output: Option<&Path>) -> bool {
    let sql = match resolve_table(client, sql).await {
        Ok(sql) => sql,
        Err(e) => {
            report_error(&format!("Unable to resolve table name: {}", e));
            return false;
        }
    };

    let outcome = match client.query(&sql, Some(limit)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            report_error(&e.to_string());
            return false;
        }
    };

    let rendered = match output {
        Some(path) => formatter::render_csv(&outcome.result, path),
        None => formatter::render_table(&outcome.result),
    };

    if rendered {
        println!("{}", formatter::format_timing(outcome.result.query_ms));
    }
    rendered
}

/// Uploads `from_url` to `to_path` and optionally registers `table_name`.
pub async fn upload(client: &Client, from_url: &str, to_path: &str, table_name: Option<&str>) -> bool {
    match client.upload(from_url, to_path, table_name).await {
        Ok(outcome) => {
            println!("Uploaded {} to your data bucket at {}", from_url, to_path);
            if let Some(mapping) = outcome.mapping {
                println!("Table {} now refers to {}", mapping.table_name, mapping.path);
            }
            true
        }
        Err(e) => {
            report_error(&format!("Upload failed: {}", e));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallquery_client::ClientConfig;
    use smallquery_common::protocol::invocation_path;
    use smallquery_common::{DEFAULT_QUERY_FUNCTION, METADATA_KEY};
    use tempfile::TempDir;

    fn client(endpoint: &str, bucket: Option<&TempDir>) -> Client {
        let config = ClientConfig::new().endpoint(endpoint);
        let config = match bucket {
            Some(dir) => config.bucket_url(format!("file://{}", dir.path().display())),
            None => config,
        };
        Client::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_run_query_renders_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", invocation_path(DEFAULT_QUERY_FUNCTION).as_str())
            .match_body(mockito::Matcher::Json(
                serde_json::json!({"query": "select 1", "limit": 1000}),
            ))
            .with_status(200)
            .with_body(r#"{"results": "[[1]]", "column_names": ["one"], "query_ms": 0.42}"#)
            .create_async()
            .await;

        let client = client(&server.url(), None);
        assert!(run_query(&client, "select 1", 5000, None).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_query_remote_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", invocation_path(DEFAULT_QUERY_FUNCTION).as_str())
            .with_status(200)
            .with_header("x-amz-function-error", "Unhandled")
            .with_body(r#"{"errorMessage": "syntax error"}"#)
            .create_async()
            .await;

        let client = client(&server.url(), None);
        assert!(!run_query(&client, "selec 1", 10, None).await);
    }

    #[tokio::test]
    async fn test_run_query_writes_csv() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", invocation_path(DEFAULT_QUERY_FUNCTION).as_str())
            .with_status(200)
            .with_body(r#"{"results": "[[1, \"a\"]]", "column_names": ["n", "s"], "query_ms": 1.5}"#)
            .create_async()
            .await;

        let out_dir = TempDir::new().unwrap();
        let path = out_dir.path().join("result.csv");
        let client = client(&server.url(), None);

        assert!(run_query(&client, "select 1, 'a'", 10, Some(&path)).await);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "n,s\n1,a\n");
    }

    #[tokio::test]
    async fn test_missing_mapping_runs_query_as_written() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", invocation_path(DEFAULT_QUERY_FUNCTION).as_str())
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"query": "SELECT * FROM taxi"}),
            ))
            .with_status(200)
            .with_body(r#"{"results": "[]", "column_names": ["a"], "query_ms": 0.1}"#)
            .create_async()
            .await;

        let bucket = TempDir::new().unwrap();
        let client = client(&server.url(), Some(&bucket));
        assert!(run_query(&client, "SELECT * FROM taxi", 10, None).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_mapping_aborts_before_invoking() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let bucket = TempDir::new().unwrap();
        let key = bucket.path().join(METADATA_KEY);
        std::fs::create_dir_all(key.parent().unwrap()).unwrap();
        std::fs::write(&key, "not json").unwrap();

        let client = client(&server.url(), Some(&bucket));
        assert!(!run_query(&client, "SELECT * FROM taxi", 10, None).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_reports_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#""error""#)
            .create_async()
            .await;

        let client = client(&server.url(), None);
        assert!(!upload(&client, "http://example.com/x.csv", "uploads/x.csv", None).await);
    }
}
