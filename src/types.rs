//! Result types returned by queries and writes.
//!
//! These mirror the JSON the cluster returns from `/db/query` and
//! `/db/execute`. A successful call can still carry per-statement failures:
//! each result has its own `error` field, which is set when that statement
//! failed on the server. Such failures never turn the call itself into an
//! `Err`.
//!
//! # Examples
//!
//! ```rust
//! use rqlite_client::types::QueryResponse;
//!
//! let body = r#"{"results":[{"columns":["id","name"],"types":["integer","text"],
//!                "values":[[1,"fiona"]],"time":0.0001}],"time":0.0002}"#;
//! let response: QueryResponse = serde_json::from_str(body).unwrap();
//! let result = &response.results[0];
//! assert!(result.is_ok());
//! assert_eq!(result.get(0, "name").and_then(|v| v.as_str()), Some("fiona"));
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Response to a query request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// One entry per statement, in request order.
    #[serde(default, deserialize_with = "nullable")]
    pub results: Vec<QueryResult>,
    /// Server-side processing time in seconds.
    #[serde(default, rename = "time")]
    pub timing: f64,
}

/// Result of a single query statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub columns: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub types: Vec<String>,
    /// Rows, each holding one value per column.
    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<Vec<Value>>,
    #[serde(default, rename = "time")]
    pub timing: f64,
}

impl QueryResult {
    /// Whether the statement succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.as_deref().map_or(true, str::is_empty)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` in row `row`.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.values.get(row)?.get(idx)
    }

    pub fn row_count(&self) -> usize {
        self.values.len()
    }
}

/// Response to an execute request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    /// One entry per statement, in request order.
    #[serde(default, deserialize_with = "nullable")]
    pub results: Vec<ExecuteResult>,
    /// Server-side processing time in seconds.
    #[serde(default, rename = "time")]
    pub timing: f64,
    /// Raft log position of the write, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raft: Option<RaftResponse>,
}

/// Result of a single write statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub last_insert_id: i64,
    #[serde(default)]
    pub rows_affected: i64,
    #[serde(default, rename = "time")]
    pub timing: f64,
}

impl ExecuteResult {
    /// Whether the statement succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.as_deref().map_or(true, str::is_empty)
    }
}

/// Raft metadata attached to a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaftResponse {
    #[serde(default)]
    pub index: u64,
    #[serde(default)]
    pub node_id: String,
}

macro_rules! impl_statement_errors {
    ($response:ty) => {
        impl $response {
            /// Whether any statement failed.
            pub fn has_errors(&self) -> bool {
                self.results.iter().any(|r| !r.is_ok())
            }

            /// `(statement index, message)` for each failed statement.
            pub fn errors(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
                self.results.iter().enumerate().filter_map(|(i, r)| {
                    r.error.as_deref().filter(|e| !e.is_empty()).map(|e| (i, e))
                })
            }
        }
    };
}

impl_statement_errors!(QueryResponse);
impl_statement_errors!(ExecuteResponse);

/// Treat an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
