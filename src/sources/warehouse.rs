//! Triple log held in an analytical SQL warehouse.
//!
//! Statements go through the warehouse's statement-execution REST endpoint
//! (`POST {host}/api/2.0/sql/statements`) with inline JSON results. The call
//! waits synchronously up to `wait_timeout_secs`; a statement that has not
//! finished by then is cancelled and reported as unavailable.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{Cutoff, LogEntry, Pass, Timestamp};
use crate::credentials::CredentialProvider;
use crate::error::{Result, TwinError};
use crate::querying::{build_ranked_query, Dialect, QueryParam, TableSpec};
use crate::sources::TripleSource;

const STATEMENTS_PATH: &str = "/api/2.0/sql/statements";

/// Connection settings for the statement-execution API.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Workspace host, with or without `https://`.
    pub host: String,
    /// SQL warehouse to run statements on
    pub warehouse_id: String,
    /// Log table
    pub table: TableSpec,
    /// Server-side wait before a statement is polled
    pub wait_timeout_secs: u64,
    /// Client-side timeout per HTTP request
    pub request_timeout: Duration,
}

impl WarehouseConfig {
    /// 30 s server wait, 60 s request timeout.
    pub fn new(host: &str, warehouse_id: &str, table: TableSpec) -> Self {
        Self {
            host: host.to_string(),
            warehouse_id: warehouse_id.to_string(),
            table,
            wait_timeout_secs: 30,
            request_timeout: Duration::from_secs(60),
        }
    }

    fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }
}

#[derive(Debug, Serialize)]
struct StatementParameter {
    name: &'static str,
    value: String,
    #[serde(rename = "type")]
    sql_type: &'static str,
}

impl From<&QueryParam> for StatementParameter {
    fn from(param: &QueryParam) -> Self {
        match param {
            QueryParam::Predicate(p) => {
                Self { name: param.name(), value: p.clone(), sql_type: "STRING" }
            }
            QueryParam::Cutoff(t) => {
                Self { name: param.name(), value: t.to_sql_literal(), sql_type: "TIMESTAMP" }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    warehouse_id: &'a str,
    statement: &'a str,
    wait_timeout: String,
    on_wait_timeout: &'static str,
    disposition: &'static str,
    format: &'static str,
    parameters: Vec<StatementParameter>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<StatementError>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultChunk {
    #[serde(default)]
    data_array: Vec<Vec<Option<String>>>,
    #[serde(default)]
    next_chunk_internal_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    statement_id: Option<String>,
    status: StatementStatus,
    #[serde(default)]
    result: Option<ResultChunk>,
}

/// Read-only source backed by a SQL warehouse.
pub struct WarehouseSource {
    client: Client,
    config: WarehouseConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl WarehouseSource {
    /// Build the blocking HTTP client. Must not be called from inside an
    /// async runtime.
    pub fn new(config: WarehouseConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        if config.warehouse_id.is_empty() {
            return Err(TwinError::Config("warehouse id is required".to_string()));
        }
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config, credentials })
    }

    /// Attach the bearer token. Provider failures surface as
    /// `DataSourceUnavailable`.
    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.credentials.bearer_token().map_err(|e| {
            TwinError::DataSourceUnavailable(format!("no warehouse credentials: {}", e))
        })?;
        Ok(request.bearer_auth(token))
    }

    /// Map HTTP failures to `DataSourceUnavailable`, dropping cached
    /// credentials when the warehouse rejects them.
    fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, "warehouse rejected credentials");
            self.credentials.invalidate();
        }
        let body = response.text().unwrap_or_default();
        Err(TwinError::DataSourceUnavailable(format!(
            "warehouse returned {}: {}",
            status,
            body.chars().take(200).collect::<String>()
        )))
    }

    fn execute(&self, statement: &str, params: &[QueryParam]) -> Result<Vec<Vec<Option<String>>>> {
        let base = self.config.base_url();
        let request = StatementRequest {
            warehouse_id: &self.config.warehouse_id,
            statement,
            wait_timeout: format!("{}s", self.config.wait_timeout_secs),
            on_wait_timeout: "CANCEL",
            disposition: "INLINE",
            format: "JSON_ARRAY",
            parameters: params.iter().map(StatementParameter::from).collect(),
        };

        let response = self
            .authorized(self.client.post(format!("{}{}", base, STATEMENTS_PATH)))?
            .json(&request)
            .send()?;
        let response: StatementResponse = self.check_status(response)?.json()?;
        let mut chunk = statement_result(response)?;

        let mut rows = std::mem::take(&mut chunk.data_array);
        let mut next = chunk.next_chunk_internal_link.take();
        while let Some(link) = next {
            debug!(link = %link, "fetching next result chunk");
            let response = self.authorized(self.client.get(format!("{}{}", base, link)))?.send()?;
            let mut chunk: ResultChunk = self.check_status(response)?.json()?;
            rows.append(&mut chunk.data_array);
            next = chunk.next_chunk_internal_link;
        }
        Ok(rows)
    }
}

fn statement_result(response: StatementResponse) -> Result<ResultChunk> {
    match response.status.state.as_str() {
        "SUCCEEDED" => Ok(response.result.unwrap_or_default()),
        state => {
            let message = response
                .status
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "no error message".to_string());
            Err(TwinError::DataSourceUnavailable(format!(
                "statement {} ended in state {}: {}",
                response.statement_id.as_deref().unwrap_or("?"),
                state,
                message
            )))
        }
    }
}

/// Convert `[s, p, o, timestamp, seq]` rows.
fn rows_to_entries(rows: Vec<Vec<Option<String>>>) -> Result<Vec<LogEntry>> {
    rows.into_iter()
        .map(|row| {
            let cell = |idx: usize| row.get(idx).cloned().flatten().unwrap_or_default();
            if row.len() < 5 {
                return Err(TwinError::DataSourceUnavailable(format!(
                    "expected 5 columns, warehouse returned {}",
                    row.len()
                )));
            }
            let timestamp = Timestamp::parse(&cell(3)).map_err(|e| {
                TwinError::DataSourceUnavailable(format!("bad timestamp column: {}", e))
            })?;
            let seq = cell(4).parse::<i64>().unwrap_or(0).max(0) as u64;
            Ok(LogEntry { subject: cell(0), predicate: cell(1), object: cell(2), timestamp, seq })
        })
        .collect()
}

impl TripleSource for WarehouseSource {
    fn describe(&self) -> String {
        format!(
            "warehouse {} table {}",
            self.config.warehouse_id,
            self.config.table.table.as_string()
        )
    }

    fn fetch_latest(&self, pass: Pass, cutoff: Cutoff) -> Result<Vec<LogEntry>> {
        let query = build_ranked_query(&self.config.table, Dialect::Warehouse, pass, cutoff);
        let entries = rows_to_entries(self.execute(&query.sql, &query.params)?)?;
        debug!(pass = pass.label(), rows = entries.len(), "warehouse ranked query");
        Ok(entries)
    }
}
