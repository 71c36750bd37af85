//! Builder for the per-pair "latest row" window query.
//!
//! ```text
//! SELECT s, p, o, timestamp, seq FROM (
//!   SELECT ..., ROW_NUMBER() OVER (PARTITION BY s, p ORDER BY timestamp DESC, seq DESC) AS rn
//!   FROM <table> WHERE p = :predicate [AND timestamp < :cutoff]
//! ) ranked WHERE rn = 1 ORDER BY s, p
//! ```
//!
//! Table and column names are validated identifiers and are quoted for the
//! target dialect; the predicate and the cutoff are always bound parameters.
//!
//! SQLite columns are dynamically typed, so a log table may hold epoch
//! milliseconds, numeric text or date-time text. On that dialect the ranking,
//! the cutoff filter and the returned timestamp all go through one expression
//! that normalises every form to epoch milliseconds.

use crate::core::{Cutoff, Pass, Timestamp, TYPE_PREDICATE};
use crate::error::{Result, TwinError};

/// SQL flavour of the target source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Positional `?N` parameters, double-quoted identifiers.
    Sqlite,
    /// Named `:name` parameters, backtick-quoted identifiers.
    Warehouse,
}

impl Dialect {
    fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::Sqlite => format!("\"{}\"", ident),
            Dialect::Warehouse => format!("`{}`", ident),
        }
    }

    /// The timestamp column as epoch milliseconds.
    fn timestamp_millis(&self, column: &str) -> String {
        match self {
            Dialect::Sqlite => format!(
                "(CASE WHEN typeof({c}) IN ('integer', 'real') THEN CAST({c} AS INTEGER) \
                 WHEN {c} NOT GLOB '*[^0-9]*' THEN CAST({c} AS INTEGER) \
                 ELSE CAST(round((julianday({c}) - 2440587.5) * 86400000.0) AS INTEGER) END)",
                c = column
            ),
            Dialect::Warehouse => column.to_string(),
        }
    }

    fn placeholder(&self, position: usize, name: &str) -> String {
        match self {
            Dialect::Sqlite => format!("?{}", position),
            Dialect::Warehouse => format!(":{}", name),
        }
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A possibly qualified table name such as `main.default.sensor_triples`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    parts: Vec<String>,
}

impl TableName {
    /// Split on `.` and validate every part.
    pub fn parse(name: &str) -> Result<Self> {
        let parts: Vec<String> = name.trim().split('.').map(str::to_string).collect();
        if parts.iter().any(|p| !is_identifier(p)) {
            return Err(TwinError::Config(format!("invalid table name '{}'", name)));
        }
        Ok(Self { parts })
    }

    /// Every part quoted for `dialect`.
    pub fn quoted(&self, dialect: Dialect) -> String {
        self.parts.iter().map(|p| dialect.quote(p)).collect::<Vec<_>>().join(".")
    }

    /// Dotted, unquoted.
    pub fn as_string(&self) -> String {
        self.parts.join(".")
    }

    /// Unqualified table name.
    pub fn name(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    /// Everything before the table name, e.g. `main` or `catalog.schema`.
    pub fn qualifier(&self) -> Option<String> {
        match self.parts.len() {
            0 | 1 => None,
            n => Some(self.parts[..n - 1].join(".")),
        }
    }
}

/// Where the log lives and which column breaks timestamp ties.
#[derive(Debug, Clone)]
pub struct TableSpec {
    /// Log table
    pub table: TableName,
    /// Monotonic surrogate column. `None` falls back to ordering by object text.
    pub sequence_column: Option<String>,
}

impl TableSpec {
    /// Table without a sequence column.
    pub fn new(table: &str) -> Result<Self> {
        Ok(Self { table: TableName::parse(table)?, sequence_column: None })
    }

    /// Break timestamp ties on `column`, higher wins.
    pub fn with_sequence_column(mut self, column: &str) -> Result<Self> {
        if !is_identifier(column) {
            return Err(TwinError::Config(format!("invalid sequence column '{}'", column)));
        }
        self.sequence_column = Some(column.to_string());
        Ok(self)
    }
}

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    /// Exact predicate value, `rdf:type` for the type pass
    Predicate(String),
    /// Exclusive upper bound, as epoch milliseconds
    Cutoff(Timestamp),
}

impl QueryParam {
    /// Name used by named-parameter dialects.
    pub fn name(&self) -> &'static str {
        match self {
            QueryParam::Predicate(_) => "predicate",
            QueryParam::Cutoff(_) => "cutoff",
        }
    }
}

/// SQL text plus its parameters.
#[derive(Debug, Clone)]
pub struct RankedQuery {
    /// Query text
    pub sql: String,
    /// In placeholder order.
    pub params: Vec<QueryParam>,
}

/// Newest row per (s, p) for one pass, optionally bounded by the cutoff.
pub fn build_ranked_query(
    spec: &TableSpec,
    dialect: Dialect,
    pass: Pass,
    cutoff: Cutoff,
) -> RankedQuery {
    let q = |ident: &str| dialect.quote(ident);
    let (s, p, o, ts) = (q("s"), q("p"), q("o"), q("timestamp"));
    let ts_value = dialect.timestamp_millis(&ts);

    let (seq_expr, tie_break) = match (&spec.sequence_column, dialect) {
        (Some(col), _) => (q(col), format!("{} DESC", q(col))),
        (None, Dialect::Sqlite) => ("rowid".to_string(), "rowid DESC".to_string()),
        (None, Dialect::Warehouse) => ("0".to_string(), format!("{} DESC", o)),
    };

    let mut params = vec![QueryParam::Predicate(TYPE_PREDICATE.to_string())];
    let comparator = match pass {
        Pass::TypeAssertions => "=",
        Pass::Properties => "<>",
    };
    let mut filter = format!("{} {} {}", p, comparator, dialect.placeholder(1, "predicate"));

    if let Some(bound) = cutoff.bound() {
        params.push(QueryParam::Cutoff(bound));
        filter.push_str(&format!(" AND {} < {}", ts_value, dialect.placeholder(2, "cutoff")));
    }

    let sql = format!(
        "SELECT {s}, {p}, {o}, {ts}, seq FROM (\
         SELECT {s}, {p}, {o}, {ts_value} AS {ts}, {seq_expr} AS seq, \
         ROW_NUMBER() OVER (PARTITION BY {s}, {p} ORDER BY {ts_value} DESC, {tie_break}) AS rn \
         FROM {table} WHERE {filter}\
         ) ranked WHERE rn = 1 ORDER BY {s}, {p}",
        table = spec.table.quoted(dialect),
    );

    RankedQuery { sql, params }
}
