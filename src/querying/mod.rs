//! SQL generation for sources that rank inside a database engine.

pub mod ranked_sql;

pub use ranked_sql::{build_ranked_query, Dialect, QueryParam, RankedQuery, TableName, TableSpec};
