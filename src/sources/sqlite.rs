//! Relational triple log in SQLite.
//!
//! The table has columns `s`, `p`, `o` (text) and `timestamp`. Appends write
//! INTEGER epoch milliseconds; existing tables may also hold date-time text,
//! which the ranked query normalises before ranking and filtering. The
//! implicit `rowid` is the insertion sequence and breaks ties between equal
//! timestamps.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::core::{Cutoff, LogEntry, Pass, Timestamp};
use crate::error::{Result, TwinError};
use crate::querying::{build_ranked_query, Dialect, QueryParam, TableSpec};
use crate::sources::{TripleSink, TripleSource};

/// A log table in a SQLite database.
pub struct SqliteTripleSource {
    conn: Mutex<Connection>,
    spec: TableSpec,
    location: String,
}

impl SqliteTripleSource {
    /// Open (or create) a database file and make sure the log table exists.
    pub fn open(path: &Path, table: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, table, path.display().to_string())
    }

    /// Private in-memory database.
    pub fn open_in_memory(table: &str) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, table, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, table: &str, location: String) -> Result<Self> {
        let source = Self { conn: Mutex::new(conn), spec: TableSpec::new(table)?, location };
        source.ensure_schema()?;
        Ok(source)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TwinError::DataSourceUnavailable("sqlite connection lock poisoned".into()))
    }

    /// Create the table and its pair index if missing.
    pub fn ensure_schema(&self) -> Result<()> {
        let table = self.spec.table.quoted(Dialect::Sqlite);
        let name = self.spec.table.name();
        // An index lives in its table's schema and names the table unqualified.
        let index = match self.spec.table.qualifier() {
            Some(schema) => format!("\"{}\".\"{}_pair_ts\"", schema, name),
            None => format!("\"{}_pair_ts\"", name),
        };
        self.lock()?.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                s TEXT NOT NULL,
                p TEXT NOT NULL,
                o TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS {index} ON \"{name}\" (p, s, timestamp);"
        ))?;
        Ok(())
    }
}

/// Read a cell as text whatever its storage class.
fn text_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Null => String::new(),
        ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    })
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Timestamp> {
    match row.get_ref(idx)? {
        ValueRef::Integer(millis) => Ok(Timestamp::from_millis(millis)),
        ValueRef::Text(bytes) => Timestamp::parse(&String::from_utf8_lossy(bytes))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "timestamp".to_string(),
            other.data_type(),
        )),
    }
}

impl TripleSource for SqliteTripleSource {
    fn describe(&self) -> String {
        format!("sqlite table {} at {}", self.spec.table.as_string(), self.location)
    }

    fn fetch_latest(&self, pass: Pass, cutoff: Cutoff) -> Result<Vec<LogEntry>> {
        let query = build_ranked_query(&self.spec, Dialect::Sqlite, pass, cutoff);
        let values: Vec<Value> = query
            .params
            .iter()
            .map(|param| match param {
                QueryParam::Predicate(p) => Value::Text(p.clone()),
                QueryParam::Cutoff(t) => Value::Integer(t.as_millis()),
            })
            .collect();

        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&query.sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| {
            Ok(LogEntry {
                subject: text_at(row, 0)?,
                predicate: text_at(row, 1)?,
                object: text_at(row, 2)?,
                timestamp: timestamp_at(row, 3)?,
                seq: row.get::<_, i64>(4)? as u64,
            })
        })?;

        let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(pass = pass.label(), rows = entries.len(), "sqlite ranked query");
        Ok(entries)
    }
}

impl TripleSink for SqliteTripleSource {
    fn append(
        &self,
        subject: &str,
        predicate: &str,
        object: &str,
        timestamp: Timestamp,
    ) -> Result<u64> {
        let conn = self.lock()?;
        let sql = format!(
            "INSERT INTO {} (s, p, o, timestamp) VALUES (?1, ?2, ?3, ?4)",
            self.spec.table.quoted(Dialect::Sqlite)
        );
        conn.prepare_cached(&sql)?.execute(params![subject, predicate, object, timestamp.as_millis()])?;
        Ok(conn.last_insert_rowid() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_query_picks_latest_per_pair() {
        let source = SqliteTripleSource::open_in_memory("sensor_triples").unwrap();
        source.append("ex:c1", "ex:temp", "72.5", Timestamp::from_millis(10)).unwrap();
        source.append("ex:c1", "ex:temp", "75.0", Timestamp::from_millis(20)).unwrap();
        source.append("ex:c1", "rdf:type", "ex:Component", Timestamp::from_millis(10)).unwrap();

        let latest = source.fetch_latest(Pass::Properties, Cutoff::Latest).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].object, "75.0");

        let earlier = source
            .fetch_latest(Pass::Properties, Cutoff::Before(Timestamp::from_millis(15)))
            .unwrap();
        assert_eq!(earlier[0].object, "72.5");

        let types = source.fetch_latest(Pass::TypeAssertions, Cutoff::Latest).unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].object, "ex:Component");
    }

    #[test]
    fn test_rowid_breaks_timestamp_ties() {
        let source = SqliteTripleSource::open_in_memory("t").unwrap();
        source.append("s", "p", "first", Timestamp::from_millis(5)).unwrap();
        source.append("s", "p", "second", Timestamp::from_millis(5)).unwrap();

        let latest = source.fetch_latest(Pass::Properties, Cutoff::Latest).unwrap();
        assert_eq!(latest[0].object, "second");
    }

    #[test]
    fn test_numeric_objects_read_as_text() {
        let source = SqliteTripleSource::open_in_memory("t").unwrap();
        source
            .lock()
            .unwrap()
            .execute("INSERT INTO \"t\" (s, p, o, timestamp) VALUES ('s', 'p', 42.5, 1)", [])
            .unwrap();

        let latest = source.fetch_latest(Pass::Properties, Cutoff::Latest).unwrap();
        assert_eq!(latest[0].object, "42.5");
    }

    #[test]
    fn test_text_timestamps_respect_cutoff() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sensor_triples (s TEXT, p TEXT, o TEXT, timestamp TEXT);
             INSERT INTO sensor_triples VALUES ('s', 'p', 'old', '2024-01-01 00:00:00');
             INSERT INTO sensor_triples VALUES ('s', 'p', 'new', '2024-06-01T00:00:00Z');
             INSERT INTO sensor_triples VALUES ('s', 'q', 'millis', '1704067200000');",
        )
        .unwrap();
        let source =
            SqliteTripleSource::from_connection(conn, "sensor_triples", ":memory:".to_string())
                .unwrap();
        source.append("s", "r", "integer", Timestamp::from_millis(1_704_067_200_000)).unwrap();

        let latest = source.fetch_latest(Pass::Properties, Cutoff::Latest).unwrap();
        assert_eq!(latest.len(), 3);
        assert_eq!(latest[0].object, "new");

        let cutoff = Cutoff::Before(Timestamp::parse("2024-03-01").unwrap());
        let earlier = source.fetch_latest(Pass::Properties, cutoff).unwrap();
        let objects: Vec<&str> = earlier.iter().map(|e| e.object.as_str()).collect();
        assert_eq!(objects, vec!["old", "millis", "integer"]);
        assert_eq!(earlier[0].timestamp, Timestamp::parse("2024-01-01 00:00:00").unwrap());

        let before_all = Cutoff::Before(Timestamp::parse("2023-12-31").unwrap());
        assert!(source.fetch_latest(Pass::Properties, before_all).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        assert!(matches!(
            SqliteTripleSource::open_in_memory("t; DROP TABLE x"),
            Err(TwinError::Config(_))
        ));
    }
}
