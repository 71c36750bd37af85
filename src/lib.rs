//! # twingraph
//!
//! Point-in-time RDF graphs from an append-only, versioned triple log.
//!
//! The log holds `(subject, predicate, object, timestamp)` rows. For a cutoff
//! `T`, the graph contains, for every (subject, predicate) pair, the object of
//! the newest row strictly before `T`. Type assertions (`rdf:type`) keep their
//! objects as IRIs; every other object becomes a plain literal.
//!
//! ## Features
//!
//! - Two ranked passes (type assertions, then properties) merged into one graph
//! - Log backends: in-memory, a durable segmented log, SQLite and a SQL warehouse
//! - Identifier sanitization, prefix expansion and an explicit malformed-row policy
//! - Turtle, N-Triples and RDF/XML output, and an axum HTTP surface
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use twingraph::{MemoryTripleLog, Result, TripleStoreReader};
//!
//! fn example() -> Result<()> {
//!     let log = MemoryTripleLog::from_rows([
//!         ("ex:c1", "rdf:type", "ex:Component", 10),
//!         ("ex:c1", "ex:temp", "72.5", 10),
//!         ("ex:c1", "ex:temp", "75.0", 20),
//!     ]);
//!     let reader = TripleStoreReader::new(Arc::new(log));
//!     let graph = reader.point_in_time_graph("15")?;
//!     assert_eq!(graph.triple_count, 2);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

/// Core data structures and types
pub mod core;

/// Bearer-token providers for remote sources
pub mod credentials;

/// Command-line and environment configuration
pub mod config;

/// Error types
pub mod error;

/// Two-pass reconstruction
pub mod execution;

/// Graph materialization, sanitization and serialization
pub mod graph;

/// HTTP API
pub mod http;

/// Sensor-reading to triple mapping
pub mod mapping;

/// Parsers for ingestion input
pub mod parsing;

/// Ranked SQL for relational sources
pub mod querying;

/// Triple log backends
pub mod sources;

/// Dictionary-encoded segmented storage
pub mod storage;

// Re-export commonly used types
pub use crate::core::{Cutoff, LogEntry, Pass, Timestamp};
pub use error::{NodeField, Result, TwinError};
pub use execution::{SerializedGraph, TripleStoreReader};
pub use graph::{GraphFormat, MalformedPolicy, MaterializedGraph, Namespaces};
pub use sources::{MemoryTripleLog, SegmentedTripleLog, SqliteTripleSource, TripleSink, TripleSource};
