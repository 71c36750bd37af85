//! Reconstruction of point-in-time graphs from a versioned triple log.
//!
//! # Components
//!
//! - **rank** - last-write-wins reduction shared by the in-process sources
//! - **reader** - [`TripleStoreReader`], the two-pass reconstruction entry point
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use twingraph::execution::TripleStoreReader;
//! use twingraph::sources::MemoryTripleLog;
//!
//! let log = MemoryTripleLog::from_rows([("ex:c1", "ex:temp", "72.5", 10)]);
//! let reader = TripleStoreReader::new(Arc::new(log));
//! let graph = reader.point_in_time_graph("15")?;
//! println!("{}", graph.body);
//! ```

pub mod rank;
pub mod reader;

pub use reader::{SerializedGraph, TripleStoreReader};
