//! From ranked log rows to an RDF graph and its serialization.

pub mod materialize;
pub mod namespaces;
pub mod sanitize;
pub mod serialize;

pub use materialize::{materialize, MalformedPolicy, MaterializedGraph, SkippedRow};
pub use namespaces::{Namespaces, DEFAULT_BASE_IRI};
pub use serialize::{serialize_graph, GraphFormat};
