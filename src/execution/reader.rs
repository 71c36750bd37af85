//! Point-in-time graph reconstruction.
//!
//! Each call runs the two ranked passes against the source, one after the
//! other, merges them and serializes. Nothing is cached between calls, so a
//! reader can be shared freely across threads.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::core::{Cutoff, Pass, Timestamp};
use crate::error::{Result, TwinError};
use crate::graph::{materialize, serialize_graph, GraphFormat, MalformedPolicy, MaterializedGraph, Namespaces};
use crate::sources::TripleSource;

/// A serialized graph plus what a caller needs to ship it.
#[derive(Debug, Clone, Serialize)]
pub struct SerializedGraph {
    /// Serialized document
    pub body: String,
    /// Media type with charset
    pub content_type: String,
    /// Format of `body`
    #[serde(skip)]
    pub format: GraphFormat,
    /// Triples in the graph
    pub triple_count: usize,
    /// Rows dropped under [`MalformedPolicy::Skip`].
    pub skipped_rows: usize,
}

/// Rebuilds graphs from a [`TripleSource`].
#[derive(Clone)]
pub struct TripleStoreReader {
    source: Arc<dyn TripleSource>,
    namespaces: Namespaces,
    policy: MalformedPolicy,
    format: GraphFormat,
}

impl TripleStoreReader {
    /// Reader with default prefixes, the reject policy and Turtle output.
    pub fn new(source: Arc<dyn TripleSource>) -> Self {
        Self {
            source,
            namespaces: Namespaces::default(),
            policy: MalformedPolicy::default(),
            format: GraphFormat::default(),
        }
    }

    /// Prefixes and base IRI used to resolve identifiers.
    pub fn with_namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Malformed-row handling.
    pub fn with_policy(mut self, policy: MalformedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Format used by [`latest_graph`](Self::latest_graph) and the
    /// point-in-time calls.
    pub fn with_format(mut self, format: GraphFormat) -> Self {
        self.format = format;
        self
    }

    /// The underlying source.
    pub fn source(&self) -> &dyn TripleSource {
        self.source.as_ref()
    }

    /// Configured namespaces.
    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Configured malformed-row policy.
    pub fn policy(&self) -> MalformedPolicy {
        self.policy
    }

    /// Latest value of every (subject, predicate) pair.
    pub fn latest_graph(&self) -> Result<SerializedGraph> {
        self.render(Cutoff::Latest, self.format)
    }

    /// Graph as of `cutoff`, which is parsed with [`Timestamp::parse`].
    /// Only entries strictly before the cutoff count.
    pub fn point_in_time_graph(&self, cutoff: &str) -> Result<SerializedGraph> {
        if cutoff.trim().is_empty() {
            return Err(TwinError::InvalidArgument("cutoff timestamp is required".to_string()));
        }
        self.point_in_time_graph_at(Timestamp::parse(cutoff)?)
    }

    /// Graph from rows strictly before `cutoff`.
    pub fn point_in_time_graph_at(&self, cutoff: Timestamp) -> Result<SerializedGraph> {
        self.render(Cutoff::Before(cutoff), self.format)
    }

    /// Both passes, merged, without serializing.
    pub fn materialize(&self, cutoff: Cutoff) -> Result<MaterializedGraph> {
        let [type_rows, property_rows] =
            Pass::ALL.map(|pass| self.source.fetch_latest(pass, cutoff));
        let (type_rows, property_rows) = (type_rows?, property_rows?);

        debug!(
            source = %self.source.describe(),
            ?cutoff,
            type_rows = type_rows.len(),
            property_rows = property_rows.len(),
            "fetched ranked passes"
        );

        materialize(&type_rows, &property_rows, &self.namespaces, self.policy)
    }

    /// Reconstruct at `cutoff` and serialize as `format`.
    pub fn render(&self, cutoff: Cutoff, format: GraphFormat) -> Result<SerializedGraph> {
        let graph = self.materialize(cutoff)?;
        let body = serialize_graph(&graph, &self.namespaces, format)?;

        info!(
            ?cutoff,
            format = format.name(),
            triples = graph.len(),
            skipped = graph.skipped().len(),
            "reconstructed graph"
        );

        Ok(SerializedGraph {
            body,
            content_type: format.content_type(),
            format,
            triple_count: graph.len(),
            skipped_rows: graph.skipped().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogEntry;
    use crate::sources::MemoryTripleLog;

    struct Unreachable;

    impl TripleSource for Unreachable {
        fn describe(&self) -> String {
            "unreachable".to_string()
        }

        fn fetch_latest(&self, _pass: Pass, _cutoff: Cutoff) -> Result<Vec<LogEntry>> {
            Err(TwinError::DataSourceUnavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn test_missing_cutoff_is_invalid_argument() {
        let reader = TripleStoreReader::new(Arc::new(MemoryTripleLog::new()));
        assert!(matches!(reader.point_in_time_graph(""), Err(TwinError::InvalidArgument(_))));
        assert!(matches!(
            reader.point_in_time_graph("yesterday-ish"),
            Err(TwinError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_source_failure_propagates() {
        let reader = TripleStoreReader::new(Arc::new(Unreachable));
        assert!(matches!(reader.latest_graph(), Err(TwinError::DataSourceUnavailable(_))));
    }

    #[test]
    fn test_empty_log_gives_empty_graph() {
        let reader = TripleStoreReader::new(Arc::new(MemoryTripleLog::new()))
            .with_format(GraphFormat::NTriples);
        let graph = reader.latest_graph().unwrap();
        assert_eq!(graph.triple_count, 0);
        assert_eq!(graph.content_type, "application/n-triples; charset=utf-8");
    }
}
