//! Merge of the two ranked passes into one in-memory graph.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use oxigraph::model::vocab::rdf;
use oxigraph::model::{NamedNode, Term, Triple};
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::{LogEntry, Timestamp};
use crate::error::{NodeField, Result, TwinError};
use crate::graph::namespaces::Namespaces;
use crate::graph::sanitize::{identifier, literal};

/// What to do with a row that cannot become a valid triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Fail the whole reconstruction.
    #[default]
    Reject,
    /// Drop the row, log it and report it in [`MaterializedGraph::skipped`].
    Skip,
}

impl FromStr for MalformedPolicy {
    type Err = TwinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" | "fail" => Ok(MalformedPolicy::Reject),
            "skip" => Ok(MalformedPolicy::Skip),
            other => Err(TwinError::Config(format!(
                "unknown malformed-row policy '{}' (expected reject or skip)",
                other
            ))),
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPolicy::Reject => write!(f, "reject"),
            MalformedPolicy::Skip => write!(f, "skip"),
        }
    }
}

/// A row dropped under [`MalformedPolicy::Skip`].
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    /// The row as read from the log.
    pub entry: LogEntry,
    /// Why it could not become a triple.
    pub reason: String,
}

#[derive(Debug, Clone)]
struct Placed {
    triple: Triple,
    /// Type-pass triples outrank property-pass ones, then newer rows win.
    rank: (bool, Timestamp, u64),
}

/// At most one triple per (subject, predicate), iterated in IRI order.
#[derive(Debug, Clone, Default)]
pub struct MaterializedGraph {
    triples: BTreeMap<(String, String), Placed>,
    skipped: Vec<SkippedRow>,
}

impl MaterializedGraph {
    /// Number of triples.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// True when no triple survived.
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Triples ordered by subject, then predicate.
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.values().map(|p| &p.triple)
    }

    /// Object of the pair, looked up by full IRIs.
    pub fn object_of(&self, subject: &str, predicate: &str) -> Option<&Term> {
        self.triples
            .get(&(subject.to_string(), predicate.to_string()))
            .map(|p| &p.triple.object)
    }

    /// Rows dropped under [`MalformedPolicy::Skip`].
    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    /// Insert unless the pair already holds a higher-ranked row. Two rows can
    /// meet on one pair after sanitization, or when a property row spells out
    /// the full `rdf:type` IRI.
    fn place(
        &mut self,
        (subject, predicate, object): (NamedNode, NamedNode, Term),
        entry: &LogEntry,
        from_type_pass: bool,
    ) {
        let key = (subject.as_str().to_string(), predicate.as_str().to_string());
        let rank = (from_type_pass, entry.timestamp, entry.seq);
        if let Some(current) = self.triples.get(&key) {
            if current.rank >= rank {
                if current.rank.0 && !from_type_pass {
                    debug!(subject = %key.0, "property row shadowed by type assertion");
                }
                return;
            }
        }
        self.triples.insert(key, Placed { triple: Triple::new(subject, predicate, object), rank });
    }

    fn handle_malformed(&mut self, entry: &LogEntry, err: TwinError, policy: MalformedPolicy) -> Result<()> {
        match policy {
            MalformedPolicy::Reject => Err(err),
            MalformedPolicy::Skip => {
                warn!(
                    subject = %entry.subject,
                    predicate = %entry.predicate,
                    timestamp = entry.timestamp.as_millis(),
                    error = %err,
                    "skipping malformed log row"
                );
                self.skipped.push(SkippedRow { entry: entry.clone(), reason: err.to_string() });
                Ok(())
            }
        }
    }
}

fn type_triple(entry: &LogEntry, ns: &Namespaces) -> Result<(NamedNode, NamedNode, Term)> {
    let subject = identifier(&entry.subject, NodeField::Subject, ns)?;
    let class = identifier(&entry.object, NodeField::Object, ns)?;
    Ok((subject, rdf::TYPE.into_owned(), class.into()))
}

fn property_triple(entry: &LogEntry, ns: &Namespaces) -> Result<(NamedNode, NamedNode, Term)> {
    let subject = identifier(&entry.subject, NodeField::Subject, ns)?;
    let predicate = identifier(&entry.predicate, NodeField::Predicate, ns)?;
    Ok((subject, predicate, literal(&entry.object).into()))
}

/// Build the graph from the type-assertion rows and the property rows.
///
/// Type rows become `(s, rdf:type, IRI(o))`; property rows become
/// `(s, IRI(p), "o")`.
pub fn materialize(
    type_rows: &[LogEntry],
    property_rows: &[LogEntry],
    namespaces: &Namespaces,
    policy: MalformedPolicy,
) -> Result<MaterializedGraph> {
    let mut graph = MaterializedGraph::default();

    let converted = type_rows
        .iter()
        .map(|e| (e, true, type_triple(e, namespaces)))
        .chain(property_rows.iter().map(|e| (e, false, property_triple(e, namespaces))));

    for (entry, from_type_pass, result) in converted {
        match result {
            Ok(triple) => graph.place(triple, entry, from_type_pass),
            Err(err) => graph.handle_malformed(entry, err, policy)?,
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(s: &str, p: &str, o: &str, ts: i64, seq: u64) -> LogEntry {
        LogEntry::new(s, p, o, Timestamp::from_millis(ts)).with_seq(seq)
    }

    #[test]
    fn test_type_objects_are_iris_and_properties_literals() {
        let ns = Namespaces::default();
        let graph = materialize(
            &[row("s", "rdf:type", "Thing", 1, 0)],
            &[row("s", "hasName", "Bob", 1, 1)],
            &ns,
            MalformedPolicy::Reject,
        )
        .unwrap();

        assert_eq!(graph.len(), 2);
        assert!(matches!(
            graph.object_of("urn:twin:s", rdf::TYPE.as_str()),
            Some(Term::NamedNode(n)) if n.as_str() == "urn:twin:Thing"
        ));
        assert!(matches!(
            graph.object_of("urn:twin:s", "urn:twin:hasName"),
            Some(Term::Literal(l)) if l.value() == "Bob"
        ));
    }

    #[test]
    fn test_pairs_colliding_after_sanitization_keep_newest() {
        let ns = Namespaces::default();
        let graph = materialize(
            &[],
            &[
                row("http://ex.com/a&amp;b", "http://ex.com/p", "new", 5, 1),
                row("http://ex.com/a&b", "http://ex.com/p", "old", 3, 7),
            ],
            &ns,
            MalformedPolicy::Reject,
        )
        .unwrap();

        assert_eq!(graph.len(), 1);
        assert!(matches!(
            graph.object_of("http://ex.com/a&b", "http://ex.com/p"),
            Some(Term::Literal(l)) if l.value() == "new"
        ));
    }

    #[test]
    fn test_type_assertion_beats_newer_property_on_same_pair() {
        let ns = Namespaces::default();
        let graph = materialize(
            &[row("s", "rdf:type", "Pump", 1, 0)],
            &[row("s", rdf::TYPE.as_str(), "not a class", 9, 1)],
            &ns,
            MalformedPolicy::Reject,
        )
        .unwrap();

        assert_eq!(graph.len(), 1);
        assert!(matches!(
            graph.object_of("urn:twin:s", rdf::TYPE.as_str()),
            Some(Term::NamedNode(n)) if n.as_str() == "urn:twin:Pump"
        ));
    }

    #[test]
    fn test_reject_policy_fails_whole_graph() {
        let ns = Namespaces::default();
        let result = materialize(
            &[],
            &[row("s", "p", "ok", 1, 0), row("", "p", "bad", 1, 1)],
            &ns,
            MalformedPolicy::Reject,
        );
        assert!(matches!(
            result,
            Err(TwinError::MalformedIdentifier { field: NodeField::Subject, .. })
        ));
    }

    #[test]
    fn test_skip_policy_reports_dropped_rows() {
        let ns = Namespaces::default();
        let graph = materialize(
            &[],
            &[row("s", "p", "ok", 1, 0), row("", "p", "bad", 1, 1)],
            &ns,
            MalformedPolicy::Skip,
        )
        .unwrap();

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.skipped().len(), 1);
        assert_eq!(graph.skipped()[0].entry.object, "bad");
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("Skip".parse::<MalformedPolicy>().unwrap(), MalformedPolicy::Skip);
        assert_eq!("reject".parse::<MalformedPolicy>().unwrap(), MalformedPolicy::Reject);
        assert!("ignore".parse::<MalformedPolicy>().is_err());
    }
}
