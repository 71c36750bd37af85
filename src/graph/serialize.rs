//! Graph output formats.

use oxigraph::io::{RdfFormat, RdfSerializer};

use crate::error::{Result, TwinError};
use crate::graph::materialize::MaterializedGraph;
use crate::graph::namespaces::Namespaces;

/// Supported RDF serializations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GraphFormat {
    /// `text/turtle`, with prefixes
    #[default]
    Turtle,
    /// `application/n-triples`
    NTriples,
    /// `application/rdf+xml`
    RdfXml,
}

impl GraphFormat {
    /// Parse a `format` parameter such as `ttl` or `ntriples`.
    pub fn from_string(format: &str) -> Option<GraphFormat> {
        match format.trim().to_lowercase().as_str() {
            "turtle" | "ttl" => Some(GraphFormat::Turtle),
            "ntriples" | "nt" => Some(GraphFormat::NTriples),
            "rdfxml" | "rdf" | "xml" => Some(GraphFormat::RdfXml),
            _ => None,
        }
    }

    /// Match a single media type, parameters stripped.
    pub fn from_media_type(media_type: &str) -> Option<GraphFormat> {
        match media_type.trim().to_lowercase().as_str() {
            "text/turtle" | "application/x-turtle" => Some(GraphFormat::Turtle),
            "application/n-triples" | "text/plain" => Some(GraphFormat::NTriples),
            "application/rdf+xml" | "application/xml" | "text/xml" => Some(GraphFormat::RdfXml),
            _ => None,
        }
    }

    /// First supported media type in an `Accept` header, ignoring q-values.
    pub fn from_accept(header: &str) -> Option<GraphFormat> {
        header
            .split(',')
            .filter_map(|item| item.split(';').next())
            .find_map(Self::from_media_type)
    }

    /// Short name, as accepted by [`GraphFormat::from_string`].
    pub fn name(&self) -> &'static str {
        match self {
            GraphFormat::Turtle => "turtle",
            GraphFormat::NTriples => "ntriples",
            GraphFormat::RdfXml => "rdfxml",
        }
    }

    /// Canonical media type.
    pub fn media_type(&self) -> &'static str {
        match self {
            GraphFormat::Turtle => "text/turtle",
            GraphFormat::NTriples => "application/n-triples",
            GraphFormat::RdfXml => "application/rdf+xml",
        }
    }

    /// `Content-Type` header value.
    pub fn content_type(&self) -> String {
        format!("{}; charset=utf-8", self.media_type())
    }

    fn rdf_format(&self) -> RdfFormat {
        match self {
            GraphFormat::Turtle => RdfFormat::Turtle,
            GraphFormat::NTriples => RdfFormat::NTriples,
            GraphFormat::RdfXml => RdfFormat::RdfXml,
        }
    }
}

/// Serialize in the graph's iteration order, so equal graphs give equal bytes.
pub fn serialize_graph(
    graph: &MaterializedGraph,
    namespaces: &Namespaces,
    format: GraphFormat,
) -> Result<String> {
    let mut serializer = RdfSerializer::from_format(format.rdf_format());
    if format == GraphFormat::Turtle {
        for (prefix, iri) in namespaces.prefixes() {
            serializer = serializer.with_prefix(prefix, iri)?;
        }
    }

    let mut writer = serializer.for_writer(Vec::new());
    for triple in graph.iter() {
        writer
            .serialize_triple(triple)
            .map_err(|e| TwinError::Serialization(e.to_string()))?;
    }
    let bytes = writer.finish().map_err(|e| TwinError::Serialization(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| TwinError::Serialization(e.to_string()))
}
