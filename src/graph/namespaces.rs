//! Prefix map and base IRI used to resolve log identifiers.

use std::collections::BTreeMap;

use oxigraph::model::NamedNode;

use crate::error::{Result, TwinError};
use crate::graph::sanitize::has_scheme;

/// Base for identifiers that are neither IRIs nor known CURIEs.
pub const DEFAULT_BASE_IRI: &str = "urn:twin:";

const DEFAULT_PREFIXES: [(&str, &str); 3] = [
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

/// Registered prefixes and the base IRI. `rdf`, `rdfs` and `xsd` are
/// always present unless rebound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    prefixes: BTreeMap<String, String>,
    base: String,
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_PREFIXES
                .iter()
                .map(|(p, iri)| (p.to_string(), iri.to_string()))
                .collect(),
            base: DEFAULT_BASE_IRI.to_string(),
        }
    }
}

fn is_prefix_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !name.ends_with('.')
}

impl Namespaces {
    /// Same as [`Namespaces::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or rebind `prefix`. Both halves are validated.
    pub fn with_prefix(mut self, prefix: &str, iri: &str) -> Result<Self> {
        if !is_prefix_name(prefix) {
            return Err(TwinError::Config(format!("invalid prefix name '{}'", prefix)));
        }
        NamedNode::new(iri)?;
        self.prefixes.insert(prefix.to_string(), iri.to_string());
        Ok(self)
    }

    /// Parse a `prefix=iri` binding, as given on the command line.
    pub fn with_binding(self, binding: &str) -> Result<Self> {
        let (prefix, iri) = binding.split_once('=').ok_or_else(|| {
            TwinError::Config(format!("prefix binding '{}' must look like prefix=iri", binding))
        })?;
        self.with_prefix(prefix.trim(), iri.trim())
    }

    /// Replace the base IRI.
    pub fn with_base(mut self, base: &str) -> Result<Self> {
        NamedNode::new(base)?;
        self.base = base.to_string();
        Ok(self)
    }

    /// The base IRI.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Prefixes in name order.
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, iri)| (p.as_str(), iri.as_str()))
    }

    /// Expand `prefix:local` when `prefix` is registered.
    pub fn expand(&self, curie: &str) -> Option<String> {
        let (prefix, local) = curie.split_once(':')?;
        if local.starts_with("//") {
            return None;
        }
        self.prefixes.get(prefix).map(|ns| format!("{}{}", ns, local))
    }

    /// Registered CURIEs are expanded, absolute IRIs kept, anything else
    /// appended to the base IRI.
    pub fn resolve(&self, identifier: &str) -> String {
        if let Some(expanded) = self.expand(identifier) {
            return expanded;
        }
        if has_scheme(identifier) {
            identifier.to_string()
        } else {
            format!("{}{}", self.base, identifier)
        }
    }
}
