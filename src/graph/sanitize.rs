//! Cleanup of raw log strings before they become RDF terms.
//!
//! Identifiers: HTML-unescape, strip one pair of surrounding `<...>`,
//! resolve against the namespaces, then percent-encode everything outside
//! the IRI-safe set. Literals: HTML-unescape only.
//!
//! Besides the characters in [`IRI_UNSAFE`], encoding covers a `%` that does
//! not start a `%XX` escape and every `#` after the first.

use std::borrow::Cow;

use html_escape::decode_html_entities;
use oxigraph::model::{Literal, NamedNode};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::{NodeField, Result, TwinError};
use crate::graph::namespaces::Namespaces;

/// ASCII characters that may never appear raw in an IRI path. Non-ASCII bytes
/// are always encoded. `%` and `#` are handled by [`percent_encode_iri`].
pub const IRI_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Decode HTML character references such as `&amp;` and `&lt;`.
pub fn unescape_html(raw: &str) -> Cow<'_, str> {
    decode_html_entities(raw)
}

/// Remove one surrounding `<...>` pair, if present.
pub fn strip_angle_brackets(value: &str) -> &str {
    value
        .strip_prefix('<')
        .and_then(|v| v.strip_suffix('>'))
        .unwrap_or(value)
}

fn starts_with_escape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 3
        && bytes[0] == b'%'
        && bytes[1].is_ascii_hexdigit()
        && bytes[2].is_ascii_hexdigit()
}

/// Percent-encode an IRI candidate. Existing `%XX` escapes and the first `#`
/// are kept; a stray `%` becomes `%25` and any later `#` becomes `%23`.
pub fn percent_encode_iri(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    let mut fragment_seen = false;

    for (idx, c) in value.char_indices() {
        match c {
            '%' if starts_with_escape(&value[idx..]) => encoded.push('%'),
            '%' => encoded.push_str("%25"),
            '#' if !fragment_seen => {
                fragment_seen = true;
                encoded.push('#');
            }
            '#' => encoded.push_str("%23"),
            _ => encoded.extend(utf8_percent_encode(&value[idx..idx + c.len_utf8()], IRI_UNSAFE)),
        }
    }
    encoded
}

/// `scheme ":"` per RFC 3986: a letter followed by letters, digits, `+`, `-` or `.`.
pub fn has_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Turn a raw log identifier into a named node.
pub fn identifier(raw: &str, field: NodeField, namespaces: &Namespaces) -> Result<NamedNode> {
    let unescaped = unescape_html(raw);
    let stripped = strip_angle_brackets(unescaped.trim());
    if stripped.is_empty() {
        return Err(TwinError::malformed(field, raw, "empty identifier"));
    }

    let resolved = namespaces.resolve(stripped);
    NamedNode::new(percent_encode_iri(&resolved)).map_err(|e| TwinError::malformed(field, raw, e))
}

/// Turn a raw log object into a plain literal.
pub fn literal(raw: &str) -> Literal {
    Literal::new_simple_literal(unescape_html(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_entities_are_decoded_before_encoding() {
        let ns = Namespaces::default();
        let node = identifier("http://ex.com/a&amp;b", NodeField::Subject, &ns).unwrap();
        assert_eq!(node.as_str(), "http://ex.com/a&b");
    }

    #[test]
    fn test_angle_brackets_and_spaces() {
        let ns = Namespaces::default();
        let node = identifier("<http://ex.com/pump 1>", NodeField::Subject, &ns).unwrap();
        assert_eq!(node.as_str(), "http://ex.com/pump%201");

        let escaped = identifier("&lt;http://ex.com/x&gt;", NodeField::Object, &ns).unwrap();
        assert_eq!(escaped.as_str(), "http://ex.com/x");
    }

    #[test]
    fn test_non_ascii_is_percent_encoded() {
        assert_eq!(percent_encode_iri("http://ex.com/é"), "http://ex.com/%C3%A9");
        assert_eq!(percent_encode_iri("http://ex.com/a%20b"), "http://ex.com/a%20b");
    }

    #[test]
    fn test_scheme_detection() {
        assert!(has_scheme("http://ex.com"));
        assert!(has_scheme("urn:twin:x"));
        assert!(has_scheme("ex:c1"));
        assert!(!has_scheme("Thing"));
        assert!(!has_scheme("1ab:c"));
        assert!(!has_scheme(":c"));
    }

    #[test]
    fn test_stray_percent_is_encoded() {
        assert_eq!(percent_encode_iri("http://ex.com/50%off"), "http://ex.com/50%25off");
        assert_eq!(percent_encode_iri("http://ex.com/100%"), "http://ex.com/100%25");
        assert_eq!(percent_encode_iri("http://ex.com/%4"), "http://ex.com/%254");
        assert_eq!(percent_encode_iri("http://ex.com/%4a"), "http://ex.com/%4a");

        let ns = Namespaces::default();
        let node = identifier("http://ex.com/100%zz", NodeField::Predicate, &ns).unwrap();
        assert_eq!(node.as_str(), "http://ex.com/100%25zz");
    }

    #[test]
    fn test_brackets_and_extra_hashes_are_encoded() {
        let ns = Namespaces::default();
        let node = identifier("http://ex.com/sensor[0]", NodeField::Subject, &ns).unwrap();
        assert_eq!(node.as_str(), "http://ex.com/sensor%5B0%5D");

        let node = identifier("http://ex.com/a#b#c", NodeField::Subject, &ns).unwrap();
        assert_eq!(node.as_str(), "http://ex.com/a#b%23c");

        let node = identifier("http://ex.com/onto#Pump", NodeField::Object, &ns).unwrap();
        assert_eq!(node.as_str(), "http://ex.com/onto#Pump");
    }

    #[test]
    fn test_empty_identifier_is_malformed() {
        let ns = Namespaces::default();
        for raw in ["", "  ", "<>", "&lt;&gt;"] {
            let err = identifier(raw, NodeField::Subject, &ns).unwrap_err();
            assert!(matches!(
                err,
                TwinError::MalformedIdentifier { field: NodeField::Subject, .. }
            ));
        }
    }

    #[test]
    fn test_literals_are_unescaped_not_encoded() {
        assert_eq!(literal("a &amp; b <c>").value(), "a & b <c>");
        assert_eq!(literal("72.5").value(), "72.5");
    }
}
