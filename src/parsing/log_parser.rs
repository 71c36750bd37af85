//! Parser for timestamped N-Triples log lines.
//!
//! ```text
//! 1704067200000 <http://ex.com/c1> <http://ex.com/temp> "72.5" .
//! 2024-01-01T00:00:00Z ex:c1 rdf:type ex:Component .
//! ```
//!
//! The first token is the timestamp (anything [`Timestamp::parse`] accepts,
//! without spaces). Terms are `<iri>`, a bare CURIE, or for the object a
//! quoted literal; datatype and language annotations are dropped since the
//! log stores plain text. The full `rdf:type` IRI is normalized to the
//! `rdf:type` marker so type assertions survive the round trip.

use std::io::BufRead;

use crate::core::{LogEntry, Timestamp, TYPE_PREDICATE};
use crate::error::{Result, TwinError};

const RDF_TYPE_IRI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

fn invalid(message: String) -> TwinError {
    TwinError::InvalidArgument(message)
}

/// Parse one line. Blank lines and `#` comments yield `None`.
pub fn parse_log_line(line: &str) -> Result<Option<LogEntry>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (ts_token, rest) = split_token(trimmed);
    let timestamp = Timestamp::parse(ts_token)?;

    let (subject, rest) = parse_resource(rest, "subject")?;
    let (predicate, rest) = parse_resource(rest, "predicate")?;
    let (object, rest) = parse_object(rest)?;

    let rest = rest.trim();
    if !rest.is_empty() && rest != "." {
        return Err(invalid(format!("unexpected trailing content '{}'", rest)));
    }

    let predicate = if predicate == RDF_TYPE_IRI || predicate == "a" {
        TYPE_PREDICATE.to_string()
    } else {
        predicate
    };

    Ok(Some(LogEntry::new(&subject, &predicate, &object, timestamp)))
}

/// Parse a whole log, reporting the 1-based line number of the first error.
pub fn parse_log(reader: impl BufRead) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_log_line(&line) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(e) => return Err(invalid(format!("line {}: {}", idx + 1, e))),
        }
    }
    Ok(entries)
}

fn split_token(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(idx) => (&input[..idx], &input[idx..]),
        None => (input, ""),
    }
}

/// `<iri>` or a bare token such as `ex:c1`.
fn parse_resource<'a>(input: &'a str, field: &str) -> Result<(String, &'a str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return Err(invalid(format!("missing {}", field)));
    }

    if let Some(body) = input.strip_prefix('<') {
        let end = body
            .find('>')
            .ok_or_else(|| invalid(format!("missing closing '>' for {}", field)))?;
        return Ok((body[..end].to_string(), &body[end + 1..]));
    }

    let (token, rest) = split_token(input);
    if token == "." || token.starts_with('"') {
        return Err(invalid(format!("expected {} IRI, got '{}'", field, token)));
    }
    Ok((token.to_string(), rest))
}

fn parse_object(input: &str) -> Result<(String, &str)> {
    let input = input.trim_start();
    if input.starts_with('"') {
        parse_literal(input)
    } else {
        parse_resource(input, "object")
    }
}

fn parse_literal(input: &str) -> Result<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices().skip(1);

    let end = loop {
        let Some((idx, c)) = chars.next() else {
            return Err(invalid("missing closing quote for literal".to_string()));
        };
        match c {
            '"' => break idx,
            '\\' => {
                let (_, escaped) =
                    chars.next().ok_or_else(|| invalid("dangling escape in literal".to_string()))?;
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    'u' => {
                        let hex: String = chars.by_ref().take(4).map(|(_, h)| h).collect();
                        let decoded = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| invalid(format!("bad \\u escape '{}'", hex)))?;
                        value.push(decoded);
                    }
                    other => return Err(invalid(format!("unknown escape '\\{}'", other))),
                }
            }
            other => value.push(other),
        }
    };

    let mut rest = &input[end + 1..];
    if let Some(after) = rest.strip_prefix("^^") {
        let (_, tail) = parse_resource(after, "datatype")?;
        rest = tail;
    } else if let Some(after) = rest.strip_prefix('@') {
        let lang_end = after
            .find(|c: char| c.is_whitespace() || c == '.')
            .unwrap_or(after.len());
        rest = &after[lang_end..];
    }

    Ok((value, rest))
}
