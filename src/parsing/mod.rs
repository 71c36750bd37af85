//! Parsers for log ingestion input.

pub mod log_parser;

pub use log_parser::{parse_log, parse_log_line};
