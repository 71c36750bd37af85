//! Local, durable storage for the triple log.

pub mod dictionary;
pub mod segmented_log;
pub mod util;
