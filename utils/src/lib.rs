//! Shared utilities for the ballot client.

pub mod logging;
pub mod time;

pub use logging::init_tracing;
pub use time::{format_date, parse_timestamp, unix_now, TimeParseError};
