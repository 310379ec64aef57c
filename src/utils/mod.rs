//! Shared utilities: virtual-time parsing and CDF tables.

pub mod cdf;
pub mod duration;

pub use cdf::{build_cdf, write_cdf, CdfPoint};
pub use duration::{format_duration_ms, parse_duration};
