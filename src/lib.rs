//! # newweb-results - parser and analyzer for newweb simulation logs
//!
//! A newweb experiment runs simulated web clients, Tor relays and transport
//! proxies inside the Shadow network simulator. This crate turns the logs of
//! one experiment into a compact persisted aggregate and computes page-load
//! and traffic-overhead statistics from one or more aggregates.
//!
//! ## Architecture
//!
//! - `parser`: line grammars, per-host state machines and the parallel
//!   experiment walk producing a [`results::SimulationResult`]
//! - `persist`: versioned, zstd-compressed bincode files
//! - `analysis`: load filtering, CDF files, proxy traffic totals and the
//!   JSON summary document
//! - `config`: optional YAML configuration with validation
//! - `utils`: virtual-time parsing and CDF construction
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use newweb_results::{analysis, config::Config, parser, persist};
//!
//! let config = Config::default();
//! let result = parser::parse_experiment(Path::new("exp1"), &config.parse, "baseline")?;
//! persist::save_result(&result, Path::new(&config.parse.output_file))?;
//!
//! let options = analysis::AnalyzeOptions::from_config(&config.analyze)?;
//! let outcome = analysis::run_analysis(&[PathBuf::from(&config.parse.output_file)], &options, "example")?;
//! println!("{} CDF files written", outcome.cdf_files.len());
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod intern;
pub mod parser;
pub mod persist;
pub mod results;
pub mod utils;

pub use error::ResultError;
pub use results::{FetchResult, HandlerStatsReport, PeriodicStatsReport, ProxyMode, SimulationResult};
