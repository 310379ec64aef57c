//! Analysis of persisted simulation results.
//!
//! An analysis run loads one or more persisted aggregates, writes one CDF
//! per (proxy mode, metric) for the selected page loads and merges page-load
//! counts and proxy traffic totals into the JSON summary document.

pub mod filter;
pub mod report;
pub mod summary;
pub mod traffic;
pub mod web;

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result};
use serde_json::{json, Value};

use crate::config::{AnalyzeConfig, ValidationError};
use crate::persist::load_result;
use crate::results::{SimulationResult, TrafficCounters};
use crate::utils::duration::format_duration_ms;

pub use filter::LoadFilter;
pub use traffic::{csp_totals, handler_totals, host_delta_since, overhead_percent, ByteOverheads};
pub use web::{summarize, CdfArtifact, Metric, WebOptions, WebSummary};

/// Header of the per-file info lines
pub const INFO_HEADER: &str =
    "[result file]: [shadow release] [embedded description] [experiment completion time]";

const SEPARATOR: &str = "==================================================";

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeOptions {
    pub filter: LoadFilter,
    pub web: WebOptions,
    pub output_cdf_prefix: String,
    /// Inserted between the prefix and the mode in CDF file names
    pub web_output_tag: String,
    /// Directory receiving the CDF files
    pub output_dir: PathBuf,
    pub summary_path: PathBuf,
    pub show_info_only: bool,
    /// Skip the proxy traffic totals
    pub web_only: bool,
}

impl AnalyzeOptions {
    pub fn from_config(config: &AnalyzeConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        let (start_after, done_before) = config.time_window()?;

        let mut filter = LoadFilter::new(config.web_host_prefix.clone(), start_after);
        filter.done_before = done_before;

        Ok(Self {
            filter,
            web: WebOptions {
                plt_scale: config.time_scale,
                ttfb_scale: config.time_scale,
                plt_bucket_size: config.web_plt_bucket_size,
                ttfb_bucket_size: config.web_ttfb_bucket_size,
            },
            output_cdf_prefix: config.output_cdf_prefix.clone(),
            web_output_tag: config.web_output_tag.clone(),
            output_dir: PathBuf::from("."),
            summary_path: PathBuf::from(&config.summary_file),
            show_info_only: false,
            web_only: false,
        })
    }
}

/// A persisted aggregate and the file it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedResult {
    pub path: PathBuf,
    pub result: SimulationResult,
}

/// What an analysis run computed and wrote
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisOutcome {
    /// Info header followed by one line per input file
    pub info_lines: Vec<String>,
    pub web: Option<WebSummary>,
    pub csp_totals: Option<TrafficCounters>,
    pub handler_totals: Option<TrafficCounters>,
    pub cdf_files: Vec<PathBuf>,
}

pub fn load_all(files: &[PathBuf]) -> Result<Vec<LoadedResult>> {
    files
        .iter()
        .map(|path| -> Result<LoadedResult> {
            Ok(LoadedResult {
                path: path.clone(),
                result: load_result(path)?,
            })
        })
        .collect()
}

/// `[file]: [release] [description] [completion time]`
pub fn info_line(path: &Path, result: &SimulationResult) -> String {
    format!(
        "[{}]: [{}] [{}] [{}]",
        path.display(),
        result.release(),
        result.description(),
        result.completion_time()
    )
}

/// Traffic totals of several aggregates: computed per aggregate, then summed
pub fn traffic_totals(loaded: &[LoadedResult], start_after: f64) -> Result<(TrafficCounters, TrafficCounters)> {
    let mut all_csp = TrafficCounters::default();
    let mut all_handlers = TrafficCounters::default();
    for entry in loaded {
        all_csp += csp_totals(entry.result.csp_periodic_reports(), start_after)
            .with_context(|| format!("Failed to compute proxy totals of {}", entry.path.display()))?;
        all_handlers += handler_totals(entry.result.handler_reports(), start_after);
    }
    Ok((all_csp, all_handlers))
}

/// Analyze already loaded aggregates.
pub fn analyze_results(
    loaded: &[LoadedResult],
    options: &AnalyzeOptions,
    command_line: &str,
) -> Result<AnalysisOutcome> {
    let mut outcome = AnalysisOutcome::default();
    outcome.info_lines.push(INFO_HEADER.to_string());
    outcome
        .info_lines
        .extend(loaded.iter().map(|entry| info_line(&entry.path, &entry.result)));

    if options.show_info_only {
        return Ok(outcome);
    }

    let mut comment_lines = vec![command_line.to_string(), SEPARATOR.to_string()];
    comment_lines.extend(outcome.info_lines.iter().cloned());

    let records: Vec<_> = loaded
        .iter()
        .flat_map(|entry| entry.result.load_results().iter().cloned())
        .collect();
    let web_summary = summarize(&records, &options.filter, &options.web);
    log::info!(
        "{} of {} page loads selected for analysis (started after {})",
        web_summary.total,
        records.len(),
        format_duration_ms((options.filter.start_after * 1000.0) as u64)
    );

    let prefix = format!("{}{}", options.output_cdf_prefix, options.web_output_tag);
    outcome.cdf_files = web::write_cdfs(
        &web_summary.cdfs(&options.web),
        &options.output_dir,
        &prefix,
        &comment_lines,
    )?;

    let mut entries: Vec<(String, Value)> = vec![("comment".to_string(), json!(comment_lines.join("\n")))];
    entries.extend(
        web_summary
            .to_json()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value)),
    );

    if !options.web_only {
        let (all_csp, all_handlers) = traffic_totals(loaded, options.filter.start_after)?;
        entries.push(("all_csp_totals".to_string(), traffic::totals_to_json(&all_csp)));
        entries.push((
            "all_ssp_csp_handler_totals".to_string(),
            traffic::totals_to_json(&all_handlers),
        ));
        outcome.csp_totals = Some(all_csp);
        outcome.handler_totals = Some(all_handlers);
    }

    summary::merge_into_summary(&options.summary_path, entries)?;
    outcome.web = Some(web_summary);
    Ok(outcome)
}

/// Load `files` and analyze them together.
pub fn run_analysis(files: &[PathBuf], options: &AnalyzeOptions, command_line: &str) -> Result<AnalysisOutcome> {
    let loaded = load_all(files)?;
    analyze_results(&loaded, options, command_line)
}
