//! Page-load statistics and their CDF files.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result};
use serde_json::{json, Value};

use super::filter::LoadFilter;
use crate::results::{FailureReason, FetchResult, ProxyMode};
use crate::utils::cdf::{build_cdf, write_cdf, CdfPoint};

/// Scaling and bucketing applied to page-load samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebOptions {
    pub plt_scale: f64,
    pub ttfb_scale: f64,
    pub plt_bucket_size: f64,
    pub ttfb_bucket_size: f64,
}

impl Default for WebOptions {
    fn default() -> Self {
        Self {
            plt_scale: 0.001,
            ttfb_scale: 0.001,
            plt_bucket_size: 0.0,
            ttfb_bucket_size: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Metric {
    Plt,
    Ttfb,
}

impl Metric {
    pub fn suffix(&self) -> &'static str {
        match self {
            Metric::Plt => "plt",
            Metric::Ttfb => "ttfb",
        }
    }
}

/// Counters of one proxy mode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeStats {
    pub pageloads: u64,
    pub timedout_pageloads: u64,
    pub failed_pageloads: u64,
    /// Failed requests summed over all loads, whatever their outcome
    pub failed_reqs: u64,
    /// Scaled page load times of successful loads, ascending
    pub plt_samples: Vec<f64>,
    pub ttfb_samples: Vec<f64>,
}

impl ModeStats {
    pub fn samples(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Plt => &self.plt_samples,
            Metric::Ttfb => &self.ttfb_samples,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebSummary {
    pub total: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub failed_only: usize,
    pub per_mode: BTreeMap<ProxyMode, ModeStats>,
}

/// One CDF ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct CdfArtifact {
    pub mode: ProxyMode,
    pub metric: Metric,
    pub points: Vec<CdfPoint>,
}

impl CdfArtifact {
    /// `<prefix>-<mode>-<metric>.cdf`
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{}-{}-{}.cdf", prefix, self.mode.short_name(), self.metric.suffix())
    }
}

/// One decimal, rounding the exact binary value half to even
fn round1(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

/// Count and sample the page loads selected by `filter`.
pub fn summarize(records: &[FetchResult], filter: &LoadFilter, options: &WebOptions) -> WebSummary {
    let mut summary = WebSummary::default();

    for record in records.iter().filter(|r| filter.matches(r)) {
        summary.total += 1;
        let stats = summary.per_mode.entry(record.proxy_mode).or_default();
        stats.pageloads += 1;
        stats.failed_reqs += u64::from(record.num_failed);

        match record.reason() {
            None => {
                stats.plt_samples.push(round1(record.plt as f64 * options.plt_scale));
                stats.ttfb_samples.push(round1(record.ttfb as f64 * options.ttfb_scale));
            }
            Some(FailureReason::TimedOut) => {
                summary.failed += 1;
                summary.timed_out += 1;
                stats.timedout_pageloads += 1;
            }
            Some(FailureReason::Failed) => {
                summary.failed += 1;
                summary.failed_only += 1;
                stats.failed_pageloads += 1;
            }
        }
    }
    assert_eq!(
        summary.failed,
        summary.timed_out + summary.failed_only,
        "every failed load must have a known reason"
    );

    for stats in summary.per_mode.values_mut() {
        stats.plt_samples.sort_by(f64::total_cmp);
        stats.ttfb_samples.sort_by(f64::total_cmp);
    }
    summary
}

impl WebSummary {
    /// One artifact per (proxy mode, metric) with at least one sample
    pub fn cdfs(&self, options: &WebOptions) -> Vec<CdfArtifact> {
        let mut artifacts = Vec::new();
        for (mode, stats) in &self.per_mode {
            for (metric, bucket_size) in [
                (Metric::Plt, options.plt_bucket_size),
                (Metric::Ttfb, options.ttfb_bucket_size),
            ] {
                let samples = stats.samples(metric);
                if samples.is_empty() {
                    continue;
                }
                artifacts.push(CdfArtifact {
                    mode: *mode,
                    metric,
                    points: build_cdf(samples, bucket_size),
                });
            }
        }
        artifacts
    }

    /// Summary-document entries of the page-load statistics
    pub fn to_json(&self) -> BTreeMap<&'static str, Value> {
        let per_mode = |get: fn(&ModeStats) -> u64| -> Value {
            let map: serde_json::Map<String, Value> = self
                .per_mode
                .iter()
                .map(|(mode, stats)| (mode.as_str().to_string(), json!(get(stats))))
                .collect();
            Value::Object(map)
        };

        BTreeMap::from([
            ("count_pageloads", per_mode(|s| s.pageloads)),
            ("count_timedout_pageloads", per_mode(|s| s.timedout_pageloads)),
            ("count_failed_pageloads", per_mode(|s| s.failed_pageloads)),
            ("count_failed_reqs", per_mode(|s| s.failed_reqs)),
        ])
    }
}

/// Write every artifact into `dir`, returning the paths written.
pub fn write_cdfs(
    artifacts: &[CdfArtifact],
    dir: &Path,
    prefix: &str,
    comment_lines: &[String],
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = dir.join(artifact.file_name(prefix));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create CDF file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_cdf(&mut writer, &artifact.points, comment_lines)
            .and_then(|()| writer.flush())
            .with_context(|| format!("Failed to write CDF file: {}", path.display()))?;
        log::info!("CDF written to {} ({} points)", path.display(), artifact.points.len());
        written.push(path);
    }
    Ok(written)
}
