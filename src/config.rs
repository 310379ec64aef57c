//! Optional YAML configuration.
//!
//! Every field has a default matching the layout newweb experiments produce,
//! so a config file is only needed to deviate from it. Command-line flags
//! override whatever the file sets.
//!
//! ```yaml
//! parse:
//!   hosts_dir: "shadow.data/hosts"
//!   webclient_prefix: "webclient"
//! analyze:
//!   start_after: "00:30:00"
//!   web_plt_bucket_size: 5.0
//!   web_ttfb_bucket_size: 0.5
//! ```

use std::fs::File;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::utils::duration::parse_duration;

/// Top-level configuration structure that mirrors the YAML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parse: ParseConfig,
    pub analyze: AnalyzeConfig,
}

/// Where the parser finds hosts and logs, and where it writes its output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Host directories, relative to the experiment directory
    pub hosts_dir: String,
    /// Simulator log name; a `.zst` variant is tried as well
    pub shadow_log: String,
    pub webclient_prefix: String,
    pub relay_prefix: String,
    /// Relay hosts are parsed only if their name contains this marker
    pub exit_marker: String,
    pub driver_log_prefix: String,
    pub tproxy_log_prefix: String,
    /// Persisted result written by `parse`
    pub output_file: String,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            hosts_dir: "shadow.data/hosts".to_string(),
            shadow_log: "shadow.log".to_string(),
            webclient_prefix: "webclient".to_string(),
            relay_prefix: "relay".to_string(),
            exit_marker: "exit".to_string(),
            driver_log_prefix: "stdout-driver-".to_string(),
            tproxy_log_prefix: "stdout-tproxy-".to_string(),
            output_file: format!("parsedResults-v{}.bin.zst", crate::persist::FORMAT_VERSION),
        }
    }
}

/// Analyzer defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeConfig {
    /// Only loads starting at/after this virtual time (`hr:min:sec`)
    pub start_after: String,
    /// Only loads completing at/before this virtual time (`hr:min:sec`)
    pub done_before: Option<String>,
    /// CDF bucket size for page load time, in seconds (0 = no bucketing)
    pub web_plt_bucket_size: f64,
    /// CDF bucket size for time to first byte, in seconds (0 = no bucketing)
    pub web_ttfb_bucket_size: f64,
    /// Factor turning logged milliseconds into the reported unit
    pub time_scale: f64,
    pub output_cdf_prefix: String,
    pub summary_file: String,
    pub web_host_prefix: String,
    /// Tag inserted into CDF file names for web results
    pub web_output_tag: String,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            start_after: "00:30:00".to_string(),
            done_before: None,
            web_plt_bucket_size: 5.0,
            web_ttfb_bucket_size: 0.5,
            time_scale: 0.001,
            output_cdf_prefix: String::new(),
            summary_file: "summary_stats.json".to_string(),
            web_host_prefix: "webclient".to_string(),
            web_output_tag: "web".to_string(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid parse configuration: {0}")]
    InvalidParse(String),
    #[error("Invalid analyze configuration: {0}")]
    InvalidAnalyze(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.parse.validate()?;
        self.analyze.validate()
    }
}

impl ParseConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("hosts_dir", &self.hosts_dir),
            ("shadow_log", &self.shadow_log),
            ("webclient_prefix", &self.webclient_prefix),
            ("relay_prefix", &self.relay_prefix),
            ("driver_log_prefix", &self.driver_log_prefix),
            ("tproxy_log_prefix", &self.tproxy_log_prefix),
            ("output_file", &self.output_file),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(ValidationError::InvalidParse(format!("{} cannot be empty", name)));
            }
        }
        Ok(())
    }
}

impl AnalyzeConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, size) in [
            ("web_plt_bucket_size", self.web_plt_bucket_size),
            ("web_ttfb_bucket_size", self.web_ttfb_bucket_size),
        ] {
            if !size.is_finite() || size < 0.0 {
                return Err(ValidationError::InvalidAnalyze(format!(
                    "{} must be a non-negative number, got {}",
                    name, size
                )));
            }
        }
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(ValidationError::InvalidAnalyze(format!(
                "time_scale must be positive, got {}",
                self.time_scale
            )));
        }
        if self.summary_file.is_empty() {
            return Err(ValidationError::InvalidAnalyze(
                "summary_file cannot be empty".to_string(),
            ));
        }
        if self.web_host_prefix.is_empty() {
            return Err(ValidationError::InvalidAnalyze(
                "web_host_prefix cannot be empty".to_string(),
            ));
        }

        let (start_after, done_before) = self.time_window()?;
        if let Some(done_before) = done_before {
            if start_after > done_before {
                return Err(ValidationError::InvalidAnalyze(format!(
                    "start_after {} is greater than done_before {}",
                    start_after, done_before
                )));
            }
        }
        Ok(())
    }

    /// `start_after` and `done_before` converted to seconds
    pub fn time_window(&self) -> Result<(f64, Option<f64>), ValidationError> {
        let start_after = parse_duration(&self.start_after)
            .map_err(|e| ValidationError::InvalidAnalyze(format!("start_after: {}", e)))?;
        let done_before = self
            .done_before
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(|e| ValidationError::InvalidAnalyze(format!("done_before: {}", e)))?;
        Ok((start_after, done_before))
    }
}

/// Load and validate configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .with_context(|| format!("Failed to open config file: {}", config_path.display()))?;
    let config: Config = serde_yaml::from_reader(file)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

    config.validate()?;
    Ok(config)
}
