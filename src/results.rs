//! Parsed results of one simulation run.
//!
//! Records are created by the parser, appended once, and never modified
//! afterwards. The whole [`SimulationResult`] is then persisted and reloaded
//! by the analyzer; interned strings come back as independent copies.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Virtual time in seconds since the start of the simulation
pub type SimTime = f64;

/// How a web client reached the web server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProxyMode {
    /// Plain Tor
    Tor,
    /// Transport proxy tunnelled over Tor
    TproxyViaTor,
}

impl ProxyMode {
    pub const ALL: [ProxyMode; 2] = [ProxyMode::Tor, ProxyMode::TproxyViaTor];

    /// Spelling used in driver logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Tor => "tor",
            ProxyMode::TproxyViaTor => "tproxy-via-tor",
        }
    }

    /// Name used in CDF file names ("bufloot" is buflo over tor)
    pub fn short_name(&self) -> &'static str {
        match self {
            ProxyMode::Tor => "tor",
            ProxyMode::TproxyViaTor => "bufloot",
        }
    }

    pub fn from_log(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == value)
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a page load did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FailureReason {
    Failed,
    TimedOut,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Failed => "FAILED",
            FailureReason::TimedOut => "TIMEDOUT",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported on a `loadResult=` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadOutcome {
    Succeeded,
    Failed(FailureReason),
}

impl LoadOutcome {
    pub fn from_log(value: &str) -> Option<Self> {
        match value {
            "OK" => Some(LoadOutcome::Succeeded),
            "FAILED" => Some(LoadOutcome::Failed(FailureReason::Failed)),
            "TIMEDOUT" => Some(LoadOutcome::Failed(FailureReason::TimedOut)),
            _ => None,
        }
    }
}

/// One page-load attempt by a web client
///
/// Timing and request counts are kept exactly as the driver reported them;
/// they are only meaningful when the load succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub host: Arc<str>,
    pub load_number: u32,
    pub url: Arc<str>,
    pub proxy_mode: ProxyMode,
    pub outcome: LoadOutcome,
    /// Virtual second at which the load started, as reported by the driver
    pub start_time_seconds: u64,
    /// Virtual time of the result line
    pub timestamp_seconds: SimTime,
    /// Page load time in milliseconds
    pub plt: u64,
    /// Time to first byte in milliseconds
    pub ttfb: u64,
    pub num_requests: u32,
    pub num_success: u32,
    pub num_failed: u32,
    pub num_after_dom_load_event: u32,
    pub num_forced: u32,
}

impl FetchResult {
    pub fn succeeded(&self) -> bool {
        self.outcome == LoadOutcome::Succeeded
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match self.outcome {
            LoadOutcome::Succeeded => None,
            LoadOutcome::Failed(reason) => Some(reason),
        }
    }
}

/// Byte and cell counters reported by the transport proxies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficCounters {
    pub recv_all_bytes: u64,
    pub recv_useful_bytes: u64,
    pub recv_dummy_cells: u64,
    pub send_all_bytes: u64,
    pub send_useful_bytes: u64,
    pub send_dummy_cells: u64,
    pub avoided_send_dummy_cells: u64,
}

impl TrafficCounters {
    /// Field names paired with values, in log order
    pub fn fields(&self) -> [(&'static str, u64); 7] {
        [
            ("recv_all_bytes", self.recv_all_bytes),
            ("recv_useful_bytes", self.recv_useful_bytes),
            ("recv_dummy_cells", self.recv_dummy_cells),
            ("send_all_bytes", self.send_all_bytes),
            ("send_useful_bytes", self.send_useful_bytes),
            ("send_dummy_cells", self.send_dummy_cells),
            ("avoided_send_dummy_cells", self.avoided_send_dummy_cells),
        ]
    }

    /// True if no counter of `self` is below the same counter of `earlier`
    pub fn dominates(&self, earlier: &TrafficCounters) -> bool {
        self.fields()
            .iter()
            .zip(earlier.fields().iter())
            .all(|((_, now), (_, before))| now >= before)
    }

    /// Per-counter difference, `None` if any counter went backwards
    pub fn checked_sub(&self, earlier: &TrafficCounters) -> Option<TrafficCounters> {
        Some(TrafficCounters {
            recv_all_bytes: self.recv_all_bytes.checked_sub(earlier.recv_all_bytes)?,
            recv_useful_bytes: self.recv_useful_bytes.checked_sub(earlier.recv_useful_bytes)?,
            recv_dummy_cells: self.recv_dummy_cells.checked_sub(earlier.recv_dummy_cells)?,
            send_all_bytes: self.send_all_bytes.checked_sub(earlier.send_all_bytes)?,
            send_useful_bytes: self.send_useful_bytes.checked_sub(earlier.send_useful_bytes)?,
            send_dummy_cells: self.send_dummy_cells.checked_sub(earlier.send_dummy_cells)?,
            avoided_send_dummy_cells: self
                .avoided_send_dummy_cells
                .checked_sub(earlier.avoided_send_dummy_cells)?,
        })
    }
}

impl std::ops::AddAssign for TrafficCounters {
    fn add_assign(&mut self, other: TrafficCounters) {
        self.recv_all_bytes += other.recv_all_bytes;
        self.recv_useful_bytes += other.recv_useful_bytes;
        self.recv_dummy_cells += other.recv_dummy_cells;
        self.send_all_bytes += other.send_all_bytes;
        self.send_useful_bytes += other.send_useful_bytes;
        self.send_dummy_cells += other.send_dummy_cells;
        self.avoided_send_dummy_cells += other.avoided_send_dummy_cells;
    }
}

/// Running totals logged by a client-side proxy every 30 seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicStatsReport {
    pub timestamp_seconds: SimTime,
    pub counters: TrafficCounters,
}

/// Lifetime totals of one connection handler, logged by an exit-side
/// proxy when the handler is destroyed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandlerStatsReport {
    pub timestamp_seconds: SimTime,
    pub counters: TrafficCounters,
}

/// Simulator metadata taken from the banner lines of `shadow.log`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowRun {
    pub release: String,
    pub start_time: String,
    pub completion_time: String,
}

/// Everything parsed from one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    run: ShadowRun,
    description: String,
    load_results: Vec<FetchResult>,
    csp_periodic_reports: BTreeMap<Arc<str>, Vec<PeriodicStatsReport>>,
    handler_reports: Vec<HandlerStatsReport>,
}

impl SimulationResult {
    pub fn new(run: ShadowRun, description: impl Into<String>) -> Self {
        Self {
            run,
            description: description.into(),
            load_results: Vec::new(),
            csp_periodic_reports: BTreeMap::new(),
            handler_reports: Vec::new(),
        }
    }

    pub fn release(&self) -> &str {
        &self.run.release
    }

    pub fn start_time(&self) -> &str {
        &self.run.start_time
    }

    pub fn completion_time(&self) -> &str {
        &self.run.completion_time
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Page loads in discovery order
    pub fn load_results(&self) -> &[FetchResult] {
        &self.load_results
    }

    /// Chronological running-counter reports per client host
    pub fn csp_periodic_reports(&self) -> &BTreeMap<Arc<str>, Vec<PeriodicStatsReport>> {
        &self.csp_periodic_reports
    }

    pub fn handler_reports(&self) -> &[HandlerStatsReport] {
        &self.handler_reports
    }

    pub(crate) fn extend_loads(&mut self, loads: Vec<FetchResult>) {
        self.load_results.extend(loads);
    }

    pub(crate) fn extend_periodic(&mut self, host: Arc<str>, reports: Vec<PeriodicStatsReport>) {
        if reports.is_empty() {
            return;
        }
        self.csp_periodic_reports.entry(host).or_default().extend(reports);
    }

    pub(crate) fn extend_handlers(&mut self, reports: Vec<HandlerStatsReport>) {
        self.handler_reports.extend(reports);
    }
}
