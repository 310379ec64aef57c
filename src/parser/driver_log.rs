//! Web client driver logs (`stdout-driver-*`).
//!
//! A driver loads pages one at a time. Every result line is checked against
//! the load it closes, and any mismatch aborts the parse: these checks exist
//! to catch simulator bugs, not to survive them.

use std::io::BufRead;
use std::sync::Arc;

use super::classify::{classify_driver_line, DriverLine, LoadReport};
use crate::error::ResultError;
use crate::intern::Interner;
use crate::results::{FetchResult, LoadOutcome, ProxyMode, SimTime};

/// Load currently tracked by a [`LoadTracker`]
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading {
        url: String,
        start_timestamp: SimTime,
        dom_load_timestamp: Option<SimTime>,
    },
}

/// Per-log load-tracking state machine
#[derive(Debug)]
pub struct LoadTracker<'i> {
    host: Arc<str>,
    interner: &'i Interner,
    load_count: u32,
    state: LoadState,
    results: Vec<FetchResult>,
}

impl<'i> LoadTracker<'i> {
    pub fn new(host: Arc<str>, interner: &'i Interner) -> Self {
        Self {
            host,
            interner,
            load_count: 0,
            state: LoadState::Idle,
            results: Vec::new(),
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn load_count(&self) -> u32 {
        self.load_count
    }

    pub fn start_loading(&mut self, url: &str, timestamp: SimTime) {
        if let LoadState::Loading { url: open_url, .. } = &self.state {
            log::debug!(
                "{}: load {} of [{}] replaced by a new load before reporting",
                self.host,
                self.load_count,
                open_url
            );
        }
        self.load_count += 1;
        self.state = LoadState::Loading {
            url: url.to_string(),
            start_timestamp: timestamp,
            dom_load_timestamp: None,
        };
    }

    pub fn dom_load_event(&mut self, line: usize, timestamp: SimTime) -> Result<(), ResultError> {
        if self.load_count == 0 {
            return Err(ResultError::inconsistent(
                line,
                "DOM load event before any page load started",
            ));
        }
        match &mut self.state {
            LoadState::Loading {
                dom_load_timestamp, ..
            } => *dom_load_timestamp = Some(timestamp),
            LoadState::Idle => {
                log::debug!("{}: line {}: DOM load event with no open load", self.host, line);
            }
        }
        Ok(())
    }

    /// Close the open load with a driver result line.
    pub fn finish_load(&mut self, line: usize, report: &LoadReport<'_>) -> Result<(), ResultError> {
        if self.load_count == 0 {
            return Err(ResultError::inconsistent(
                line,
                "load result before any page load started",
            ));
        }
        let LoadState::Loading {
            url,
            dom_load_timestamp,
            ..
        } = &self.state
        else {
            return Err(ResultError::inconsistent(
                line,
                format!("load result for [{}] with no open load", report.url),
            ));
        };

        if report.url != url {
            return Err(ResultError::inconsistent(
                line,
                format!("result url [{}] != loading url [{}]", report.url, url),
            ));
        }
        if report.load_number != self.load_count {
            return Err(ResultError::inconsistent(
                line,
                format!(
                    "result loadnum {} != expected loadnum {}",
                    report.load_number, self.load_count
                ),
            ));
        }
        let proxy_mode = ProxyMode::from_log(report.proxy_mode).ok_or_else(|| {
            ResultError::inconsistent(line, format!("unknown proxyMode \"{}\"", report.proxy_mode))
        })?;
        let outcome = LoadOutcome::from_log(report.load_result).ok_or_else(|| {
            ResultError::inconsistent(line, format!("unknown loadResult \"{}\"", report.load_result))
        })?;
        if outcome == LoadOutcome::Succeeded && dom_load_timestamp.is_none() {
            return Err(ResultError::inconsistent(
                line,
                format!("load {} succeeded without a DOM load event", report.load_number),
            ));
        }

        self.results.push(FetchResult {
            host: Arc::clone(&self.host),
            load_number: report.load_number,
            url: self.interner.intern(report.url),
            proxy_mode,
            outcome,
            start_time_seconds: report.start_sec,
            timestamp_seconds: report.timestamp,
            plt: report.plt,
            ttfb: report.ttfb,
            num_requests: report.num_requests,
            num_success: report.num_success,
            num_failed: report.num_failed,
            num_after_dom_load_event: report.num_after_dom_load_event,
            num_forced: report.num_forced,
        });
        self.state = LoadState::Idle;
        Ok(())
    }

    /// Stop tracking. A load still open at this point is dropped.
    pub fn into_results(self) -> Vec<FetchResult> {
        if let LoadState::Loading { url, .. } = &self.state {
            log::warn!(
                "{}: log ended while load {} of [{}] was in progress; dropping it",
                self.host,
                self.load_count,
                url
            );
        }
        self.results
    }
}

/// Read one driver log and return its page-load results in log order.
pub fn read_driver_log<R: BufRead>(
    reader: R,
    host: &Arc<str>,
    interner: &Interner,
) -> Result<Vec<FetchResult>, ResultError> {
    let mut tracker = LoadTracker::new(Arc::clone(host), interner);

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let line = line.trim();
        log::trace!("line: [{}]", line);

        match classify_driver_line(line).map_err(|e| e.at_line(line_no))? {
            Some(DriverLine::StartLoading { timestamp, url }) => tracker.start_loading(url, timestamp),
            Some(DriverLine::DomLoadEvent { timestamp }) => tracker.dom_load_event(line_no, timestamp)?,
            Some(DriverLine::Result(report)) => tracker.finish_load(line_no, &report)?,
            None => {}
        }
    }

    Ok(tracker.into_results())
}
