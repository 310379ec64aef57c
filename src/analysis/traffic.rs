//! Byte and cell totals from the transport proxies.
//!
//! Client-side reports are running totals, so a host's traffic since the
//! cutoff is the last report minus the first report at or after the cutoff.
//! Exit-side handler reports are self-contained and are simply summed.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::error::ResultError;
use crate::results::{HandlerStatsReport, PeriodicStatsReport, SimTime, TrafficCounters};

/// Traffic of one client host since `start_after`.
pub fn host_delta_since(
    host: &str,
    reports: &[PeriodicStatsReport],
    start_after: SimTime,
) -> Result<TrafficCounters, ResultError> {
    let insufficient = |reason: &str| ResultError::InsufficientReports {
        host: host.to_string(),
        reason: reason.to_string(),
    };

    let offset_idx = reports
        .iter()
        .position(|r| r.timestamp_seconds >= start_after)
        .ok_or_else(|| insufficient("no report at or after the cutoff"))?;
    if offset_idx + 1 == reports.len() {
        return Err(insufficient("the first report after the cutoff is also the last one"));
    }

    let offset = &reports[offset_idx].counters;
    let last = &reports[reports.len() - 1].counters;
    last.checked_sub(offset)
        .ok_or_else(|| insufficient("running counters went backwards"))
}

/// Sum of every client host's traffic since `start_after`
pub fn csp_totals(
    reports: &BTreeMap<Arc<str>, Vec<PeriodicStatsReport>>,
    start_after: SimTime,
) -> Result<TrafficCounters, ResultError> {
    let mut totals = TrafficCounters::default();
    for (host, host_reports) in reports {
        let delta = host_delta_since(host, host_reports, start_after)?;
        log::debug!("{}: recv_all_bytes= {} send_all_bytes= {}", host, delta.recv_all_bytes, delta.send_all_bytes);
        totals += delta;
    }
    Ok(totals)
}

/// Sum of the handler reports logged at or after `start_after`
pub fn handler_totals(reports: &[HandlerStatsReport], start_after: SimTime) -> TrafficCounters {
    let mut totals = TrafficCounters::default();
    for report in reports.iter().filter(|r| r.timestamp_seconds >= start_after) {
        totals += report.counters;
    }
    totals
}

/// `(all - useful) / useful` in percent; `None` when nothing useful was carried
pub fn overhead_percent(all: u64, useful: u64) -> Option<f64> {
    if useful == 0 {
        return None;
    }
    Some((all as f64 - useful as f64) / useful as f64 * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ByteOverheads {
    pub recv: Option<f64>,
    pub send: Option<f64>,
    pub overall: Option<f64>,
}

impl ByteOverheads {
    pub fn of(totals: &TrafficCounters) -> Self {
        Self {
            recv: overhead_percent(totals.recv_all_bytes, totals.recv_useful_bytes),
            send: overhead_percent(totals.send_all_bytes, totals.send_useful_bytes),
            overall: overhead_percent(
                totals.recv_all_bytes + totals.send_all_bytes,
                totals.recv_useful_bytes + totals.send_useful_bytes,
            ),
        }
    }
}

/// Counter sums plus the three overhead percentages, as a JSON object
pub fn totals_to_json(totals: &TrafficCounters) -> Value {
    let mut map = Map::new();
    for (name, value) in totals.fields() {
        map.insert(name.to_string(), json!(value));
    }
    let overheads = ByteOverheads::of(totals);
    map.insert("recv_byte_overhead_percent".to_string(), json!(overheads.recv));
    map.insert("send_byte_overhead_percent".to_string(), json!(overheads.send));
    map.insert("overall_byte_overhead_percent".to_string(), json!(overheads.overall));
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(timestamp: f64, all_bytes: u64) -> PeriodicStatsReport {
        PeriodicStatsReport {
            timestamp_seconds: timestamp,
            counters: TrafficCounters {
                recv_all_bytes: all_bytes,
                recv_useful_bytes: all_bytes / 2,
                send_all_bytes: all_bytes,
                ..TrafficCounters::default()
            },
        }
    }

    #[test]
    fn test_delta_uses_first_report_after_cutoff() {
        let reports = [report(0.0, 100), report(30.0, 500), report(60.0, 900)];
        let delta = host_delta_since("webclient1", &reports, 25.0).unwrap();
        assert_eq!(delta.recv_all_bytes, 400);
        assert_eq!(delta.send_all_bytes, 400);
        assert_eq!(delta.recv_useful_bytes, 200);

        // a report exactly at the cutoff is the offset
        let delta = host_delta_since("webclient1", &reports, 30.0).unwrap();
        assert_eq!(delta.recv_all_bytes, 400);
    }

    #[test]
    fn test_delta_needs_two_reports() {
        let reports = [report(0.0, 100), report(30.0, 500)];
        assert!(matches!(
            host_delta_since("webclient1", &reports, 25.0),
            Err(ResultError::InsufficientReports { .. })
        ));
        assert!(matches!(
            host_delta_since("webclient1", &reports, 31.0),
            Err(ResultError::InsufficientReports { .. })
        ));
        assert!(host_delta_since("webclient1", &[], 0.0).is_err());
    }

    #[test]
    fn test_csp_totals_sum_hosts() {
        let mut reports: BTreeMap<Arc<str>, Vec<PeriodicStatsReport>> = BTreeMap::new();
        reports.insert(Arc::from("webclient1"), vec![report(0.0, 100), report(30.0, 500), report(60.0, 900)]);
        reports.insert(Arc::from("webclient2"), vec![report(10.0, 0), report(40.0, 50)]);
        let totals = csp_totals(&reports, 5.0).unwrap();
        assert_eq!(totals.recv_all_bytes, 400 + 50);
    }

    #[test]
    fn test_handler_totals_ignore_early_reports() {
        let handler = |timestamp: f64, recv: u64| HandlerStatsReport {
            timestamp_seconds: timestamp,
            counters: TrafficCounters {
                recv_all_bytes: recv,
                ..TrafficCounters::default()
            },
        };
        let reports = [handler(10.0, 1), handler(20.0, 20), handler(30.0, 300)];
        assert_eq!(handler_totals(&reports, 20.0).recv_all_bytes, 320);
        assert_eq!(handler_totals(&reports, 0.0).recv_all_bytes, 321);
    }

    #[test]
    fn test_overheads() {
        assert_eq!(overhead_percent(150, 100), Some(50.0));
        assert_eq!(overhead_percent(100, 100), Some(0.0));
        assert_eq!(overhead_percent(10, 0), None);

        let totals = TrafficCounters {
            recv_all_bytes: 300,
            recv_useful_bytes: 100,
            send_all_bytes: 100,
            send_useful_bytes: 100,
            ..TrafficCounters::default()
        };
        let overheads = ByteOverheads::of(&totals);
        assert_eq!(overheads.recv, Some(200.0));
        assert_eq!(overheads.send, Some(0.0));
        assert_eq!(overheads.overall, Some(100.0));

        let value = totals_to_json(&TrafficCounters::default());
        assert_eq!(value["recv_all_bytes"], json!(0));
        assert!(value["overall_byte_overhead_percent"].is_null());
    }
}
