//! Transport proxy logs (`stdout-tproxy-*`).
//!
//! Client-side proxies log running totals every 30 seconds; exit-side
//! proxies log the lifetime totals of each connection handler they destroy.

use std::io::BufRead;

use super::classify::{classify_proxy_line, ProxyLine};
use crate::error::ResultError;
use crate::results::{HandlerStatsReport, PeriodicStatsReport};

/// Read a client-side proxy log.
///
/// Reports are running totals, so each one must dominate the previous one
/// in every counter and in time.
pub fn read_client_proxy_log<R: BufRead>(reader: R) -> Result<Vec<PeriodicStatsReport>, ResultError> {
    let mut reports = Vec::new();
    append_client_proxy_log(reader, &mut reports)?;
    Ok(reports)
}

/// Read a further client-side proxy log of the same host into `reports`.
///
/// The first new report must dominate the last one already collected.
pub fn append_client_proxy_log<R: BufRead>(
    reader: R,
    reports: &mut Vec<PeriodicStatsReport>,
) -> Result<(), ResultError> {
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let parsed = classify_proxy_line(line.trim()).map_err(|e| e.at_line(line_no))?;
        let Some(ProxyLine::PeriodicStats { timestamp, counters }) = parsed else {
            continue;
        };

        if let Some(previous) = reports.last() {
            if timestamp < previous.timestamp_seconds || !counters.dominates(&previous.counters) {
                return Err(ResultError::inconsistent(
                    line_no,
                    "running counters went backwards",
                ));
            }
        }
        reports.push(PeriodicStatsReport {
            timestamp_seconds: timestamp,
            counters,
        });
    }

    Ok(())
}

/// Read an exit-side proxy log.
pub fn read_exit_proxy_log<R: BufRead>(reader: R) -> Result<Vec<HandlerStatsReport>, ResultError> {
    let mut reports = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let parsed = classify_proxy_line(line.trim()).map_err(|e| e.at_line(idx + 1))?;
        if let Some(ProxyLine::HandlerStats { timestamp, counters }) = parsed {
            reports.push(HandlerStatsReport {
                timestamp_seconds: timestamp,
                counters,
            });
        }
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn periodic(ts: &str, recv_all: u64, send_all: u64) -> String {
        format!(
            "{} INFO  - csp.cpp :494, log_stats() ::   cstp= 2: recv_so_far: all_bytes= {} useful_bytes= 10 dummy_cells= 1 ; send_so_far: all_bytes= {} useful_bytes= 5 dummy_cells= 2 dummy_cells_avoided_so_far= 0",
            ts, recv_all, send_all
        )
    }

    fn handler(ts: &str, recv_all: u64) -> String {
        format!(
            "{} INFO  - csp_handler.cpp :105, _report_stats() ::   csphandler= 4: with peer 11.0.2.10 recv: all_bytes= {} useful_bytes= 3698 dummy_cells= 91 ; send: all_bytes= 300000 useful_bytes= 57227 dummy_cells= 319 dummy_cells_avoided= 0",
            ts, recv_all
        )
    }

    #[test]
    fn test_periodic_reports_in_order() {
        let log = [
            periodic("00:00:30.000", 100, 50),
            "00:00:31.000 INFO  - csp.cpp :100, other() ::   something else".to_string(),
            handler("00:00:40.000", 1),
            periodic("00:01:00.000", 500, 60),
        ]
        .join("\n");
        let reports = read_client_proxy_log(Cursor::new(log)).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].timestamp_seconds, 30.0);
        assert_eq!(reports[1].counters.recv_all_bytes, 500);
        assert_eq!(reports[1].counters.send_all_bytes, 60);
    }

    #[test]
    fn test_periodic_reports_must_grow() {
        let log = [periodic("00:00:30.000", 500, 50), periodic("00:01:00.000", 100, 60)].join("\n");
        let err = read_client_proxy_log(Cursor::new(log)).unwrap_err();
        assert!(matches!(err, ResultError::InconsistentLog { line: 2, .. }));
    }

    #[test]
    fn test_counters_checked_across_logs() {
        let mut reports = read_client_proxy_log(Cursor::new(periodic("00:00:30.000", 500, 50))).unwrap();
        append_client_proxy_log(Cursor::new(periodic("00:01:00.000", 600, 60)), &mut reports).unwrap();
        assert_eq!(reports.len(), 2);

        let err = append_client_proxy_log(
            Cursor::new(["junk".to_string(), periodic("00:01:30.000", 10, 70)].join("\n")),
            &mut reports,
        )
        .unwrap_err();
        assert!(matches!(err, ResultError::InconsistentLog { line: 2, .. }));
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn test_handler_reports() {
        let log = [
            handler("00:20:15.400", 75000),
            periodic("00:20:30.000", 1, 1),
            handler("00:10:00.000", 20),
        ]
        .join("\n");
        let reports = read_exit_proxy_log(Cursor::new(log)).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].counters.recv_all_bytes, 75000);
        assert_eq!(reports[1].timestamp_seconds, 600.0);
    }
}
