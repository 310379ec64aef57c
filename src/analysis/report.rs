//! Console output of an analysis run.

use crate::results::{ProxyMode, TrafficCounters};

use super::traffic::ByteOverheads;
use super::web::WebSummary;

/// Print the per-file info lines
pub fn print_file_info(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

/// Print page-load counts and failure reasons to stdout
pub fn print_web_summary(summary: &WebSummary) {
    println!("========== summary ==========");
    println!("web results");
    println!("total num result {}", summary.total);
    println!(
        "numbadresult (succeeded != true): {}. due to...\n    timeout: {}\n    failed: {}",
        summary.failed, summary.timed_out, summary.failed_only
    );

    for mode in ProxyMode::ALL {
        let Some(stats) = summary.per_mode.get(&mode) else {
            continue;
        };
        println!(
            "  {}: {} page loads, {} timed out, {} failed, {} failed requests",
            mode, stats.pageloads, stats.timedout_pageloads, stats.failed_pageloads, stats.failed_reqs
        );
    }
}

fn format_percent(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v))
}

/// Print one set of traffic totals with its byte overheads
pub fn print_traffic_totals(label: &str, totals: &TrafficCounters) {
    println!("\n{}:", label);
    for (name, value) in totals.fields() {
        println!("  {}: {}", name, value);
    }
    let overheads = ByteOverheads::of(totals);
    println!("  recv byte overhead: {}", format_percent(overheads.recv));
    println!("  send byte overhead: {}", format_percent(overheads.send));
    println!("  overall byte overhead: {}", format_percent(overheads.overall));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(12.346)), "12.35%");
        assert_eq!(format_percent(None), "n/a");
    }
}
