//! Simulator-wide log (`shadow.log`).
//!
//! Only the banners matter: the first line names the release, an
//! "initialized at" line gives the start time and the last line must be a
//! clean-shutdown banner for the same release.

use std::io::BufRead;

use super::classify::{classify_shadow_line, ShadowLine};
use crate::error::ResultError;
use crate::results::ShadowRun;

pub fn read_shadow_log<R: BufRead>(reader: R) -> Result<ShadowRun, ResultError> {
    let mut lines = reader.lines();

    let first = lines.next().transpose()?.unwrap_or_default();
    let release = match classify_shadow_line(first.trim()) {
        Some(ShadowLine::Startup { release }) => release.to_string(),
        _ => {
            return Err(ResultError::Format(format!(
                "line 1: expected startup banner, got \"{}\"",
                first.trim()
            )))
        }
    };

    let mut start_time: Option<String> = None;
    let mut last_line = String::new();
    for line in lines {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if start_time.is_none() {
            if let Some(ShadowLine::Init { start_time: ts }) = classify_shadow_line(line) {
                start_time = Some(ts.to_string());
            }
        }
        last_line.clear();
        last_line.push_str(line);
    }

    let start_time = start_time
        .ok_or_else(|| ResultError::Format("no \"Shadow initialized at\" banner".to_string()))?;

    let completion_time = match classify_shadow_line(&last_line) {
        Some(ShadowLine::Shutdown {
            release: done_release,
            completion_time,
        }) => {
            if done_release != release {
                return Err(ResultError::UncleanShutdown(format!(
                    "release at shutdown \"{}\" differs from release at start \"{}\"",
                    done_release, release
                )));
            }
            completion_time.to_string()
        }
        _ => {
            return Err(ResultError::UncleanShutdown(format!(
                "last line is not a shutdown banner: \"{}\"",
                last_line
            )))
        }
    };

    log::debug!(
        "shadow release {}, started {}, completed {}",
        release,
        start_time,
        completion_time
    );
    Ok(ShadowRun {
        release,
        start_time,
        completion_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTUP: &str = "00:00:00.021258 [thread-0] n/a [shadow-message] [n/a] [shd-master.c:143] [master_run] Shadow v1.11.2 2016-10-04 (built 2016-11-11)";
    const OTHER: &str = "00:00:00.021300 [thread-0] n/a [shadow-message] [n/a] [shd-master.c:150] [master_run] reading config";
    const INIT: &str = "00:00:00.021370 [thread-0] n/a [shadow-message] [n/a] [shd-master.c:153] [master_run] Shadow initialized at 2016-11-19 00:14:35 using GLib v2.48.1 and IGraph v0.7.1";
    const SHUTDOWN: &str = "00:00:00.000000 [thread-0] n/a [shadow-message] [n/a] [shd-master.c:88] [master_free] Shadow v1.11.2 2016-10-04 (built 2016-11-11) shut down cleanly at 2016-11-19 03:31:09";

    fn log(lines: &[&str]) -> std::io::Cursor<String> {
        std::io::Cursor::new(lines.join("\n") + "\n")
    }

    #[test]
    fn test_clean_run() {
        let run = read_shadow_log(log(&[STARTUP, OTHER, INIT, "noise", SHUTDOWN, ""])).unwrap();
        assert_eq!(run.release, "v1.11.2 2016-10-04 (built 2016-11-11)");
        assert_eq!(run.start_time, "2016-11-19 00:14:35");
        assert_eq!(run.completion_time, "2016-11-19 03:31:09");
    }

    #[test]
    fn test_missing_shutdown() {
        let err = read_shadow_log(log(&[STARTUP, OTHER, INIT, "noise"])).unwrap_err();
        assert!(matches!(err, ResultError::UncleanShutdown(_)));
    }

    #[test]
    fn test_release_mismatch() {
        let other_release = SHUTDOWN.replace("v1.11.2", "v1.12.0");
        let err = read_shadow_log(log(&[STARTUP, INIT, &other_release])).unwrap_err();
        assert!(matches!(err, ResultError::UncleanShutdown(_)));
    }

    #[test]
    fn test_first_line_must_be_startup() {
        let err = read_shadow_log(log(&[INIT, STARTUP, SHUTDOWN])).unwrap_err();
        assert!(matches!(err, ResultError::Format(_)));
        assert!(matches!(read_shadow_log(log(&[])), Err(ResultError::Format(_))));
    }

    #[test]
    fn test_missing_init_banner() {
        let err = read_shadow_log(log(&[STARTUP, OTHER, SHUTDOWN])).unwrap_err();
        assert!(matches!(err, ResultError::Format(_)));
    }
}
