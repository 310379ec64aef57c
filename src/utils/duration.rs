//! Virtual-time conversions.
//!
//! Log timestamps and the analyzer's `--startAfter`/`--doneBefore` bounds
//! are written as `hr:min:sec`, where `sec` may carry a fraction. They are
//! handled as seconds (`f64`) everywhere else.
//!
//! [`format_duration_ms`] goes the other way for display, but takes
//! milliseconds and prints a millisecond field, so it is not an exact
//! inverse of [`parse_duration`].

use crate::error::ResultError;

/// Parse `hr:min:sec[.frac]` into seconds.
///
/// The result must be strictly positive; `0:0:0` is rejected with
/// [`ResultError::Range`].
///
/// # Examples
/// ```
/// use newweb_results::utils::duration::parse_duration;
///
/// assert_eq!(parse_duration("01:02:03.5").unwrap(), 3723.5);
/// assert!(parse_duration("1:2").is_err());
/// ```
pub fn parse_duration(text: &str) -> Result<f64, ResultError> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() != 3 {
        return Err(ResultError::Format(format!(
            "\"{}\" is not in hr:min:sec format",
            text
        )));
    }

    let hours = parse_whole(parts[0], text)?;
    let minutes = parse_whole(parts[1], text)?;
    let seconds: f64 = parts[2].trim().parse().map_err(|_| {
        ResultError::Format(format!("bad seconds field \"{}\" in \"{}\"", parts[2], text))
    })?;

    let value = hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds;
    if !(value > 0.0) {
        return Err(ResultError::Range(format!(
            "duration \"{}\" must be positive, got {}",
            text, value
        )));
    }
    Ok(value)
}

fn parse_whole(field: &str, text: &str) -> Result<i64, ResultError> {
    field
        .trim()
        .parse()
        .map_err(|_| ResultError::Format(format!("bad field \"{}\" in \"{}\"", field, text)))
}

/// Format milliseconds as `HH:MM:SS:mmm`.
pub fn format_duration_ms(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let rem = ms % 3_600_000;
    let minutes = rem / 60_000;
    let rem = rem % 60_000;
    let seconds = rem / 1000;
    let millis = rem % 1000;
    format!("{:02}:{:02}:{:02}:{:03}", hours, minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("01:02:03.5").unwrap(), 3723.5);
        assert_eq!(parse_duration("00:30:00").unwrap(), 1800.0);
        assert_eq!(parse_duration("1:15:0").unwrap(), 4500.0);
        assert!((parse_duration("00:21:21.466").unwrap() - 1281.466).abs() < 1e-9);
    }

    #[test]
    fn test_parse_duration_rejects_non_positive() {
        assert!(matches!(parse_duration("0:0:0"), Err(ResultError::Range(_))));
        assert!(matches!(parse_duration("0:0:0.0"), Err(ResultError::Range(_))));
        assert!(matches!(parse_duration("-1:0:0"), Err(ResultError::Range(_))));
    }

    #[test]
    fn test_parse_duration_huge_hours() {
        let value = parse_duration("99999999999999999:0:0").unwrap();
        assert!(value > 3.5e20);
        assert!(matches!(
            parse_duration("-99999999999999999:0:0"),
            Err(ResultError::Range(_))
        ));
    }

    #[test]
    fn test_parse_duration_rejects_bad_format() {
        assert!(matches!(parse_duration("1:2"), Err(ResultError::Format(_))));
        assert!(matches!(parse_duration("1:2:3:4"), Err(ResultError::Format(_))));
        assert!(matches!(parse_duration("a:2:3"), Err(ResultError::Format(_))));
        assert!(matches!(parse_duration("1:2:x"), Err(ResultError::Format(_))));
        assert!(matches!(parse_duration(""), Err(ResultError::Format(_))));
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(0), "00:00:00:000");
        assert_eq!(format_duration_ms(3_723_500), "01:02:03:500");
        assert_eq!(format_duration_ms(1_800_000), "00:30:00:000");
        assert_eq!(format_duration_ms(100 * 3_600_000 + 7), "100:00:00:007");
    }
}
