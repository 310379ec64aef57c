//! The JSON summary document shared by successive analyzer runs.
//!
//! Each run reads the existing document, replaces the keys it computed and
//! writes the whole document back with sorted keys and numbers rounded to
//! two decimals. Concurrent writers are not coordinated.

use std::fs;
use std::io;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde_json::{Map, Number, Value};

pub type SummaryDocument = Map<String, Value>;

/// Read the current document; a missing file is an empty document
pub fn read_summary(path: &Path) -> Result<SummaryDocument> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SummaryDocument::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read summary file: {}", path.display()))
        }
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(document)) => Ok(document),
        _ => {
            log::warn!(
                "{} does not hold a JSON object; starting a fresh summary",
                path.display()
            );
            Ok(SummaryDocument::new())
        }
    }
}

/// Round every non-integer number to two decimals
pub fn round_numbers(value: &mut Value) {
    match value {
        Value::Number(n) if n.is_f64() => {
            if let Some(rounded) = n
                .as_f64()
                .map(|f| (f * 100.0).round() / 100.0)
                .and_then(Number::from_f64)
            {
                *n = rounded;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(round_numbers),
        Value::Object(map) => map.values_mut().for_each(round_numbers),
        _ => {}
    }
}

pub fn write_summary(path: &Path, document: &SummaryDocument) -> Result<()> {
    let mut value = Value::Object(document.clone());
    round_numbers(&mut value);

    let json = serde_json::to_string_pretty(&value).context("Failed to serialize summary to JSON")?;
    fs::write(path, json + "\n")
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;

    log::info!("Summary written to {}", path.display());
    Ok(())
}

/// Replace `entries` in the document at `path`, keeping every other key.
pub fn merge_into_summary<I>(path: &Path, entries: I) -> Result<()>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut document = read_summary(path)?;
    document.extend(entries);
    write_summary(path, &document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rounding() {
        let mut value = json!({"a": 1.23456, "b": [2.005, 7], "c": {"d": 100.0 / 3.0}, "e": null});
        round_numbers(&mut value);
        assert_eq!(value["a"], json!(1.23));
        assert_eq!(value["b"][1], json!(7));
        assert_eq!(value["c"]["d"], json!(33.33));
        assert!(value["e"].is_null());
    }

    #[test]
    fn test_merge_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary_stats.json");

        merge_into_summary(&path, [("comment".to_string(), json!("first")), ("x".to_string(), json!(1))]).unwrap();
        merge_into_summary(&path, [("comment".to_string(), json!("second"))]).unwrap();

        let document = read_summary(&path).unwrap();
        assert_eq!(document["comment"], json!("second"));
        assert_eq!(document["x"], json!(1));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.find("\"comment\"").unwrap() < text.find("\"x\"").unwrap());
    }

    #[test]
    fn test_invalid_document_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary_stats.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(read_summary(&path).unwrap().is_empty());
    }
}
