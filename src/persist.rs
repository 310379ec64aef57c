//! Persisted aggregate files.
//!
//! A file is a zstd stream holding two bincode values back to back: the
//! format version and the [`SimulationResult`]. The version is decoded and
//! checked on its own first, so a file from another version is rejected
//! before its body is interpreted.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use log::info;

use crate::error::ResultError;
use crate::results::SimulationResult;

/// Bumped whenever the layout of [`SimulationResult`] changes
pub const FORMAT_VERSION: u32 = 9;

const COMPRESSION_LEVEL: i32 = 0;

pub fn write_result<W: Write>(dest: W, result: &SimulationResult) -> Result<(), ResultError> {
    let mut encoder = zstd::Encoder::new(dest, COMPRESSION_LEVEL)?;
    bincode::serialize_into(&mut encoder, &FORMAT_VERSION)?;
    bincode::serialize_into(&mut encoder, result)?;
    encoder.finish()?.flush()?;
    Ok(())
}

/// Decode a persisted aggregate; `path` is only used for error reporting
pub fn read_result<R: Read>(source: R, path: &Path) -> Result<SimulationResult, ResultError> {
    let mut decoder = zstd::Decoder::new(source)?;
    let found: u32 = bincode::deserialize_from(&mut decoder)?;
    if found != FORMAT_VERSION {
        return Err(ResultError::VersionMismatch {
            path: path.to_path_buf(),
            found,
            expected: FORMAT_VERSION,
        });
    }
    Ok(bincode::deserialize_from(&mut decoder)?)
}

pub fn save_result(result: &SimulationResult, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create result file: {}", path.display()))?;
    write_result(BufWriter::new(file), result)
        .with_context(|| format!("Failed to write result file: {}", path.display()))?;

    info!(
        "Saved {} page loads to {}",
        result.load_results().len(),
        path.display()
    );
    Ok(())
}

pub fn load_result(path: &Path) -> Result<SimulationResult> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open result file: {}", path.display()))?;
    let result = read_result(BufReader::new(file), path)
        .with_context(|| format!("Failed to read result file: {}", path.display()))?;

    info!(
        "Loaded {} page loads from {}",
        result.load_results().len(),
        path.display()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ShadowRun;
    use std::io::Cursor;

    fn sample() -> SimulationResult {
        SimulationResult::new(
            ShadowRun {
                release: "v1.11.2".to_string(),
                start_time: "2016-11-19 00:14:35".to_string(),
                completion_time: "2016-11-19 03:31:09".to_string(),
            },
            "baseline",
        )
    }

    #[test]
    fn test_round_trip_in_memory() {
        let result = sample();
        let mut buf = Vec::new();
        write_result(&mut buf, &result).unwrap();

        let loaded = read_result(Cursor::new(buf), Path::new("mem")).unwrap();
        assert_eq!(loaded, result);
        assert_eq!(loaded.description(), "baseline");
    }

    #[test]
    fn test_version_checked_before_body() {
        let mut buf = Vec::new();
        {
            let mut encoder = zstd::Encoder::new(&mut buf, 0).unwrap();
            bincode::serialize_into(&mut encoder, &(FORMAT_VERSION + 1)).unwrap();
            // no body at all: the version alone must be enough to reject it
            encoder.finish().unwrap();
        }

        let err = read_result(Cursor::new(buf), Path::new("old.bin.zst")).unwrap_err();
        match err {
            ResultError::VersionMismatch { found, expected, .. } => {
                assert_eq!(found, FORMAT_VERSION + 1);
                assert_eq!(expected, FORMAT_VERSION);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_result(&dir.path().join("absent.bin.zst")).unwrap_err();
        assert!(format!("{:?}", err).contains("absent.bin.zst"));
    }
}
