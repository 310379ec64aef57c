//! Opening plain or zstd-compressed log files.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::ResultError;

/// Extension marking a zstd-compressed log
pub const COMPRESSED_EXTENSION: &str = "zst";

pub type LogReader = Box<dyn BufRead + Send>;

/// Open a log file, decompressing it when it ends in `.zst`.
pub fn open_log(path: &Path) -> io::Result<LogReader> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == COMPRESSED_EXTENSION) {
        let decoder = zstd::Decoder::new(file)?;
        Ok(Box::new(BufReader::with_capacity(64 * 1024, decoder)))
    } else {
        Ok(Box::new(BufReader::with_capacity(64 * 1024, file)))
    }
}

/// Plain and compressed candidate paths for a log stem
pub fn candidates(dir: &Path, stem: &str) -> Vec<PathBuf> {
    vec![
        dir.join(stem),
        dir.join(format!("{}.{}", stem, COMPRESSED_EXTENSION)),
    ]
}

/// Open the first candidate that exists.
///
/// A missing candidate falls through to the next one; any other I/O error
/// is returned immediately.
pub fn open_first_existing(paths: &[PathBuf]) -> Result<(PathBuf, LogReader), ResultError> {
    for path in paths {
        match open_log(path) {
            Ok(reader) => return Ok((path.clone(), reader)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("\"{}\" not found", path.display());
            }
            Err(e) => return Err(ResultError::Io(e)),
        }
    }
    Err(ResultError::MissingLog {
        tried: paths.to_vec(),
    })
}
