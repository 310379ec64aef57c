//! Cumulative distribution tables.
//!
//! Input samples must already be sorted ascending. Unsorted input does not
//! panic but the fractions it yields are meaningless.

use std::collections::HashMap;
use std::io::{self, Write};

/// One `(representative value, cumulative fraction)` point
pub type CdfPoint = (f64, f64);

/// Build a CDF from sorted samples.
///
/// With `bucket_size == 0` every sample becomes its own point. Otherwise a
/// sample `v` lands in the bucket represented by its upper bound
/// `ceil(v / bucket_size) * bucket_size`, except that the smallest sample
/// keeps a bucket keyed by its own value so an outlying minimum stays visible.
pub fn build_cdf(sorted: &[f64], bucket_size: f64) -> Vec<CdfPoint> {
    let total = sorted.len();
    if total == 0 {
        return Vec::new();
    }

    if bucket_size <= 0.0 {
        return sorted
            .iter()
            .enumerate()
            .map(|(idx, &value)| (value, (idx + 1) as f64 / total as f64))
            .collect();
    }

    let min = sorted.iter().copied().fold(f64::INFINITY, f64::min);

    // keyed by bit pattern; -0.0 is folded into 0.0 first
    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for &value in sorted {
        let key = if value == min {
            min
        } else {
            (value / bucket_size).ceil() * bucket_size
        };
        let key = if key == 0.0 { 0.0 } else { key };
        counts.entry(key.to_bits()).or_insert((key, 0)).1 += 1;
    }

    let mut buckets: Vec<(f64, usize)> = counts.into_values().collect();
    buckets.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut cumulative = 0;
    buckets
        .into_iter()
        .map(|(key, count)| {
            cumulative += count;
            (key, cumulative as f64 / total as f64)
        })
        .collect()
}

/// Write points as two whitespace-separated columns, preceded by
/// `# `-prefixed comment lines.
pub fn write_cdf<W: Write>(dest: &mut W, points: &[CdfPoint], comment_lines: &[String]) -> io::Result<()> {
    for line in comment_lines {
        writeln!(dest, "# {}", line)?;
    }
    for (value, fraction) in points {
        writeln!(dest, "{:.6}    {:.6}", value, fraction)?;
    }
    Ok(())
}
