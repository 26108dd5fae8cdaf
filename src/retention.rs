//! Rotated segment retention
//!
//! Deletes the oldest archived log segments once their number exceeds the
//! configured retention count. Ordering comes from the timestamp embedded in
//! the segment filename, which names the interval start and is authoritative
//! over filesystem timestamps.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Delete rotated segments of `base_path` beyond the newest `keep` entries
///
/// Segments are files named `<base>.<YYYY-MM-DD_HH-MM-SS>` in the same
/// directory as the base file. Returns the number of files deleted.
pub fn prune_rotated_segments(base_path: &Path, keep: usize) -> Result<usize> {
    let dir = match base_path.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => Path::new("."),
    };
    let base_name = base_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = format!("{}.", base_name);

    let mut segments: Vec<(String, std::path::PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to list log directory {}", dir.display()))?
    {
        let entry = entry.context("Failed to read log directory entry")?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(suffix) = name.strip_prefix(&prefix) {
            if is_segment_suffix(suffix) {
                segments.push((suffix.to_string(), entry.path()));
            }
        }
    }

    if segments.len() <= keep {
        return Ok(0);
    }

    // The suffix format sorts lexicographically in chronological order.
    segments.sort_by(|a, b| a.0.cmp(&b.0));

    let excess = segments.len() - keep;
    for (_, path) in segments.into_iter().take(excess) {
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete old segment {}", path.display()))?;
    }
    Ok(excess)
}

/// Check that a filename suffix matches `YYYY-MM-DD_HH-MM-SS`
fn is_segment_suffix(suffix: &str) -> bool {
    let bytes = suffix.as_bytes();
    if bytes.len() != 19 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 | 13 | 16 => *b == b'-',
        10 => *b == b'_',
        _ => b.is_ascii_digit(),
    })
}
