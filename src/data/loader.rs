use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::model::{Dataset, Record};
use super::parser::parse_record;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load one candidate file, treating any read failure as an empty dataset.
///
/// A single unreadable file must not abort the batch, so the error is only
/// logged here.
pub fn load_dataset(path: &Path) -> Dataset {
    match read_dataset(path) {
        Ok(dataset) => {
            log::debug!(
                "Loaded {} records from {}",
                dataset.len(),
                path.display()
            );
            dataset
        }
        Err(e) => {
            log::warn!("Error reading file {}: {e:#}", path.display());
            Dataset::empty(path)
        }
    }
}

/// Load every file in order; dataset `i` always corresponds to `paths[i]`.
pub fn load_datasets(paths: &[PathBuf]) -> Vec<Dataset> {
    paths.iter().map(|p| load_dataset(p)).collect()
}

/// Strict variant of [`load_dataset`] that reports the failure.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(Dataset::new(path, parse_text(&text)))
}

// ---------------------------------------------------------------------------
// Text parsing
// ---------------------------------------------------------------------------

/// Parse a whole file body, dropping lines that carry no data tokens.
pub fn parse_text(text: &str) -> Vec<Record> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| parse_record(line, i + 1))
        .collect()
}
