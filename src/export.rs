use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::OutputLayout;
use crate::data::model::Dataset;
use crate::matching::{Group, Partition};

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

pub fn group_file_name(id: usize) -> String {
    format!("group_{id}.txt")
}

pub fn plot_file_name(id: usize) -> String {
    format!("group_{id}_plot.png")
}

/// Parse the id out of a `group_<id>.txt` file name.
///
/// `Some(Err(..))` means the name has the group shape but the id is not an
/// integer.
pub fn parse_group_file_name(name: &str) -> Option<Result<usize, String>> {
    let id = name.strip_prefix("group_")?.strip_suffix(".txt")?;
    Some(id.parse::<usize>().map_err(|_| id.to_string()))
}

/// Whether `name` is a group file or group plot with a numeric id.
fn is_export_artifact(name: &str) -> bool {
    let group_file = match name.strip_suffix("_plot.png") {
        Some(stem) => format!("{stem}.txt"),
        None => name.to_string(),
    };
    matches!(parse_group_file_name(&group_file), Some(Ok(_)))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// What [`export_groups`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub group_files: Vec<PathBuf>,
    pub summary: PathBuf,
    pub lines: usize,
}

/// Write one file per group and the combined summary report.
///
/// Artifacts of earlier runs in the groups directory are removed first so
/// the directory always mirrors `partition`.
pub fn export_groups(
    partition: &Partition,
    datasets: &[Dataset],
    layout: &OutputLayout,
) -> Result<ExportSummary> {
    std::fs::create_dir_all(&layout.groups_dir)
        .with_context(|| format!("creating {}", layout.groups_dir.display()))?;
    remove_stale_artifacts(&layout.groups_dir)?;

    let file = File::create(&layout.summary)
        .with_context(|| format!("creating {}", layout.summary.display()))?;
    let mut report = BufWriter::new(file);

    let mut summary = ExportSummary {
        summary: layout.summary.clone(),
        ..ExportSummary::default()
    };

    for group in partition.groups() {
        let path = layout.groups_dir.join(group_file_name(group.id));
        if let Err(e) = write_group_file(&path, partition, group, datasets) {
            log::warn!("Skipping group file {}: {e:#}", path.display());
        } else {
            summary.group_files.push(path);
        }

        for record in partition.records(group, datasets) {
            writeln!(report, "{}", summary_line(group.id, &record.joined()))
                .with_context(|| format!("writing {}", layout.summary.display()))?;
            summary.lines += 1;
        }
    }
    report
        .flush()
        .with_context(|| format!("writing {}", layout.summary.display()))?;

    log::info!(
        "Total of {} groups saved to {}",
        partition.len(),
        layout.groups_dir.display()
    );
    Ok(summary)
}

/// One line of the summary report.
pub fn summary_line(id: usize, tokens: &str) -> String {
    format!("Group {id}: {tokens}")
}

fn write_group_file(
    path: &Path,
    partition: &Partition,
    group: &Group,
    datasets: &[Dataset],
) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for record in partition.records(group, datasets) {
        writeln!(out, "{}", record.joined())?;
    }
    out.flush()?;
    Ok(())
}

fn remove_stale_artifacts(dir: &Path) -> Result<()> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))?;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let stale = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_export_artifact);
        if stale {
            log::debug!("Removing {}", path.display());
            std::fs::remove_file(&path)
                .with_context(|| format!("removing {}", path.display()))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Summary sort
// ---------------------------------------------------------------------------

/// Group id of a summary line, if it has the `Group <id>:` shape.
pub fn summary_group_id(line: &str) -> Option<usize> {
    let rest = line.split_once("Group ")?.1;
    let (id, _) = rest.split_once(':')?;
    id.trim().parse().ok()
}

/// Sort lines by group id ascending, keeping the input order within a group.
/// Lines without an id go last.
pub fn sort_summary_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut lines: Vec<&str> = lines.into_iter().collect();
    lines.sort_by_key(|line| summary_group_id(line).unwrap_or(usize::MAX));
    lines
}

/// Path of the sorted copy: `<stem>_sorted.<ext>` next to the summary.
pub fn sorted_summary_path(summary: &Path) -> PathBuf {
    let stem = summary
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("summary");
    let name = match summary.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_sorted.{ext}"),
        None => format!("{stem}_sorted"),
    };
    summary.with_file_name(name)
}

/// Write a copy of the summary report sorted by group id.
///
/// Returns `Ok(None)` when there is no summary to sort.
pub fn sort_summary(summary: &Path) -> Result<Option<PathBuf>> {
    if !summary.exists() {
        log::info!(
            "Group file {} does not exist, skipping sorting",
            summary.display()
        );
        return Ok(None);
    }

    let text = std::fs::read_to_string(summary)
        .with_context(|| format!("reading {}", summary.display()))?;
    let unparsed = text
        .lines()
        .filter(|l| summary_group_id(l).is_none())
        .count();
    if unparsed > 0 {
        log::warn!(
            "{unparsed} lines of {} carry no group id, moved to the end",
            summary.display()
        );
    }

    let sorted = sorted_summary_path(summary);
    let mut out = BufWriter::new(
        File::create(&sorted).with_context(|| format!("creating {}", sorted.display()))?,
    );
    for line in sort_summary_lines(text.lines()) {
        writeln!(out, "{line}")?;
    }
    out.flush()
        .with_context(|| format!("writing {}", sorted.display()))?;

    log::info!("File sorted by group number and saved as {}", sorted.display());
    Ok(Some(sorted))
}
