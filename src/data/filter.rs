use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// Input discovery
// ---------------------------------------------------------------------------

/// List the files in `dir` with the given extension, sorted by file name.
///
/// A missing or unreadable directory yields an empty list with a warning.
pub fn list_inputs(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!(
                "Folder '{}' is not readable ({e}), skipping data processing",
                dir.display()
            );
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == extension)
        })
        .collect();
    files.sort();
    files
}

// ---------------------------------------------------------------------------
// Marker filter and working copies
// ---------------------------------------------------------------------------

/// Lines of `text` that contain `marker` literally.
pub fn filter_lines<'a>(text: &'a str, marker: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    text.lines().filter(move |line| line.contains(marker))
}

/// Name of the `n`-th (1-based) working copy.
pub fn working_copy_name(n: usize) -> String {
    format!("test{n}.txt")
}

/// Copy the marker lines of each input into `work_dir/test<n>.txt`.
///
/// Inputs without any marker line still produce an empty working copy.
/// An input that cannot be read or written is logged and left out.
pub fn write_working_copies(inputs: &[PathBuf], work_dir: &Path, marker: &str) -> Vec<PathBuf> {
    let mut outputs = Vec::with_capacity(inputs.len());

    for (i, input) in inputs.iter().enumerate() {
        let output = work_dir.join(working_copy_name(i + 1));
        match write_working_copy(input, &output, marker) {
            Ok(kept) => {
                log::debug!(
                    "{} -> {} ({kept} lines with '{marker}')",
                    input.display(),
                    output.display()
                );
                outputs.push(output);
            }
            Err(e) => log::warn!("Skipping {}: {e:#}", input.display()),
        }
    }

    outputs
}

fn write_working_copy(input: &Path, output: &Path, marker: &str) -> Result<usize> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut out = BufWriter::new(file);

    let mut kept = 0;
    for line in filter_lines(&text, marker) {
        writeln!(out, "{line}")?;
        kept += 1;
    }
    out.flush()
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_lines_matches_literal_marker() {
        let text = "a M3 1\nb M2 2\nM33 3\nm3 4\n";
        let kept: Vec<&str> = filter_lines(text, "M3").collect();
        assert_eq!(kept, ["a M3 1", "M33 3"]);
    }

    #[test]
    fn list_inputs_filters_extension_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "c.dat", "notes"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.txt")).unwrap();

        let files = list_inputs(dir.path(), "txt");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a.txt", "b.txt"]);
    }

    #[test]
    fn list_inputs_on_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_inputs(&dir.path().join("data"), "txt").is_empty());
    }

    #[test]
    fn working_copies_are_numbered_and_keep_empty_files() {
        let src = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let a = src.path().join("a.txt");
        let b = src.path().join("b.txt");
        let missing = src.path().join("missing.txt");
        std::fs::write(&a, "keep M3 1\ndrop 2\n").unwrap();
        std::fs::write(&b, "nothing here 3\n").unwrap();

        let copies = write_working_copies(&[a, missing, b], work.path(), "M3");
        assert_eq!(
            copies,
            [work.path().join("test1.txt"), work.path().join("test3.txt")]
        );
        assert_eq!(std::fs::read_to_string(&copies[0]).unwrap(), "keep M3 1\n");
        assert_eq!(std::fs::read_to_string(&copies[1]).unwrap(), "");
    }
}
