use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::RunConfig;
use crate::data::{filter, loader};
use crate::export;
use crate::matching::{assemble, Matcher, Partition};
use crate::plot;

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Counts and paths produced by one batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub inputs: usize,
    pub working_copies: Vec<PathBuf>,
    pub records: usize,
    pub groups: usize,
    pub grouped_records: usize,
    pub summary: Option<PathBuf>,
    pub sorted_summary: Option<PathBuf>,
    pub plots: usize,
}

// ---------------------------------------------------------------------------
// Batch pipeline
// ---------------------------------------------------------------------------

pub struct CrossMatchApp {
    pub config: RunConfig,
}

impl CrossMatchApp {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Filter, load, match, export, sort and plot.
    ///
    /// An empty or missing input directory ends the run early without error.
    pub fn run(&self) -> Result<RunReport> {
        let cfg = &self.config;
        let mut report = RunReport::default();

        // ---- 1. Working copies ----
        let inputs = filter::list_inputs(&cfg.data_dir, &cfg.extension);
        report.inputs = inputs.len();
        if inputs.is_empty() {
            log::info!("No files found to process in {}", cfg.data_dir.display());
            return Ok(report);
        }

        std::fs::create_dir_all(&cfg.work_dir)
            .with_context(|| format!("creating {}", cfg.work_dir.display()))?;
        report.working_copies = filter::write_working_copies(&inputs, &cfg.work_dir, &cfg.marker);
        if report.working_copies.is_empty() {
            log::info!("No readable input files, nothing to match");
            return Ok(report);
        }

        // ---- 2. Load and group ----
        let datasets = loader::load_datasets(&report.working_copies);
        report.records = datasets.iter().map(|d| d.len()).sum();
        log::info!(
            "Loaded {} records from {} files",
            report.records,
            datasets.len()
        );

        let matcher = Matcher::new(cfg.tolerances());
        let partition: Partition = assemble(&datasets, &matcher, cfg.on_malformed)
            .context("matching candidates")?;
        report.groups = partition.len();
        report.grouped_records = partition.total_members();

        // ---- 3. Export and sort ----
        let layout = cfg.layout();
        let exported = export::export_groups(&partition, &datasets, &layout)?;
        report.summary = Some(exported.summary);
        report.sorted_summary = export::sort_summary(&layout.summary)?;

        // ---- 4. Plots ----
        if cfg.plot {
            report.plots = plot::plot_all_groups(&layout.groups_dir, &cfg.marker)?;
            log::info!("All group plots generated ({} plots)", report.plots);
        }

        Ok(report)
    }
}
