use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::matching::{MalformedPolicy, Tolerances};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser, Debug, Clone, Default)]
#[command(
    author,
    version,
    about = "Cross-match periodic-source candidates across observation files",
    long_about = None,
    after_help = "Examples:\n  rusty-crossmatch --data data\n  rusty-crossmatch --data obs --marker M3 --period-tolerance 0.005 --on-malformed abort\n  rusty-crossmatch --config crossmatch.json --no-plot\n"
)]
pub struct Args {
    /// JSON file with run settings; flags given on the command line win
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the candidate files
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Directory for working copies and the summary report
    #[arg(long = "work-dir")]
    pub work_dir: Option<PathBuf>,

    /// Directory for group files and plots (relative to the work directory)
    #[arg(long = "groups-dir")]
    pub groups_dir: Option<PathBuf>,

    /// Only lines containing this text are cross-matched
    #[arg(long)]
    pub marker: Option<String>,

    /// Extension of candidate files in the data directory
    #[arg(long)]
    pub extension: Option<String>,

    /// Relative period tolerance
    #[arg(long = "period-tolerance")]
    pub period_tolerance: Option<f64>,

    /// Relative dispersion tolerance
    #[arg(long = "dispersion-tolerance")]
    pub dispersion_tolerance: Option<f64>,

    /// What to do with records whose period or dispersion is not a number.
    /// `abort` checks every record up front, before any pair is compared
    #[arg(long = "on-malformed", value_enum)]
    pub on_malformed: Option<MalformedPolicy>,

    /// Skip plot generation
    #[arg(long = "no-plot")]
    pub no_plot: bool,
}

// ---------------------------------------------------------------------------
// Resolved run configuration
// ---------------------------------------------------------------------------

/// All settings of one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    pub work_dir: PathBuf,
    pub groups_dir: PathBuf,
    pub marker: String,
    pub extension: String,
    pub period_tolerance: f64,
    pub dispersion_tolerance: f64,
    pub on_malformed: MalformedPolicy,
    pub plot: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        let tolerances = Tolerances::default();
        Self {
            data_dir: PathBuf::from("data"),
            work_dir: PathBuf::from("."),
            groups_dir: PathBuf::from("groups"),
            marker: "M3".to_string(),
            extension: "txt".to_string(),
            period_tolerance: tolerances.period,
            dispersion_tolerance: tolerances.dispersion,
            on_malformed: MalformedPolicy::default(),
            plot: true,
        }
    }
}

/// Where exported files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub groups_dir: PathBuf,
    pub summary: PathBuf,
}

impl RunConfig {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Defaults, overlaid by the config file, overlaid by explicit flags.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut cfg = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(v) = &args.data {
            cfg.data_dir = v.clone();
        }
        if let Some(v) = &args.work_dir {
            cfg.work_dir = v.clone();
        }
        if let Some(v) = &args.groups_dir {
            cfg.groups_dir = v.clone();
        }
        if let Some(v) = &args.marker {
            cfg.marker = v.clone();
        }
        if let Some(v) = &args.extension {
            cfg.extension = v.trim_start_matches('.').to_string();
        }
        if let Some(v) = args.period_tolerance {
            cfg.period_tolerance = v;
        }
        if let Some(v) = args.dispersion_tolerance {
            cfg.dispersion_tolerance = v;
        }
        if let Some(v) = args.on_malformed {
            cfg.on_malformed = v;
        }
        if args.no_plot {
            cfg.plot = false;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, tol) in [
            ("period_tolerance", self.period_tolerance),
            ("dispersion_tolerance", self.dispersion_tolerance),
        ] {
            if !(tol.is_finite() && tol > 0.0) {
                anyhow::bail!("{name} must be a positive number, got {tol}");
            }
        }
        if self.marker.is_empty() {
            anyhow::bail!("marker must not be empty");
        }
        Ok(())
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            period: self.period_tolerance,
            dispersion: self.dispersion_tolerance,
        }
    }

    /// Group directory and summary path, both under the work directory.
    pub fn layout(&self) -> OutputLayout {
        OutputLayout {
            groups_dir: self.work_dir.join(&self.groups_dir),
            summary: self.work_dir.join(format!(
                "process_all_{}_{}.txt",
                self.marker, self.period_tolerance
            )),
        }
    }
}
