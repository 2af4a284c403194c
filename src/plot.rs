use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::color::{gray_ramp, SignalShade};
use crate::data::model::{DISPERSION, LABEL, MIN_TOKENS, PERIOD, SIGNAL};
use crate::export::{parse_group_file_name, plot_file_name};

const PLOT_SIZE: (u32, u32) = (1200, 900);
const COLORBAR_WIDTH: u32 = 160;
const POINT_RADIUS: i32 = 10;
const POINT_ALPHA: f64 = 0.8;
const COLORBAR_STEPS: usize = 64;
const DASHES: usize = 60;

/// Captions, axis titles and tick labels need a font backend. Without the
/// `fonts` feature plotters cannot rasterize text, so none is drawn.
const DRAW_TEXT: bool = cfg!(feature = "fonts");

// ---------------------------------------------------------------------------
// Deviation from the mean
// ---------------------------------------------------------------------------

/// Per-element deviation from the mean in permille.
///
/// `None` for an empty list or when the mean is zero or not finite.
pub fn permille_deviations(values: &[f64]) -> Option<Vec<f64>> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 || !mean.is_finite() {
        return None;
    }
    Some(values.iter().map(|x| (x - mean) / mean * 1000.0).collect())
}

// ---------------------------------------------------------------------------
// Group file parsing
// ---------------------------------------------------------------------------

/// The fields of one grouped record the plot needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPoint {
    pub label: String,
    pub period: f64,
    pub dispersion: f64,
    pub signal: f64,
}

impl GroupPoint {
    /// Parse a space-separated group file line.
    pub fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < MIN_TOKENS {
            return None;
        }
        Some(Self {
            label: parts[LABEL].to_string(),
            period: parts[PERIOD].parse().ok()?,
            dispersion: parts[DISPERSION].parse().ok()?,
            signal: parts[SIGNAL].parse().ok()?,
        })
    }
}

/// Read the plottable records of an exported group file.
pub fn read_group_points(path: &Path) -> Result<Vec<GroupPoint>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(text
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let point = GroupPoint::parse(line);
            if point.is_none() {
                log::debug!("{} line {}: not plottable", path.display(), i + 1);
            }
            point
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Plotting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum PlotOutcome {
    Saved(PathBuf),
    Skipped(String),
}

/// Plot one group file into `out_dir/group_<id>_plot.png`.
pub fn plot_group(group_file: &Path, id: usize, out_dir: &Path, marker: &str) -> Result<PlotOutcome> {
    if !group_file.exists() {
        return Ok(PlotOutcome::Skipped(format!(
            "group file {} does not exist",
            group_file.display()
        )));
    }

    let points = read_group_points(group_file)?;
    if points.len() < 2 {
        return Ok(PlotOutcome::Skipped(format!(
            "group {id} has insufficient data points ({})",
            points.len()
        )));
    }

    let periods: Vec<f64> = points.iter().map(|p| p.period).collect();
    let dispersions: Vec<f64> = points.iter().map(|p| p.dispersion).collect();
    let signals: Vec<f64> = points.iter().map(|p| p.signal).collect();

    let (Some(dp), Some(dd)) = (
        permille_deviations(&periods),
        permille_deviations(&dispersions),
    ) else {
        return Ok(PlotOutcome::Skipped(format!(
            "group {id} has a zero mean period or dispersion"
        )));
    };
    let Some(shade) = SignalShade::new(&signals) else {
        return Ok(PlotOutcome::Skipped(format!("group {id} has no signal values")));
    };

    let out = out_dir.join(plot_file_name(id));
    let chart = ScatterChart {
        title: format!("{marker} candidates, group {id}"),
        x: &dp,
        y: &dd,
        signals: &signals,
        shade,
    };
    chart.save(&out)?;
    Ok(PlotOutcome::Saved(out))
}

/// Plot every `group_<id>.txt` in `groups_dir` in ascending id order.
///
/// Returns the number of plots written. Problems with individual groups are
/// logged and skipped.
pub fn plot_all_groups(groups_dir: &Path, marker: &str) -> Result<usize> {
    if !groups_dir.is_dir() {
        log::warn!(
            "Groups directory {} does not exist, cannot plot",
            groups_dir.display()
        );
        return Ok(0);
    }

    let mut groups: Vec<(usize, PathBuf)> = Vec::new();
    let entries = std::fs::read_dir(groups_dir)
        .with_context(|| format!("listing {}", groups_dir.display()))?;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match parse_group_file_name(name) {
            Some(Ok(id)) => groups.push((id, path)),
            Some(Err(bad)) => log::warn!("Skipping invalid group file: {name} (id '{bad}')"),
            None => {}
        }
    }

    if groups.is_empty() {
        log::info!("No group files found in {}", groups_dir.display());
        return Ok(0);
    }
    groups.sort();

    let mut saved = 0;
    for (id, path) in groups {
        match plot_group(&path, id, groups_dir, marker) {
            Ok(PlotOutcome::Saved(out)) => {
                log::info!("Group {id} plot saved as {}", out.display());
                saved += 1;
            }
            Ok(PlotOutcome::Skipped(reason)) => log::info!("Skipping plot: {reason}"),
            Err(e) => log::warn!("Group {id} plot failed: {e:#}"),
        }
    }
    Ok(saved)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Axis range around `values` that always contains zero, padded by 10%.
fn padded_range(values: &[f64]) -> Range<f64> {
    let lo = values.iter().cloned().fold(0.0, f64::min);
    let hi = values.iter().cloned().fold(0.0, f64::max);
    let pad = ((hi - lo) * 0.1).max(1e-3);
    (lo - pad)..(hi + pad)
}

/// Red dashed reference line from `from` to `to`.
fn dashes(from: (f64, f64), to: (f64, f64)) -> impl Iterator<Item = PathElement<(f64, f64)>> {
    let at = move |t: f64| (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
    (0..DASHES).map(move |i| {
        let t0 = i as f64 / DASHES as f64;
        let t1 = (i as f64 + 0.6) / DASHES as f64;
        PathElement::new(vec![at(t0), at(t1)], RED.stroke_width(1))
    })
}

struct ScatterChart<'a> {
    title: String,
    x: &'a [f64],
    y: &'a [f64],
    signals: &'a [f64],
    shade: SignalShade,
}

impl ScatterChart<'_> {
    fn save(&self, path: &Path) -> Result<()> {
        let (w, h) = PLOT_SIZE;
        let mut buf = vec![0u8; (w * h * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, PLOT_SIZE).into_drawing_area();
            self.draw(&root)?;
            root.present()?;
        }
        let image = image::RgbImage::from_raw(w, h, buf)
            .ok_or_else(|| anyhow!("plot buffer does not match {w}x{h}"))?;
        image
            .save(path)
            .with_context(|| format!("saving {}", path.display()))?;
        Ok(())
    }

    fn draw(&self, root: &DrawingArea<BitMapBackend<'_>, Shift>) -> Result<()> {
        root.fill(&WHITE)?;
        let (w, _) = root.dim_in_pixel();
        let (main, bar) = if self.shade.has_range() {
            root.split_horizontally(w.saturating_sub(COLORBAR_WIDTH))
        } else {
            root.split_horizontally(w)
        };

        let x_range = padded_range(self.x);
        let y_range = padded_range(self.y);
        let mut builder = ChartBuilder::on(&main);
        builder.margin(20);
        if DRAW_TEXT {
            builder
                .caption(&self.title, ("sans-serif", 28).into_font())
                .x_label_area_size(50)
                .y_label_area_size(70);
        }
        let mut chart = builder.build_cartesian_2d(x_range.clone(), y_range.clone())?;

        // Tick labels only exist inside label areas, which are empty without
        // a font backend.
        {
            let mut mesh = chart.configure_mesh();
            mesh.light_line_style(WHITE.mix(0.0));
            if DRAW_TEXT {
                mesh.x_desc("Permille ratio of P difference")
                    .y_desc("Permille ratio of DM difference")
                    .label_style(("sans-serif", 16).into_font())
                    .axis_desc_style(("sans-serif", 20).into_font());
            }
            mesh.draw()?;
        }

        chart.draw_series(dashes((x_range.start, 0.0), (x_range.end, 0.0)))?;
        chart.draw_series(dashes((0.0, y_range.start), (0.0, y_range.end)))?;

        chart.draw_series(
            self.x
                .iter()
                .zip(self.y)
                .zip(self.signals)
                .map(|((&x, &y), &s)| {
                    let color = self.shade.color_for(s);
                    Circle::new((x, y), POINT_RADIUS, color.mix(POINT_ALPHA).filled())
                }),
        )?;

        if self.shade.has_range() {
            self.draw_colorbar(&bar)?;
        }
        Ok(())
    }

    fn draw_colorbar(&self, area: &DrawingArea<BitMapBackend<'_>, Shift>) -> Result<()> {
        let (min, max) = (self.shade.min, self.shade.max);
        let mut builder = ChartBuilder::on(area);
        builder.margin_top(70).margin_bottom(70).margin_right(20);
        if DRAW_TEXT {
            builder.y_label_area_size(60);
        }
        let mut bar = builder.build_cartesian_2d(0.0..1.0, min..max)?;

        if DRAW_TEXT {
            bar.configure_mesh()
                .disable_mesh()
                .disable_x_axis()
                .y_desc("SNR")
                .label_style(("sans-serif", 14).into_font())
                .axis_desc_style(("sans-serif", 16).into_font())
                .draw()?;
        }

        let step = (max - min) / COLORBAR_STEPS as f64;
        bar.draw_series(gray_ramp(COLORBAR_STEPS).into_iter().enumerate().map(|(i, c)| {
            let lo = min + step * i as f64;
            Rectangle::new([(0.0, lo), (1.0, lo + step)], c.filled())
        }))?;
        Ok(())
    }
}
