use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Gray ramp
// ---------------------------------------------------------------------------

/// Gray level shown when every signal value is the same.
pub const MID_GRAY: f64 = 0.5;

/// Convert a lightness in `[0, 1]` into an sRGB gray.
pub fn gray(lightness: f64) -> RGBColor {
    let l = lightness.clamp(0.0, 1.0) as f32;
    let hsl: Hsl = Hsl::new(0.0, 0.0, l);
    let rgb: Srgb = hsl.into_color();
    RGBColor(
        (rgb.red * 255.0).round() as u8,
        (rgb.green * 255.0).round() as u8,
        (rgb.blue * 255.0).round() as u8,
    )
}

/// `n` evenly spaced grays from white to black, used for the colour bar.
pub fn gray_ramp(n: usize) -> Vec<RGBColor> {
    match n {
        0 => Vec::new(),
        1 => vec![gray(MID_GRAY)],
        _ => (0..n)
            .map(|i| gray(1.0 - i as f64 / (n - 1) as f64))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Signal shading: signal value → gray
// ---------------------------------------------------------------------------

/// Maps signal strengths onto a gray scale, stronger signals darker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalShade {
    pub min: f64,
    pub max: f64,
}

impl SignalShade {
    /// Build the shade from the observed signal values.
    pub fn new(signals: &[f64]) -> Option<Self> {
        if signals.is_empty() {
            return None;
        }
        let min = signals.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = signals.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some(Self { min, max })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Whether the values span a non-empty range.
    pub fn has_range(&self) -> bool {
        self.range() > 0.0
    }

    /// Lightness for one signal value: 1 - normalized, or mid gray when the
    /// range is empty.
    pub fn lightness(&self, signal: f64) -> f64 {
        if self.has_range() {
            1.0 - (signal - self.min) / self.range()
        } else {
            MID_GRAY
        }
    }

    pub fn color_for(&self, signal: f64) -> RGBColor {
        gray(self.lightness(signal))
    }
}
