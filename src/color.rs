use serde::Deserialize;

/// Near-transparent neutral used for empty cells and the zero-max guard.
pub const NEUTRAL: Rgba = Rgba::new(255, 255, 255, 0.05);

const GREEN: (u8, u8, u8) = (34, 197, 94);
const AMBER: (u8, u8, u8) = (245, 158, 11);
const RED: (u8, u8, u8) = (239, 68, 68);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Rgba {
        Rgba { r, g, b, a }
    }

    pub fn css(&self) -> String {
        // keep alpha readable in markup, three decimals is plenty
        let a = (self.a * 1000.0).round() / 1000.0;
        format!("rgba({},{},{},{})", self.r, self.g, self.b, a)
    }
}

/// Continuous green→amber→red gradient over a `[0, max]` magnitude, used by
/// the dense heatmap. Pure: the same `(value, max)` always yields the same
/// color. Band thresholds and opacity slopes are the observed dashboard
/// constants, overridable from config.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ColorScale {
    pub green_band: f64,
    pub amber_band: f64,
    pub base_alpha: f64,
    pub band_slope: f64,
    pub red_slope: f64,
}

impl Default for ColorScale {
    fn default() -> ColorScale {
        ColorScale {
            green_band: 0.34,
            amber_band: 0.67,
            base_alpha: 0.10,
            band_slope: 0.45,
            red_slope: 0.55,
        }
    }
}

impl ColorScale {
    /// Hue picks the band, opacity rises linearly with the ratio inside it.
    /// `max <= 0` and zero values fall back to the neutral color.
    pub fn color_for(&self, value: u64, max: u64) -> Rgba {
        if max == 0 || value == 0 {
            return NEUTRAL;
        }
        let r = (value as f64 / max as f64).min(1.0);
        if r < self.green_band {
            let (cr, cg, cb) = GREEN;
            Rgba::new(cr, cg, cb, self.base_alpha + r * self.band_slope)
        } else if r < self.amber_band {
            let (cr, cg, cb) = AMBER;
            Rgba::new(cr, cg, cb, self.base_alpha + r * self.band_slope)
        } else {
            let (cr, cg, cb) = RED;
            Rgba::new(cr, cg, cb, self.base_alpha + r * self.red_slope)
        }
    }
}

/// Tone of a sparse heatmap cell, keyed off its severity-weighted score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Strong,
    Medium,
    Weak,
    Faint,
}

impl Tone {
    pub fn color(self) -> Rgba {
        match self {
            Tone::Strong => Rgba::new(RED.0, RED.1, RED.2, 0.40),
            Tone::Medium => Rgba::new(AMBER.0, AMBER.1, AMBER.2, 0.35),
            Tone::Weak => Rgba::new(GREEN.0, GREEN.1, GREEN.2, 0.30),
            Tone::Faint => NEUTRAL,
        }
    }
}

/// Fixed score thresholds for the sparse path. The 6/3 cutoffs come straight
/// from the dashboard; no derivation exists for them, so they stay plain
/// configurable numbers.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ScoreBands {
    pub strong: u64,
    pub medium: u64,
}

impl Default for ScoreBands {
    fn default() -> ScoreBands {
        ScoreBands { strong: 6, medium: 3 }
    }
}

impl ScoreBands {
    pub fn tone(&self, score: u64) -> Tone {
        if score > self.strong {
            Tone::Strong
        } else if score > self.medium {
            Tone::Medium
        } else if score > 0 {
            Tone::Weak
        } else {
            Tone::Faint
        }
    }
}
