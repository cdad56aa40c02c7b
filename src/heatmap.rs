use crate::color::{ColorScale, Rgba, ScoreBands};
use crate::models::{Alert, FullMatrix, HeatmapSnapshot, TechniqueCell};
use crate::severity::Tier;

pub const EMPTY_MESSAGE: &str = "No MITRE data yet. Generate alerts with \"mitre\" field first.";

/// The two shapes the backend serves. Both collapse into one canonical
/// `HeatmapGrid` before anything is rendered, so the render path never
/// branches on where the data came from.
pub enum HeatmapSource<'a> {
    /// `/api/mitre/heatmap`: matrix and max already computed server-side.
    Dense(&'a HeatmapSnapshot),
    /// `/api/mitre/full`: per-cell counts, severity breakdown and alerts.
    Sparse(&'a FullMatrix),
}

/// Coloring knobs for both heatmap shapes, sourced from config.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeatmapStyle {
    pub scale: ColorScale,
    pub bands: ScoreBands,
}

/// Render-time drill-down filter. Purely a view concern: the aggregated data
/// is untouched, re-aggregation on a filter change is cheap and synchronous.
#[derive(Clone, Debug, Default)]
pub struct FilterState {
    pub search_term: String,
    pub severity_filter: String,
}

impl FilterState {
    /// A cell survives when the search term is a substring of its technique
    /// id and the selected tier has a non-zero count in the cell.
    pub fn passes(&self, technique: &str, cell: &TechniqueCell) -> bool {
        if !self.search_term.is_empty() && !technique.contains(&self.search_term) {
            return false;
        }
        if !self.severity_filter.is_empty() {
            let count = cell
                .severity
                .get(&self.severity_filter)
                .copied()
                .unwrap_or(0);
            if count == 0 {
                return false;
            }
        }
        true
    }
}

pub struct HeatmapCell {
    pub technique: String,
    pub value: u64,
    pub color: Rgba,
    pub label: String,
    pub tooltip: String,
    /// Drill-down payload; only the sparse path carries alerts.
    pub alerts: Vec<Alert>,
}

pub struct HeatmapRow {
    pub tactic: String,
    pub cells: Vec<HeatmapCell>,
}

/// Canonical aggregated form consumed by the renderer.
pub enum HeatmapGrid {
    /// Either axis was empty; show a message instead of a grid.
    Placeholder(&'static str),
    Grid {
        /// Header labels; empty for the sparse layout, which has no header row.
        techniques: Vec<String>,
        rows: Vec<HeatmapRow>,
    },
}

/// Severity-weighted cell score: Σ tier-weight × tier-count over every tier
/// present in the cell.
pub fn severity_score(cell: &TechniqueCell) -> u64 {
    cell.severity
        .iter()
        .map(|(label, count)| Tier::classify(label).weight() * count)
        .sum()
}

pub fn aggregate_dense(snapshot: &HeatmapSnapshot, scale: &ColorScale) -> HeatmapGrid {
    if snapshot.tactics.is_empty() || snapshot.techniques.is_empty() {
        return HeatmapGrid::Placeholder(EMPTY_MESSAGE);
    }

    let max = snapshot.max_value();
    let rows = snapshot
        .tactics
        .iter()
        .enumerate()
        .map(|(i, tactic)| {
            let cells = snapshot
                .techniques
                .iter()
                .enumerate()
                .map(|(j, technique)| {
                    let value = snapshot.value_at(i, j);
                    HeatmapCell {
                        technique: technique.clone(),
                        value,
                        color: scale.color_for(value, max),
                        label: if value > 0 { value.to_string() } else { "·".to_string() },
                        tooltip: format!("{tactic} / {technique} = {value}"),
                        alerts: Vec::new(),
                    }
                })
                .collect();
            HeatmapRow { tactic: tactic.clone(), cells }
        })
        .collect();

    HeatmapGrid::Grid {
        techniques: snapshot.techniques.clone(),
        rows,
    }
}

pub fn aggregate_sparse(full: &FullMatrix, bands: &ScoreBands, filter: &FilterState) -> HeatmapGrid {
    let rows = full
        .iter()
        .map(|(tactic, techniques)| {
            let cells = techniques
                .iter()
                .filter(|(technique, cell)| filter.passes(technique, cell))
                .map(|(technique, cell)| HeatmapCell {
                    technique: technique.clone(),
                    value: cell.count,
                    color: bands.tone(severity_score(cell)).color(),
                    label: technique.clone(),
                    tooltip: format!("Count: {}", cell.count),
                    alerts: cell.alerts.clone(),
                })
                .collect();
            HeatmapRow { tactic: tactic.clone(), cells }
        })
        .collect();

    HeatmapGrid::Grid {
        techniques: Vec::new(),
        rows,
    }
}

/// The single adapter step: any source shape in, one canonical grid out.
pub fn aggregate(source: HeatmapSource<'_>, style: &HeatmapStyle, filter: &FilterState) -> HeatmapGrid {
    match source {
        HeatmapSource::Dense(snapshot) => aggregate_dense(snapshot, &style.scale),
        HeatmapSource::Sparse(full) => aggregate_sparse(full, &style.bands, filter),
    }
}
