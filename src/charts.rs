use anyhow::bail;
use indexmap::IndexMap;
use serde::Serialize;

use crate::models::StatsSnapshot;

const SEVERITY_PALETTE: [&str; 4] = ["#ef4444", "#f59e0b", "#22c55e", "#38bdf8"];
const ACCENT: &str = "#38bdf8";
const ACCENT_FILL: &str = "rgba(56,189,248,0.15)";
const MINI_FILL: &str = "rgba(56,189,248,0.12)";
const BAR_GREEN: &str = "#22c55e";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Doughnut,
    Line,
    Bar,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DataSet {
    pub label: String,
    pub data: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub background: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<DataSet>,
}

pub fn severity_data(stats: &StatsSnapshot) -> ChartData {
    ChartData {
        labels: stats.severity.keys().cloned().collect(),
        datasets: vec![DataSet {
            label: String::new(),
            data: stats.severity.values().map(|&v| v as f64).collect(),
            background: SEVERITY_PALETTE.iter().map(|s| s.to_string()).collect(),
            border: None,
        }],
    }
}

pub fn timeline_data(stats: &StatsSnapshot) -> ChartData {
    ChartData {
        labels: stats.timeline.keys().cloned().collect(),
        datasets: vec![DataSet {
            label: "Alerts / minute".to_string(),
            data: stats.timeline.values().map(|&v| v as f64).collect(),
            background: vec![ACCENT_FILL.to_string()],
            border: Some(ACCENT.to_string()),
        }],
    }
}

pub fn mitre_data(stats: &StatsSnapshot) -> ChartData {
    ChartData {
        labels: stats.mitre_top.keys().cloned().collect(),
        datasets: vec![DataSet {
            label: "MITRE Techniques".to_string(),
            data: stats.mitre_top.values().map(|&v| v as f64).collect(),
            background: vec![BAR_GREEN.to_string()],
            border: None,
        }],
    }
}

pub fn mini_timeline_data(stats: &StatsSnapshot) -> ChartData {
    ChartData {
        labels: stats.timeline.keys().cloned().collect(),
        datasets: vec![DataSet {
            label: "Alerts".to_string(),
            data: stats.timeline.values().map(|&v| v as f64).collect(),
            background: vec![MINI_FILL.to_string()],
            border: Some(ACCENT.to_string()),
        }],
    }
}

/// Handle to one live visualization instance. The rendering sink only ever
/// sees the bound `data`; `id` is assigned at creation and never changes, so
/// instance identity survives every dataset update.
#[derive(Clone, Debug, Serialize)]
pub struct ChartHandle {
    pub id: u64,
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: serde_json::Value,
    pub redraws: u64,
}

/// Chart lifecycle: create once per name, update in place forever after.
/// Recreating an instance every poll would flicker and leak sink resources,
/// so the create path rejects duplicate names as no-ops.
#[derive(Debug, Default)]
pub struct ChartRegistry {
    next_id: u64,
    charts: IndexMap<String, ChartHandle>,
}

impl ChartRegistry {
    pub fn new() -> ChartRegistry {
        ChartRegistry::default()
    }

    /// Create the named chart if it does not exist yet. A second call with
    /// the same name leaves the existing instance untouched.
    pub fn ensure(&mut self, name: &str, kind: ChartKind, data: ChartData, options: serde_json::Value) {
        if self.charts.contains_key(name) {
            return;
        }
        self.next_id += 1;
        self.charts.insert(
            name.to_string(),
            ChartHandle {
                id: self.next_id,
                kind,
                data,
                options,
                redraws: 0,
            },
        );
    }

    /// Swap the bound dataset and trigger a redraw. Updating a chart that
    /// was never ensured is a caller bug.
    pub fn update(&mut self, name: &str, data: ChartData) -> anyhow::Result<()> {
        let Some(handle) = self.charts.get_mut(name) else {
            bail!("chart '{name}' updated before ensure");
        };
        handle.data = data;
        handle.redraws += 1;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ChartHandle> {
        self.charts.get(name)
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> StatsSnapshot {
        serde_json::from_str(
            r#"{
                "total": 6,
                "severity": {"HIGH": 2, "MEDIUM": 3, "LOW": 1},
                "timeline": {"10:00": 1, "10:01": 5},
                "mitre_top": {"T1110": 4, "T1548": 2}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn ensure_is_idempotent_per_name() {
        let mut reg = ChartRegistry::new();
        reg.ensure("severity", ChartKind::Doughnut, severity_data(&stats()), serde_json::json!({}));
        let first_id = reg.get("severity").unwrap().id;

        reg.ensure("severity", ChartKind::Bar, ChartData::default(), serde_json::json!({}));
        assert_eq!(reg.len(), 1);
        let handle = reg.get("severity").unwrap();
        assert_eq!(handle.id, first_id);
        assert_eq!(handle.kind, ChartKind::Doughnut);
        assert!(!handle.data.labels.is_empty());
    }

    #[test]
    fn update_mutates_in_place_and_keeps_identity() {
        let mut reg = ChartRegistry::new();
        reg.ensure("timeline", ChartKind::Line, timeline_data(&stats()), serde_json::json!({}));
        let id = reg.get("timeline").unwrap().id;

        let mut later = stats();
        later.timeline.insert("10:02".to_string(), 9);
        reg.update("timeline", timeline_data(&later)).unwrap();

        let handle = reg.get("timeline").unwrap();
        assert_eq!(handle.id, id);
        assert_eq!(handle.redraws, 1);
        assert_eq!(handle.data.labels.last().map(|s| s.as_str()), Some("10:02"));
    }

    #[test]
    fn update_before_ensure_is_an_error() {
        let mut reg = ChartRegistry::new();
        assert!(reg.update("mitre", ChartData::default()).is_err());
    }

    #[test]
    fn severity_doughnut_carries_the_palette() {
        let data = severity_data(&stats());
        assert_eq!(data.labels, ["HIGH", "MEDIUM", "LOW"]);
        assert_eq!(data.datasets[0].data, [2.0, 3.0, 1.0]);
        assert_eq!(data.datasets[0].background.len(), 4);
    }

    #[test]
    fn timeline_keeps_bucket_order() {
        let data = timeline_data(&stats());
        assert_eq!(data.labels, ["10:00", "10:01"]);
        assert_eq!(data.datasets[0].border.as_deref(), Some(ACCENT));
    }
}
