use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// MITRE ATT&CK tag attached to an alert by the backend enrichment step.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MitreTag {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub tactic: String,
    #[serde(default)]
    pub technique: String,
}

/// One alert as delivered by `/api/live`. Immutable once received; snapshots
/// deliver alerts in non-decreasing timestamp order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub src_ip: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub mitre: Option<MitreTag>,
}

/// Aggregate counters regenerated wholesale on every poll. `timeline` and
/// `mitre_top` keep the backend's key order, which is meaningful (sorted
/// buckets, most-common-first techniques).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub severity: IndexMap<String, u64>,
    #[serde(default)]
    pub timeline: IndexMap<String, u64>,
    #[serde(default)]
    pub mitre_top: IndexMap<String, u64>,
}

/// Dense, server-aggregated tactic×technique matrix.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HeatmapSnapshot {
    #[serde(default)]
    pub tactics: Vec<String>,
    #[serde(default)]
    pub techniques: Vec<String>,
    #[serde(default)]
    pub matrix: Vec<Vec<u64>>,
    #[serde(default)]
    pub max: u64,
}

impl HeatmapSnapshot {
    /// Missing or ragged rows read as zero rather than failing the cycle.
    pub fn value_at(&self, row: usize, col: usize) -> u64 {
        self.matrix
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(0)
    }

    /// The advertised `max`, recomputed from the matrix when the backend
    /// omitted it.
    pub fn max_value(&self) -> u64 {
        if self.max > 0 {
            return self.max;
        }
        self.matrix
            .iter()
            .flat_map(|r| r.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

/// Per-technique detail cell of the sparse `/api/mitre/full` form.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TechniqueCell {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub severity: IndexMap<String, u64>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

/// Sparse detail form: tactic → technique id → cell.
pub type FullMatrix = IndexMap<String, IndexMap<String, TechniqueCell>>;

/// Body of `/api/live`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LiveResponse {
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub stats: Option<StatsSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_tolerates_partial_payload() {
        let a: Alert = serde_json::from_str(r#"{"type":"PORT_SCAN"}"#).unwrap();
        assert_eq!(a.kind, "PORT_SCAN");
        assert_eq!(a.timestamp, "");
        assert!(a.mitre.is_none());
        assert!(a.src_ip.is_none());
    }

    #[test]
    fn stats_preserve_key_order() {
        let s: StatsSnapshot = serde_json::from_str(
            r#"{"total":3,"timeline":{"10:01":1,"10:00":2},"mitre_top":{"T1110":2,"T1548":1}}"#,
        )
        .unwrap();
        let buckets: Vec<_> = s.timeline.keys().collect();
        assert_eq!(buckets, ["10:01", "10:00"]);
        assert_eq!(s.mitre_top.keys().next().map(|k| k.as_str()), Some("T1110"));
    }

    #[test]
    fn heatmap_reads_missing_entries_as_zero() {
        let hm = HeatmapSnapshot {
            tactics: vec!["Discovery".into(), "Execution".into()],
            techniques: vec!["T1046".into(), "T1059".into()],
            matrix: vec![vec![4]],
            max: 0,
        };
        assert_eq!(hm.value_at(0, 0), 4);
        assert_eq!(hm.value_at(0, 1), 0);
        assert_eq!(hm.value_at(1, 0), 0);
        assert_eq!(hm.max_value(), 4);
    }
}
