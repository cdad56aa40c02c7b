use async_trait::async_trait;
use serde_json::json;

use crate::charts::{mini_timeline_data, mitre_data, severity_data, timeline_data, ChartKind};
use crate::fetch::Fetch;
use crate::heatmap::{aggregate, FilterState, HeatmapSource, HeatmapStyle};
use crate::models::{FullMatrix, HeatmapSnapshot, LiveResponse, StatsSnapshot};
use crate::poll::{ReconciliationState, View};
use crate::render::{self, AlertFeedRenderer, Notifier, Surface};

/// Alert feed page: incremental live polling with novelty detection.
pub struct FeedView {
    renderer: AlertFeedRenderer,
    notifier: Box<dyn Notifier>,
}

impl FeedView {
    pub fn new(renderer: AlertFeedRenderer, notifier: Box<dyn Notifier>) -> FeedView {
        FeedView { renderer, notifier }
    }
}

#[async_trait]
impl View for FeedView {
    type Snapshot = LiveResponse;

    async fn fetch(&self, fetch: &dyn Fetch, cursor: &str) -> anyhow::Result<LiveResponse> {
        fetch.live(cursor).await
    }

    fn render(&mut self, live: LiveResponse, state: &mut ReconciliationState) -> anyhow::Result<()> {
        let Some(last) = live.alerts.last() else {
            // empty batch: previous rows stay on screen, cursor untouched
            return Ok(());
        };

        let newest = last.timestamp.clone();
        let is_new = !newest.is_empty() && newest != state.last_seen;

        self.renderer.render(&live.alerts, is_new);

        if is_new {
            self.notifier
                .toast(&format!("New alert: {} ({})", last.kind, last.severity));
            state.last_seen = newest;
        }
        Ok(())
    }
}

/// Stats page: severity doughnut, timeline line and MITRE bar, created once
/// and updated in place every tick.
pub struct ChartsView;

impl ChartsView {
    fn ensure_all(stats: &StatsSnapshot, state: &mut ReconciliationState) {
        state.charts.ensure(
            "severity",
            ChartKind::Doughnut,
            severity_data(stats),
            json!({
                "responsive": true,
                "animation": { "animateScale": true },
                "plugins": { "legend": { "position": "bottom" } }
            }),
        );
        state.charts.ensure(
            "timeline",
            ChartKind::Line,
            timeline_data(stats),
            json!({ "responsive": true, "animation": { "duration": 1400 } }),
        );
        state.charts.ensure(
            "mitre",
            ChartKind::Bar,
            mitre_data(stats),
            json!({ "indexAxis": "y", "responsive": true, "animation": { "delay": 250 } }),
        );
    }
}

#[async_trait]
impl View for ChartsView {
    type Snapshot = LiveResponse;

    async fn fetch(&self, fetch: &dyn Fetch, cursor: &str) -> anyhow::Result<LiveResponse> {
        fetch.live(cursor).await
    }

    fn render(&mut self, live: LiveResponse, state: &mut ReconciliationState) -> anyhow::Result<()> {
        let stats = live.stats.unwrap_or_default();

        Self::ensure_all(&stats, state);
        state.charts.update("severity", severity_data(&stats))?;
        state.charts.update("timeline", timeline_data(&stats))?;
        state.charts.update("mitre", mitre_data(&stats))?;

        // keep the incremental cursor moving even though this view never toasts
        if let Some(last) = live.alerts.last() {
            if !last.timestamp.is_empty() {
                state.last_seen = last.timestamp.clone();
            }
        }
        Ok(())
    }
}

/// Index page KPI strip: total alerts, HIGH count, top technique, plus a
/// mini timeline sparkline.
pub struct KpiView {
    pub total: Option<Box<dyn Surface>>,
    pub high: Option<Box<dyn Surface>>,
    pub top_technique: Option<Box<dyn Surface>>,
}

impl KpiView {
    fn set(target: &mut Option<Box<dyn Surface>>, text: &str) {
        if let Some(target) = target.as_mut() {
            target.replace(text);
        }
    }
}

#[async_trait]
impl View for KpiView {
    type Snapshot = StatsSnapshot;

    async fn fetch(&self, fetch: &dyn Fetch, _cursor: &str) -> anyhow::Result<StatsSnapshot> {
        fetch.stats().await
    }

    fn render(&mut self, stats: StatsSnapshot, state: &mut ReconciliationState) -> anyhow::Result<()> {
        let high = stats.severity.get("HIGH").copied().unwrap_or(0);
        let top = stats
            .mitre_top
            .keys()
            .next()
            .map(|k| k.as_str())
            .unwrap_or("—");

        Self::set(&mut self.total, &stats.total.to_string());
        Self::set(&mut self.high, &high.to_string());
        Self::set(&mut self.top_technique, top);

        state.charts.ensure(
            "mini_timeline",
            ChartKind::Line,
            mini_timeline_data(&stats),
            json!({ "responsive": true, "animation": { "duration": 1200 } }),
        );
        state.charts.update("mini_timeline", mini_timeline_data(&stats))?;
        Ok(())
    }
}

/// Dense heatmap page: the matrix comes pre-aggregated, rendering is a
/// straight pass-through with the empty-axis guard.
pub struct HeatmapView {
    pub target: Option<Box<dyn Surface>>,
    pub style: HeatmapStyle,
}

#[async_trait]
impl View for HeatmapView {
    type Snapshot = HeatmapSnapshot;

    async fn fetch(&self, fetch: &dyn Fetch, _cursor: &str) -> anyhow::Result<HeatmapSnapshot> {
        fetch.heatmap().await
    }

    fn render(&mut self, snapshot: HeatmapSnapshot, _state: &mut ReconciliationState) -> anyhow::Result<()> {
        if let Some(target) = self.target.as_mut() {
            let grid = aggregate(
                HeatmapSource::Dense(&snapshot),
                &self.style,
                &FilterState::default(),
            );
            target.replace(&render::heatmap_markup(&grid));
        }
        Ok(())
    }
}

/// Drill-down heatmap page. Loaded once rather than polled; filter changes
/// re-render synchronously from the retained matrix, and clicking a cell
/// fills the detail panel.
pub struct SparseHeatmapView {
    target: Option<Box<dyn Surface>>,
    panel: Option<Box<dyn Surface>>,
    style: HeatmapStyle,
    data: FullMatrix,
    filter: FilterState,
}

impl SparseHeatmapView {
    pub fn new(
        target: Option<Box<dyn Surface>>,
        panel: Option<Box<dyn Surface>>,
        style: HeatmapStyle,
    ) -> SparseHeatmapView {
        SparseHeatmapView {
            target,
            panel,
            style,
            data: FullMatrix::default(),
            filter: FilterState::default(),
        }
    }

    pub async fn load(&mut self, fetch: &dyn Fetch) -> anyhow::Result<()> {
        self.data = fetch.full_matrix().await?;
        self.render();
        Ok(())
    }

    pub fn render(&mut self) {
        if let Some(target) = self.target.as_mut() {
            let grid = aggregate(HeatmapSource::Sparse(&self.data), &self.style, &self.filter);
            target.replace(&render::heatmap_markup(&grid));
        }
    }

    pub fn set_search(&mut self, term: &str) {
        self.filter.search_term = term.trim().to_string();
        self.render();
    }

    pub fn set_severity(&mut self, tier: &str) {
        self.filter.severity_filter = tier.to_string();
        self.render();
    }

    /// Replace the detail panel with the named technique's alerts and show
    /// it. Unknown ids are ignored.
    pub fn drill_down(&mut self, technique_id: &str) {
        let Some(panel) = self.panel.as_mut() else {
            return;
        };
        let cell = self
            .data
            .values()
            .find_map(|techniques| techniques.get(technique_id));
        if let Some(cell) = cell {
            render::drill_down(technique_id, &cell.alerts, panel.as_mut());
        }
    }
}
