use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, MissedTickBehavior};

use crate::charts::ChartRegistry;
use crate::fetch::Fetch;

/// Per-loop reconciliation state: the last-seen alert timestamp (the cursor,
/// empty = beginning) and the chart-instance registry. Owned by exactly one
/// loop and mutated only in its render step, so no locking is needed; a port
/// to parallel workers would have to add synchronization around both.
pub struct ReconciliationState {
    pub last_seen: String,
    pub charts: ChartRegistry,
}

impl ReconciliationState {
    pub fn new() -> ReconciliationState {
        ReconciliationState {
            last_seen: String::new(),
            charts: ChartRegistry::new(),
        }
    }
}

impl Default for ReconciliationState {
    fn default() -> ReconciliationState {
        ReconciliationState::new()
    }
}

/// Where a loop is inside its cycle. There is no terminal phase; loops run
/// until the process shuts down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Rendering,
    Scheduled,
}

/// One dashboard view: how to fetch its snapshot and how to turn the
/// snapshot into rendered output and state updates. The fetch completes
/// fully before render runs; the cursor update happens inside render, after
/// everything for the cycle has been drawn.
#[async_trait]
pub trait View: Send {
    type Snapshot: Send;

    async fn fetch(&self, fetch: &dyn Fetch, cursor: &str) -> anyhow::Result<Self::Snapshot>;

    fn render(&mut self, snapshot: Self::Snapshot, state: &mut ReconciliationState) -> anyhow::Result<()>;
}

/// Fixed-delay polling orchestrator: fetch → render → schedule, forever.
/// A failed cycle leaves the cursor and the previous render untouched and
/// retries unconditionally on the next tick; no backoff, no retry cap.
pub struct PollingLoop<V: View> {
    name: &'static str,
    view: V,
    fetch: Arc<dyn Fetch>,
    interval: Duration,
    pub state: ReconciliationState,
    phase: Phase,
}

impl<V: View> PollingLoop<V> {
    pub fn new(name: &'static str, view: V, fetch: Arc<dyn Fetch>, interval: Duration) -> PollingLoop<V> {
        PollingLoop {
            name,
            view,
            fetch,
            interval,
            state: ReconciliationState::new(),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> &str {
        &self.state.last_seen
    }

    /// One poll cycle. Failures never escape: they are logged and the loop
    /// moves straight to Scheduled with nothing mutated.
    pub async fn cycle(&mut self) {
        self.phase = Phase::Fetching;
        let snapshot = match self.view.fetch(self.fetch.as_ref(), &self.state.last_seen).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(target: "alertdash::poll", view = self.name, error = %err, "fetch failed, retrying next tick");
                self.phase = Phase::Scheduled;
                return;
            }
        };

        self.phase = Phase::Rendering;
        if let Err(err) = self.view.render(snapshot, &mut self.state) {
            tracing::warn!(target: "alertdash::poll", view = self.name, error = %err, "render failed, previous output kept");
        }
        self.phase = Phase::Scheduled;
    }

    /// Runs for the lifetime of the process; the caller bounds it with a
    /// shutdown select.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.phase = Phase::Idle;
            self.cycle().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::ScriptedFetch;
    use crate::models::{Alert, LiveResponse};
    use crate::render::testing::{SharedNotifier, SharedSurface};
    use crate::render::AlertFeedRenderer;
    use crate::views::FeedView;

    fn alert(ts: &str, kind: &str, severity: &str) -> Alert {
        Alert {
            timestamp: ts.to_string(),
            kind: kind.to_string(),
            severity: severity.to_string(),
            ..Alert::default()
        }
    }

    fn feed_loop(
        fetch: Arc<ScriptedFetch>,
    ) -> (PollingLoop<FeedView>, SharedSurface, SharedNotifier) {
        let surface = SharedSurface::new();
        let notifier = SharedNotifier::new();
        let view = FeedView::new(
            AlertFeedRenderer {
                target: Some(Box::new(surface.clone())),
            },
            Box::new(notifier.clone()),
        );
        let looped = PollingLoop::new("feed", view, fetch, Duration::from_millis(2500));
        (looped, surface, notifier)
    }

    #[tokio::test]
    async fn novelty_end_to_end() {
        let fetch = Arc::new(ScriptedFetch::default());
        let batch = LiveResponse {
            alerts: vec![alert("2024-01-01T00:00:00", "PortScan", "HIGH")],
            stats: None,
        };
        fetch.push_live(batch.clone());
        fetch.push_live(batch);

        let (mut looped, surface, notifier) = feed_loop(fetch.clone());

        // first poll: novelty, one row, one toast, cursor advanced
        looped.cycle().await;
        assert_eq!(looped.cursor(), "2024-01-01T00:00:00");
        assert_eq!(looped.phase(), Phase::Scheduled);
        assert_eq!(notifier.toasts(), ["New alert: PortScan (HIGH)"]);
        let frame = surface.last().unwrap();
        assert_eq!(frame.matches("<tr").count(), 1);
        assert!(frame.contains("flash-new"));

        // second poll returns the same alert: no novelty, identical row, no toast
        looped.cycle().await;
        assert_eq!(looped.cursor(), "2024-01-01T00:00:00");
        assert_eq!(notifier.toasts().len(), 1);
        let frame = surface.last().unwrap();
        assert!(frame.contains("PortScan"));
        assert!(!frame.contains("flash-new"));

        // the second request carried the advanced cursor
        assert_eq!(fetch.live_cursors(), ["", "2024-01-01T00:00:00"]);
    }

    #[tokio::test]
    async fn empty_batch_leaves_cursor_and_render_untouched() {
        let fetch = Arc::new(ScriptedFetch::default());
        fetch.push_live(LiveResponse {
            alerts: vec![alert("2024-01-01T00:00:05", "PortScan", "LOW")],
            stats: None,
        });
        fetch.push_live(LiveResponse::default());

        let (mut looped, surface, notifier) = feed_loop(fetch);
        looped.cycle().await;
        assert_eq!(surface.frame_count(), 1);

        looped.cycle().await;
        assert_eq!(looped.cursor(), "2024-01-01T00:00:05");
        assert_eq!(surface.frame_count(), 1);
        assert_eq!(notifier.toasts().len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_swallowed_and_mutates_nothing() {
        let fetch = Arc::new(ScriptedFetch::default());
        fetch.push_live(LiveResponse {
            alerts: vec![alert("2024-01-01T00:00:05", "PortScan", "LOW")],
            stats: None,
        });
        fetch.push_live_failure();
        fetch.push_live(LiveResponse {
            alerts: vec![alert("2024-01-01T00:00:07", "BruteForce", "HIGH")],
            stats: None,
        });

        let (mut looped, surface, _notifier) = feed_loop(fetch);
        looped.cycle().await;
        let cursor_before = looped.cursor().to_string();
        let frames_before = surface.frame_count();

        looped.cycle().await;
        assert_eq!(looped.cursor(), cursor_before);
        assert_eq!(surface.frame_count(), frames_before);
        assert_eq!(looped.phase(), Phase::Scheduled);

        // next tick retries unconditionally and picks up the new batch
        looped.cycle().await;
        assert_eq!(looped.cursor(), "2024-01-01T00:00:07");
    }

    #[tokio::test]
    async fn missing_render_target_is_a_silent_noop() {
        let fetch = Arc::new(ScriptedFetch::default());
        fetch.push_live(LiveResponse {
            alerts: vec![alert("2024-01-01T00:00:05", "PortScan", "LOW")],
            stats: None,
        });

        let notifier = SharedNotifier::new();
        let view = FeedView::new(
            AlertFeedRenderer { target: None },
            Box::new(notifier.clone()),
        );
        let mut looped = PollingLoop::new("feed", view, fetch, Duration::from_millis(2500));
        looped.cycle().await;

        // reconciliation still happens; only drawing was skipped
        assert_eq!(looped.cursor(), "2024-01-01T00:00:05");
        assert_eq!(notifier.toasts().len(), 1);
    }
}
