mod charts;
mod color;
mod config;
mod fetch;
mod heatmap;
mod models;
mod poll;
mod render;
mod severity;
mod views;

#[cfg(not(unix))]
use std::future;
use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::config::load_config;
use crate::fetch::{Fetch, HttpFetcher};
use crate::heatmap::HeatmapStyle;
use crate::poll::PollingLoop;
use crate::render::{AlertFeedRenderer, LogNotifier, LogSurface};
use crate::views::{ChartsView, FeedView, HeatmapView, KpiView, SparseHeatmapView};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config().await?;
    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(config.api.base_url.clone()));
    tracing::info!("polling {}", config.api.base_url);

    let style = HeatmapStyle {
        scale: config.colors,
        bands: config.scores,
    };

    // the drill-down matrix is loaded once, not polled
    let mut sparse = SparseHeatmapView::new(
        Some(Box::new(LogSurface { target: "heatmap-detail" })),
        Some(Box::new(LogSurface { target: "drilldown" })),
        style,
    );
    if let Err(err) = sparse.load(fetcher.as_ref()).await {
        tracing::warn!(error = %err, "initial full-matrix load failed");
    }

    let feed = PollingLoop::new(
        "feed",
        FeedView::new(
            AlertFeedRenderer {
                target: Some(Box::new(LogSurface { target: "alerts-table" })),
            },
            Box::new(LogNotifier),
        ),
        fetcher.clone(),
        config.feed.interval,
    );

    let stats_charts = PollingLoop::new("charts", ChartsView, fetcher.clone(), config.charts.interval);

    let kpi = PollingLoop::new(
        "kpi",
        KpiView {
            total: Some(Box::new(LogSurface { target: "kpi-total" })),
            high: Some(Box::new(LogSurface { target: "kpi-high" })),
            top_technique: Some(Box::new(LogSurface { target: "kpi-top-mitre" })),
        },
        fetcher.clone(),
        config.charts.interval,
    );

    let heatmap = PollingLoop::new(
        "heatmap",
        HeatmapView {
            target: Some(Box::new(LogSurface { target: "heatmap" })),
            style,
        },
        fetcher.clone(),
        config.heatmap.interval,
    );

    tokio::select! {
        t = feed.run() => t?,
        t = stats_charts.run() => t?,
        t = kpi.run() => t?,
        t = heatmap.run() => t?,
        _ = shutdown_signal() => {},
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
