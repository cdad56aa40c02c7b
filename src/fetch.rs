use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::models::{FullMatrix, HeatmapSnapshot, LiveResponse, StatsSnapshot};

/// One snapshot source per backend endpoint. Implemented over HTTP in
/// production and scripted in loop tests; callers treat any failure as one
/// opaque fetch error and decide retry policy themselves.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// `GET /api/live?since=<cursor>`; the cursor is omitted when empty.
    async fn live(&self, since: &str) -> anyhow::Result<LiveResponse>;
    /// `GET /api/stats`
    async fn stats(&self) -> anyhow::Result<StatsSnapshot>;
    /// `GET /api/mitre/heatmap` (dense form)
    async fn heatmap(&self) -> anyhow::Result<HeatmapSnapshot>;
    /// `GET /api/mitre/full` (sparse per-technique detail)
    async fn full_matrix(&self) -> anyhow::Result<FullMatrix>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> HttpFetcher {
        HttpFetcher {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, cursor: Option<&str>) -> anyhow::Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.get(&url);
        if let Some(since) = cursor {
            // reqwest percent-encodes the value, so raw ISO timestamps are safe
            req = req.query(&[("since", since)]);
        }
        let body = req
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?
            .json()
            .await
            .with_context(|| format!("decoding {url}"))?;
        Ok(body)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn live(&self, since: &str) -> anyhow::Result<LiveResponse> {
        let cursor = if since.is_empty() { None } else { Some(since) };
        self.get("/api/live", cursor).await
    }

    async fn stats(&self) -> anyhow::Result<StatsSnapshot> {
        self.get("/api/stats", None).await
    }

    async fn heatmap(&self) -> anyhow::Result<HeatmapSnapshot> {
        self.get("/api/mitre/heatmap", None).await
    }

    async fn full_matrix(&self) -> anyhow::Result<FullMatrix> {
        self.get("/api/mitre/full", None).await
    }
}
