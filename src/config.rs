use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;
use tokio::fs;

use crate::color::{ColorScale, ScoreBands};

const CONFIG_PATH: &str = "Config.toml";

pub async fn load_config() -> anyhow::Result<Config> {
    let contents = fs::read_to_string(CONFIG_PATH).await?;
    let config = toml::from_str(&contents)?;
    Ok(config)
}

#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
}

/// Cadence of one polling view. Fixed delay, no backoff, no jitter.
#[serde_as]
#[derive(Clone, Deserialize)]
pub struct ViewConfig {
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub interval: Duration,
}

fn ms(millis: u64) -> ViewConfig {
    ViewConfig {
        interval: Duration::from_millis(millis),
    }
}

fn default_feed() -> ViewConfig {
    ms(2500)
}

fn default_charts() -> ViewConfig {
    ms(3500)
}

fn default_heatmap() -> ViewConfig {
    ms(4000)
}

#[derive(Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default = "default_feed")]
    pub feed: ViewConfig,
    #[serde(default = "default_charts")]
    pub charts: ViewConfig,
    #[serde(default = "default_heatmap")]
    pub heatmap: ViewConfig,
    #[serde(default)]
    pub colors: ColorScale,
    #[serde(default)]
    pub scores: ScoreBands,
}
