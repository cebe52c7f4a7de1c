use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{FeedSource, RawFeeds};

pub const DEFAULT_PBP_URL: &str = "https://statsapi.web.nhl.com/api/v1";
pub const DEFAULT_SHIFT_URL: &str = "http://www.nhl.com/stats/rest";

/// The league's public play-by-play and shift chart endpoints.
pub struct NhlApi {
    http: Client,
    pbp_url: String,
    shift_url: String,
}

impl NhlApi {
    pub fn new(pbp_url: &str, shift_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(NhlApi {
            http,
            pbp_url: pbp_url.trim_end_matches('/').to_string(),
            shift_url: shift_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn pbp_endpoint(&self, game_id: u64) -> String {
        format!("{}/game/{}/feed/live", self.pbp_url, game_id)
    }

    pub fn shift_endpoint(&self, game_id: u64) -> String {
        format!("{}/shiftcharts?cayenneExp=gameId={}", self.shift_url, game_id)
    }

    async fn get(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;
        if !resp.status().is_success() {
            anyhow::bail!("Unexpected status {} from {}", resp.status(), url);
        }
        resp.text()
            .await
            .with_context(|| format!("Failed to read body from {}", url))
    }
}

#[derive(Deserialize)]
struct ShiftCount {
    data: Vec<serde::de::IgnoredAny>,
}

/// Games the league never charted return an empty shift list; they cannot be
/// processed.
fn ensure_shifts(game_id: u64, body: &str) -> Result<()> {
    let shifts: ShiftCount = serde_json::from_str(body)
        .with_context(|| format!("[{}] Failed to parse shift chart", game_id))?;
    if shifts.data.is_empty() {
        anyhow::bail!("[{}] Shift data is empty", game_id);
    }
    Ok(())
}

#[async_trait]
impl FeedSource for NhlApi {
    fn name(&self) -> &str {
        "nhl-api"
    }

    async fn fetch(&self, game_id: u64) -> Result<RawFeeds> {
        let pbp = self.get(&self.pbp_endpoint(game_id)).await?;
        let shifts = self.get(&self.shift_endpoint(game_id)).await?;
        ensure_shifts(game_id, &shifts)?;
        Ok(RawFeeds { pbp, shifts })
    }
}
