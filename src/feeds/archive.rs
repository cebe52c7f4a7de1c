use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{FeedSource, RawFeeds};

/// Raw documents saved on disk as `{gid}-pbp.json` and `{gid}-shifts.json`.
#[derive(Debug, Clone)]
pub struct Archive {
    dir: PathBuf,
}

impl Archive {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Archive {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn pbp_path(&self, game_id: u64) -> PathBuf {
        self.dir.join(format!("{}-pbp.json", game_id))
    }

    pub fn shifts_path(&self, game_id: u64) -> PathBuf {
        self.dir.join(format!("{}-shifts.json", game_id))
    }

    /// Whether both documents of a game are archived.
    pub async fn contains(&self, game_id: u64) -> bool {
        let exists = |p: PathBuf| async move { tokio::fs::try_exists(p).await.unwrap_or(false) };
        exists(self.pbp_path(game_id)).await && exists(self.shifts_path(game_id)).await
    }

    pub async fn save(&self, game_id: u64, feeds: &RawFeeds) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create archive directory {}", self.dir.display()))?;
        for (path, body) in [
            (self.pbp_path(game_id), &feeds.pbp),
            (self.shifts_path(game_id), &feeds.shifts),
        ] {
            tokio::fs::write(&path, body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!("[{}] Saved {}", game_id, path.display());
        }
        Ok(())
    }
}

#[async_trait]
impl FeedSource for Archive {
    fn name(&self) -> &str {
        "archive"
    }

    async fn fetch(&self, game_id: u64) -> Result<RawFeeds> {
        let read = |path: PathBuf| async move {
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))
        };
        Ok(RawFeeds {
            pbp: read(self.pbp_path(game_id)).await?,
            shifts: read(self.shifts_path(game_id)).await?,
        })
    }
}
