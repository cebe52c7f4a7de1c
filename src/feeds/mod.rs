pub mod archive;
pub mod nhl_api;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::ValueEnum;
use tracing::{debug, info, warn};

pub use archive::Archive;
pub use nhl_api::NhlApi;

/// The first season whose games have both documents populated.
pub const FIRST_SEASON: u16 = 2010;
pub const LAST_SEASON: u16 = 2020;

/// The two unparsed documents describing one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFeeds {
    pub pbp: String,
    pub shifts: String,
}

/// Anything that can produce a game's raw documents.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, game_id: u64) -> Result<RawFeeds>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// How the raw-data archive takes part in a scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArchiveMode {
    /// Always download; never touch the archive.
    Off,
    /// Read archived documents, downloading and saving any that are missing.
    Local,
    /// Download and save every game to the archive.
    Save,
}

/// Downloads from `remote`, reading from and writing to `archive` according
/// to `mode`.
pub struct ArchivingSource<S> {
    remote: S,
    archive: Archive,
    mode: ArchiveMode,
}

impl<S: FeedSource> ArchivingSource<S> {
    pub fn new(remote: S, archive: Archive, mode: ArchiveMode) -> Self {
        ArchivingSource {
            remote,
            archive,
            mode,
        }
    }
}

#[async_trait]
impl<S: FeedSource> FeedSource for ArchivingSource<S> {
    fn name(&self) -> &str {
        self.remote.name()
    }

    async fn fetch(&self, game_id: u64) -> Result<RawFeeds> {
        let save = match self.mode {
            ArchiveMode::Off => false,
            ArchiveMode::Save => true,
            ArchiveMode::Local => {
                if self.archive.contains(game_id).await {
                    debug!("[{}] Using archived documents", game_id);
                    return self.archive.fetch(game_id).await;
                }
                info!("[{}] Not archived, downloading", game_id);
                true
            }
        };

        let feeds = self.remote.fetch(game_id).await?;
        if save {
            // A failed save must not lose a good download.
            if let Err(e) = self.archive.save(game_id, &feeds).await {
                warn!("[{}] Failed to archive documents: {:#}", game_id, e);
            }
        }
        Ok(feeds)
    }
}

/// Parse "20001" or "20001-20010" into an inclusive game number range.
pub fn parse_game_range(s: &str) -> Result<(u32, u32)> {
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() > 2 {
        anyhow::bail!("Invalid game range '{}': too many game numbers", s);
    }
    let numbers = parts
        .iter()
        .map(|p| {
            p.trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid game number '{}'", p))
        })
        .collect::<Result<Vec<u32>>>()?;
    let first = numbers[0];
    let last = numbers.get(1).copied().unwrap_or(first);
    Ok((first, last))
}

/// Full game ids for `season` and the inclusive range of game numbers.
///
/// Game numbers are the last five digits of a game id: a two-digit game type
/// (02 regular season, 03 playoffs) then a three-digit game number.
pub fn game_ids(season: u16, first: u32, last: u32) -> Result<Vec<u64>> {
    if !(FIRST_SEASON..=LAST_SEASON).contains(&season) {
        anyhow::bail!(
            "Invalid season {}: must be between {} and {}",
            season,
            FIRST_SEASON,
            LAST_SEASON
        );
    }
    for n in [first, last] {
        if n <= 20000 || n >= 40000 {
            anyhow::bail!("Invalid game number {}: must be between 20001 and 39999", n);
        }
    }
    if first > last {
        anyhow::bail!("Invalid game range {}-{}: first exceeds last", first, last);
    }
    Ok((first..=last)
        .map(|n| u64::from(season) * 1_000_000 + u64::from(n))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_game_range() {
        assert_eq!(parse_game_range("20001").unwrap(), (20001, 20001));
        assert_eq!(parse_game_range("20001-20010").unwrap(), (20001, 20010));
        assert!(parse_game_range("20001-20002-20003").is_err());
        assert!(parse_game_range("abc").is_err());
    }

    #[test]
    fn test_game_ids() {
        assert_eq!(game_ids(2016, 20001, 20003).unwrap(), vec![2016020001, 2016020002, 2016020003]);
        assert_eq!(game_ids(2014, 30231, 30231).unwrap(), vec![2014030231]);
        assert!(game_ids(2009, 20001, 20001).is_err());
        assert!(game_ids(2021, 20001, 20001).is_err());
        assert!(game_ids(2016, 20000, 20001).is_err());
        assert!(game_ids(2016, 20001, 40000).is_err());
        assert!(game_ids(2016, 20010, 20001).is_err());
    }

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch(&self, game_id: u64) -> Result<RawFeeds> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawFeeds {
                pbp: format!("{{\"gamePk\":{}}}", game_id),
                shifts: "{\"data\":[]}".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_local_mode_downloads_once() {
        let dir = std::env::temp_dir().join(format!("rink-timeline-archive-{}", std::process::id()));
        let source = ArchivingSource::new(
            CountingSource {
                calls: AtomicUsize::new(0),
            },
            Archive::new(&dir),
            ArchiveMode::Local,
        );

        let first = source.fetch(2016020001).await.unwrap();
        let second = source.fetch(2016020001).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(source.remote.calls.load(Ordering::SeqCst), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
