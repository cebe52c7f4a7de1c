use anyhow::{Context, Result};
use clap::Parser;
use futures_util::{stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod config;
mod db;
mod engine;
mod feeds;
mod overrides;

use config::{Command, Config, ScrapeArgs, SkatersArgs};
use db::models::SkaterQuery;
use db::Database;
use engine::situation::{ScoreSit, StrengthSit};
use engine::{transform, Transform};
use feeds::{game_ids, parse_game_range, Archive, ArchivingSource, FeedSource, NhlApi, RawFeeds};
use overrides::FeedOverrides;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;

    let overrides = Arc::new(FeedOverrides::load(&config.overrides)?);
    info!(
        "Loaded overrides for {} game(s) from {}",
        overrides.games.len(),
        config.overrides.display()
    );

    match &config.command {
        Command::CreateTables => {
            let db = Database::open(&config.database_path)?;
            db.create_tables()?;
            info!("Tables ready in {}", config.database_path);
        }
        Command::Scrape(args) => {
            let db = Database::open(&config.database_path)?;
            db.create_tables()?;
            scrape(&db, overrides, args).await?;
        }
        Command::Transform { pbp, shifts } => {
            let pbp = tokio::fs::read_to_string(pbp)
                .await
                .with_context(|| format!("Failed to read {}", pbp.display()))?;
            let shifts = tokio::fs::read_to_string(shifts)
                .await
                .with_context(|| format!("Failed to read {}", shifts.display()))?;
            match transform(&pbp, &shifts, &overrides)? {
                Transform::Rows(rows) => println!("{}", serde_json::to_string_pretty(&rows)?),
                Transform::Skipped(reason) => warn!("Game skipped: {}", reason),
            }
        }
        Command::Skaters(args) => {
            let db = Database::open(&config.database_path)?;
            let skaters = db.skaters(&skater_query(args))?;
            info!("{} skater(s) matched", skaters.len());
            println!("{}", serde_json::to_string_pretty(&skaters)?);
        }
    }

    Ok(())
}

fn skater_query(args: &SkatersArgs) -> SkaterQuery {
    SkaterQuery {
        start: args.start,
        end: args.end,
        // labels were checked by Config::validate
        strength_sits: args
            .strength_sits
            .iter()
            .filter_map(|s| StrengthSit::from_str_label(s))
            .collect(),
        score_sits: args
            .score_sits
            .iter()
            .map(|&s| ScoreSit::from_diff(i32::from(s)))
            .collect(),
        playoffs: args.playoffs,
    }
}

async fn scrape(db: &Database, overrides: Arc<FeedOverrides>, args: &ScrapeArgs) -> Result<()> {
    let (first, last) = parse_game_range(&args.games)?;
    let ids = game_ids(args.season, first, last)?;

    let api = NhlApi::new(
        &args.pbp_url,
        &args.shift_url,
        Duration::from_secs(args.timeout_secs),
    )?;
    let source = ArchivingSource::new(api, Archive::new(&args.archive_dir), args.archive);
    info!(
        "Scraping {} game(s) of season {} from {} (archive: {:?})",
        ids.len(),
        args.season,
        source.name(),
        args.archive
    );

    let source = &source;
    let mut downloads = stream::iter(ids)
        .map(|game_id| async move { (game_id, source.fetch(game_id).await) })
        .buffer_unordered(args.concurrency);

    let (mut stored, mut skipped, mut failed) = (0u32, 0u32, 0u32);
    while let Some((game_id, fetched)) = downloads.next().await {
        let outcome = match fetched {
            Ok(feeds) => process_game(db, overrides.clone(), game_id, feeds).await,
            Err(e) => {
                error!("[{}] Download failed: {:#}", game_id, e);
                Outcome::Failed
            }
        };
        match outcome {
            Outcome::Stored => stored += 1,
            Outcome::Skipped => skipped += 1,
            Outcome::Failed => failed += 1,
        }
    }

    info!(
        "Scrape finished: {} stored, {} skipped, {} failed",
        stored, skipped, failed
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Stored,
    Skipped,
    Failed,
}

/// Run `f` on a blocking worker. A panic is logged against the game and
/// yields `None`.
async fn blocking<T, F>(game_id: u64, what: &str, f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => Some(value),
        Err(e) => {
            error!("[{}] {} task failed: {}", game_id, what, e);
            None
        }
    }
}

/// Transform one downloaded game and store its rows.
async fn process_game(
    db: &Database,
    overrides: Arc<FeedOverrides>,
    game_id: u64,
    feeds: RawFeeds,
) -> Outcome {
    let transformed = blocking(game_id, "Transform", move || {
        transform(&feeds.pbp, &feeds.shifts, &overrides)
    })
    .await;
    let rows = match transformed {
        Some(Ok(Transform::Rows(rows))) => rows,
        Some(Ok(Transform::Skipped(reason))) => {
            warn!("[{}] Skipped: {}", game_id, reason);
            return Outcome::Skipped;
        }
        Some(Err(e)) => {
            error!("[{}] Transform failed: {}", game_id, e);
            return Outcome::Failed;
        }
        None => return Outcome::Failed,
    };

    let events = rows.game_events.len();
    let db = db.clone();
    match blocking(game_id, "Store", move || db.replace_game(&rows)).await {
        Some(Ok(())) => {
            info!("[{}] Stored {} event(s)", game_id, events);
            Outcome::Stored
        }
        Some(Err(e)) => {
            error!("[{}] Failed to store game: {:#}", game_id, e);
            Outcome::Failed
        }
        None => Outcome::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::GameDoc;

    fn feeds(doc: &GameDoc) -> RawFeeds {
        RawFeeds {
            pbp: doc.pbp_json(),
            shifts: doc.shifts_json(),
        }
    }

    #[tokio::test]
    async fn test_panicking_task_is_contained() {
        let out: Option<()> = blocking(2016020001, "Transform", || panic!("bad feed")).await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_process_game_outcomes() {
        let db = Database::open_in_memory().unwrap();
        db.create_tables().unwrap();
        let overrides = Arc::new(FeedOverrides::default());
        let doc = GameDoc::standard()
            .full_period(1, "20:00")
            .full_period(2, "20:00")
            .full_period(3, "20:00");

        let first = process_game(&db, overrides.clone(), 2016020001, feeds(&doc)).await;
        assert_eq!(first, Outcome::Stored);
        let again = process_game(&db, overrides.clone(), 2016020001, feeds(&doc)).await;
        assert_eq!(again, Outcome::Stored);
        assert_eq!(db.count_game_rows("games", 2016020001).unwrap(), 1);

        let mut live = doc.clone();
        live.status = "Live".to_string();
        let out = process_game(&db, overrides, 2016020001, feeds(&live)).await;
        assert_eq!(out, Outcome::Skipped);
    }
}
