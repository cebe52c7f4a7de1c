use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::db::models::PlayoffFilter;
use crate::engine::situation::StrengthSit;
use crate::feeds::nhl_api::{DEFAULT_PBP_URL, DEFAULT_SHIFT_URL};
use crate::feeds::{parse_game_range, ArchiveMode};

/// Rebuilds hockey games second by second from the league's play-by-play and
/// shift feeds, and aggregates situational stats into SQLite
#[derive(Parser, Debug, Clone)]
#[command(name = "rink-timeline", version, about)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "rink-timeline.db", global = true)]
    pub database_path: String,

    /// JSON file of per-game feed corrections
    #[arg(long, env = "OVERRIDES_PATH", default_value = "overrides.json", global = true)]
    pub overrides: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the database tables if they do not exist
    CreateTables,

    /// Download, transform and store a range of games
    Scrape(ScrapeArgs),

    /// Transform one game from local files and print its rows as JSON
    Transform {
        /// Play-by-play document
        pbp: PathBuf,
        /// Shift chart document
        shifts: PathBuf,
    },

    /// Print skater totals over a date range as JSON
    Skaters(SkatersArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ScrapeArgs {
    /// Season start year, e.g. 2016 for 2016-2017
    pub season: u16,

    /// Game number or inclusive range, e.g. 20001 or 20001-20100
    pub games: String,

    /// How the raw-data archive is used
    #[arg(long, value_enum, env = "ARCHIVE_MODE", default_value = "off")]
    pub archive: ArchiveMode,

    /// Directory of archived raw documents
    #[arg(long, env = "ARCHIVE_DIR", default_value = "raw-data")]
    pub archive_dir: PathBuf,

    /// Games downloaded at the same time
    #[arg(long, env = "SCRAPE_CONCURRENCY", default_value = "4")]
    pub concurrency: usize,

    /// Play-by-play API base URL
    #[arg(long, env = "PBP_API_URL", default_value = DEFAULT_PBP_URL)]
    pub pbp_url: String,

    /// Shift chart API base URL
    #[arg(long, env = "SHIFT_API_URL", default_value = DEFAULT_SHIFT_URL)]
    pub shift_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SkatersArgs {
    /// First game date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub start: NaiveDate,

    /// Last game date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub end: NaiveDate,

    /// Strength situations to include, e.g. ev5,pp54 (default all)
    #[arg(long, value_delimiter = ',')]
    pub strength_sits: Vec<String>,

    /// Score situations to include, e.g. -1,0,1 (default all)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub score_sits: Vec<i8>,

    #[arg(long, value_enum, default_value = "include")]
    pub playoffs: PlayoffFilter,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.command {
            Command::Scrape(args) => {
                parse_game_range(&args.games)?;
                if args.concurrency == 0 {
                    anyhow::bail!("concurrency must be at least 1");
                }
                if args.timeout_secs == 0 {
                    anyhow::bail!("timeout_secs must be positive");
                }
                for (name, raw) in [("pbp_url", &args.pbp_url), ("shift_url", &args.shift_url)] {
                    let url = url::Url::parse(raw)
                        .map_err(|e| anyhow::anyhow!("{} '{}' is not a valid URL: {}", name, raw, e))?;
                    if !matches!(url.scheme(), "http" | "https") {
                        anyhow::bail!("{} must be an http(s) URL", name);
                    }
                }
            }
            Command::Skaters(args) => {
                if args.start > args.end {
                    anyhow::bail!("start date {} is after end date {}", args.start, args.end);
                }
                if let Some(s) = args
                    .strength_sits
                    .iter()
                    .find(|s| StrengthSit::from_str_label(s).is_none())
                {
                    anyhow::bail!("unknown strength situation '{}'", s);
                }
                if let Some(s) = args.score_sits.iter().find(|s| !(-3..=3).contains(*s)) {
                    anyhow::bail!("score situation {} must be between -3 and 3", s);
                }
            }
            Command::CreateTables | Command::Transform { .. } => {}
        }
        Ok(())
    }
}
