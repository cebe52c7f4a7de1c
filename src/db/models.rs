use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

use crate::engine::situation::{ScoreSit, StrengthSit};

/// Whether playoff games are part of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PlayoffFilter {
    /// Regular season and playoffs
    #[default]
    Include,
    /// Playoff games only
    Only,
    /// Regular season games only
    Exclude,
}

/// Filters for the skater list
#[derive(Debug, Clone, PartialEq)]
pub struct SkaterQuery {
    /// First game date, inclusive (UTC)
    pub start: NaiveDate,
    /// Last game date, inclusive (UTC)
    pub end: NaiveDate,
    /// Restrict to these strength situations; empty means all
    pub strength_sits: Vec<StrengthSit>,
    /// Restrict to these score situations; empty means all
    pub score_sits: Vec<ScoreSit>,
    pub playoffs: PlayoffFilter,
}

/// One skater's totals over the queried games
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skater {
    pub player_id: u32,
    pub first_name: String,
    pub last_name: String,
    /// Most frequently played position
    pub position: String,
    /// Every position played, in first-played order
    pub positions: Vec<String>,
    /// Lower-cased abbreviations of every team played for, in first-played order
    pub teams: Vec<String>,
    /// Games played (games with a known position)
    pub gp: u32,
    pub toi: i64,
    pub ig: i64,
    pub isog: i64,
    /// Individual shot attempts
    pub ic: i64,
    pub ia1: i64,
    pub ia2: i64,
    pub i_blocked: i64,
    pub i_fo_won: i64,
    pub i_fo_lost: i64,
    pub i_eff_pen_drawn: i64,
    pub i_eff_pen_taken: i64,
    pub gf: i64,
    pub ga: i64,
    pub sf: i64,
    pub sa: i64,
    /// On-ice shot attempts for (corsi for)
    pub cf: i64,
    pub ca: i64,
    /// Score-adjusted shot attempts
    pub adj_cf: f64,
    pub adj_ca: f64,
    pub otf: i64,
    pub ofo: i64,
    pub dfo: i64,
    pub nfo: i64,
}
