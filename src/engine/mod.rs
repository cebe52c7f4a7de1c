//! Game transformation: two raw feed documents in, one [`TableRows`] out.
//!
//! The stages run in a fixed order, each enriching what the previous one
//! produced:
//!
//! 1. [`events`] normalizes the play list.
//! 2. [`periods`] builds the period list and works out rink orientation.
//! 3. [`timeline`] expands shifts into one interval per second.
//! 4. [`stats`] accumulates counters per strength and score situation.
//! 5. [`compress`] folds the timeline into situation ranges.
//! 6. [`rows`] projects everything into flat records.
//!
//! The engine is pure: no I/O and no shared state, so games can be
//! transformed on any number of threads.

pub mod compress;
pub mod events;
pub mod periods;
pub mod raw;
pub mod roster;
pub mod rows;
pub mod situation;
pub mod stats;
pub mod timeline;

#[cfg(test)]
pub(crate) mod fixtures;

use thiserror::Error;
use tracing::{debug, info};

use crate::overrides::FeedOverrides;
use events::{attribute_icings, normalize_events, NormalizedEvent};
use periods::{assign_zones, build_periods, resolve_orientation};
use raw::{PbpFeed, ShiftFeed, StatusProbe};
use roster::{Roster, TeamInfo};
use rows::{project, GameSummary, TableRows};
use situation::VenuePair;
use timeline::{attach_situations, collect_shifts, Timeline};

/// Why a game produced no rows. Not an error: these games are simply not
/// ready or not usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("game is not final (state '{0}')")]
    NotFinal(String),
    #[error("malformed feed: {0}")]
    Malformed(String),
}

/// Internal consistency failures. Processing of the game stops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("event {event_id} at period {period} second {time} has no interval")]
    MissingInterval { event_id: u32, period: u8, time: u32 },

    #[error("event {event_id} references period {period} which is not in the period list")]
    UnknownPeriod { event_id: u32, period: u8 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Skipped(SkipReason),
    Rows(Box<TableRows>),
}

/// Everything read from the two documents before any derivation.
struct ParsedGame {
    game_id: u64,
    feed: PbpFeed,
    shifts: ShiftFeed,
    teams: VenuePair<TeamInfo>,
    roster: Roster,
    events: Vec<NormalizedEvent>,
}

impl ParsedGame {
    fn parse(pbp: &str, shifts: &str) -> Result<Self, SkipReason> {
        let probe: StatusProbe = serde_json::from_str(pbp)
            .map_err(|e| SkipReason::Malformed(format!("play-by-play: {}", e)))?;
        let state = probe.game_data.status.abstract_game_state;
        if !state.eq_ignore_ascii_case("final") {
            return Err(SkipReason::NotFinal(state));
        }

        let feed: PbpFeed = serde_json::from_str(pbp)
            .map_err(|e| SkipReason::Malformed(format!("play-by-play: {}", e)))?;
        let shifts: ShiftFeed = serde_json::from_str(shifts)
            .map_err(|e| SkipReason::Malformed(format!("shifts: {}", e)))?;

        let meta = &feed.game_data.teams;
        if meta.away.id == meta.home.id {
            return Err(SkipReason::Malformed(format!(
                "both teams have id {}",
                meta.away.id
            )));
        }
        let teams = VenuePair::new(&meta.away, &meta.home).map(|t| TeamInfo {
            id: t.id,
            name: t.name.clone(),
            abbreviation: t.abbreviation.to_lowercase(),
        });
        let roster = Roster::from_feed(&feed, &teams);
        let team_ids = teams.as_ref().map(|t| t.id);
        let events = normalize_events(&feed.live_data.plays.all_plays, team_ids)?;

        Ok(ParsedGame {
            game_id: feed.game_pk,
            feed,
            shifts,
            teams,
            roster,
            events,
        })
    }
}

/// Transform one game's play-by-play and shift documents into table rows.
///
/// Games that are not final, or whose documents cannot be read, come back
/// as [`Transform::Skipped`]. An `Err` means the feeds were readable but
/// internally inconsistent in a way no fallback covers.
pub fn transform(
    pbp: &str,
    shifts: &str,
    overrides: &FeedOverrides,
) -> Result<Transform, EngineError> {
    let game = match ParsedGame::parse(pbp, shifts) {
        Ok(game) => game,
        Err(reason) => {
            debug!("Skipping game: {}", reason);
            return Ok(Transform::Skipped(reason));
        }
    };
    let ParsedGame {
        game_id,
        feed,
        shifts,
        teams,
        roster,
        mut events,
    } = game;
    let team_ids = teams.as_ref().map(|t| t.id);
    let game_override = overrides.for_game(game_id);

    let fixes = game_override.map(|o| o.period_fixes.as_slice()).unwrap_or_default();
    let mut periods = build_periods(&events, fixes);
    if periods.is_empty() {
        return Ok(Transform::Skipped(SkipReason::Malformed(format!(
            "game {} has no period_end markers",
            game_id
        ))));
    }
    resolve_orientation(&mut periods, &events, game_override);
    assign_zones(&mut events, &periods, game_override)?;
    attribute_icings(&mut events, team_ids);

    let shifts = collect_shifts(&shifts.data, &roster, &periods, team_ids);
    let timeline = Timeline::build(&periods, &shifts, &roster, &events);
    attach_situations(&mut events, &timeline)?;

    let book = stats::aggregate(&events, &timeline, &shifts, &roster);
    let situations = compress::compress(&timeline);

    let linescore = &feed.live_data.linescore.teams;
    let rows = project(&GameSummary {
        game_id,
        game_date: feed.game_data.datetime.date_time,
        final_score: VenuePair::new(linescore.away.goals, linescore.home.goals),
        teams: &teams,
        roster: &roster,
        periods: &periods,
        events: &events,
        shifts: &shifts,
        stats: &book,
        situations: &situations,
    });

    info!(
        "Transformed game {}: {} events, {} shifts, {} periods",
        game_id,
        events.len(),
        shifts.len(),
        periods.len()
    );
    Ok(Transform::Rows(Box::new(rows)))
}
