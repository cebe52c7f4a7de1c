//! Flat, storage-ready records for one processed game.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use super::compress::{Range, SituationRanges};
use super::events::NormalizedEvent;
use super::periods::{Period, PeriodType};
use super::roster::{Roster, TeamInfo};
use super::situation::{ScoreSit, StrengthSit, Venue, VenuePair, Zone};
use super::stats::{Counters, Stat, StatBook};
use super::timeline::Shift;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRow {
    pub game_id: u64,
    pub season: u16,
    pub game_date: DateTime<Utc>,
    /// Highest period number played.
    pub periods: u8,
    pub is_playoff: bool,
    pub has_shootout: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRow {
    pub team_id: u32,
    pub abbreviation: String,
    pub team_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRow {
    pub player_id: u32,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameTeamRow {
    pub game_id: u64,
    pub team_id: u32,
    pub venue: Venue,
    /// Final score, shootout winner's extra goal included.
    pub score: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamePlayerRow {
    pub game_id: u64,
    pub player_id: u32,
    pub team_id: u32,
    pub jersey: Option<u16>,
    pub position: String,
}

/// Whose counters a stats row holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOwner {
    Team(u32),
    Player(u32),
}

/// One (owner, strength, score) cell of the stats tables. Team rows carry
/// only on-ice columns; player rows carry every column.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRow {
    pub game_id: u64,
    pub owner: StatOwner,
    pub strength_sit: StrengthSit,
    pub score_sit: ScoreSit,
    pub counters: Counters,
}

impl StatRow {
    /// Counter columns this row carries, in storage order.
    pub fn stats(&self) -> Box<dyn Iterator<Item = Stat>> {
        match self.owner {
            StatOwner::Team(_) => Box::new(Stat::on_ice()),
            StatOwner::Player(_) => Box::new(Stat::ALL.into_iter()),
        }
    }
}

impl Serialize for StatRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("game_id", &self.game_id)?;
        match self.owner {
            StatOwner::Team(id) => map.serialize_entry("team_id", &id)?,
            StatOwner::Player(id) => map.serialize_entry("player_id", &id)?,
        }
        map.serialize_entry("strength_sit", &self.strength_sit)?;
        map.serialize_entry("score_sit", &self.score_sit)?;
        map.serialize_entry("toi", &self.counters.toi)?;
        for stat in self.stats() {
            map.serialize_entry(stat.column(), &self.counters.get(stat))?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameEventRow {
    pub game_id: u64,
    pub event_id: u32,
    pub period: u8,
    pub period_type: &'static str,
    pub event_time: u32,
    pub event_desc: String,
    pub event_type: String,
    pub event_subtype: String,
    pub pen_severity: Option<String>,
    pub pen_mins: Option<u16>,
    pub pen_is_effective: Option<bool>,
    pub team_id: Option<u32>,
    pub venue: Option<Venue>,
    pub loc_x: Option<f64>,
    pub loc_y: Option<f64>,
    pub a_zone: Option<Zone>,
    pub h_zone: Option<Zone>,
    pub a_def_side: Option<i8>,
    pub h_def_side: Option<i8>,
    pub a_strength_sit: Option<StrengthSit>,
    pub h_strength_sit: Option<StrengthSit>,
    pub a_score: u16,
    pub h_score: u16,
    pub a_score_sit: Option<ScoreSit>,
    pub h_score_sit: Option<ScoreSit>,
    pub a_skaters: Option<u8>,
    pub h_skaters: Option<u8>,
    pub a_goalies: Option<u8>,
    pub h_goalies: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameEventPlayerRow {
    pub game_id: u64,
    pub event_id: u32,
    pub player_id: u32,
    pub on_ice: bool,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameShiftRow {
    pub game_id: u64,
    pub player_id: u32,
    pub period: u8,
    pub shifts: Vec<Range>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSituationRow {
    pub game_id: u64,
    pub team_id: u32,
    pub strength_sit: StrengthSit,
    pub score_sit: ScoreSit,
    pub period: u8,
    pub timeranges: Vec<Range>,
}

/// Every table's rows for one game. Serializes as an object keyed by table
/// name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRows {
    pub games: Vec<GameRow>,
    pub teams: Vec<TeamRow>,
    pub players: Vec<PlayerRow>,
    pub game_teams: Vec<GameTeamRow>,
    pub game_players: Vec<GamePlayerRow>,
    pub game_team_stats: Vec<StatRow>,
    pub game_player_stats: Vec<StatRow>,
    pub game_events: Vec<GameEventRow>,
    pub game_event_players: Vec<GameEventPlayerRow>,
    pub game_shifts: Vec<GameShiftRow>,
    pub game_situations: Vec<GameSituationRow>,
}

impl TableRows {
    pub fn game_id(&self) -> Option<u64> {
        self.games.first().map(|g| g.game_id)
    }
}

/// Everything the projector reads.
pub struct GameSummary<'a> {
    pub game_id: u64,
    pub game_date: DateTime<Utc>,
    pub final_score: VenuePair<u16>,
    pub teams: &'a VenuePair<TeamInfo>,
    pub roster: &'a Roster,
    pub periods: &'a [Period],
    pub events: &'a [NormalizedEvent],
    pub shifts: &'a [Shift],
    pub stats: &'a StatBook,
    pub situations: &'a SituationRanges,
}

/// Game ids look like 2016020001: season, two-digit game type, game number.
pub fn season_of(game_id: u64) -> u16 {
    (game_id / 1_000_000) as u16
}

pub fn is_playoff_game(game_id: u64) -> bool {
    (game_id / 10_000) % 100 == 3
}

pub fn project(g: &GameSummary<'_>) -> TableRows {
    TableRows {
        games: vec![game_row(g)],
        teams: Venue::BOTH
            .iter()
            .map(|&v| TeamRow {
                team_id: g.teams[v].id,
                abbreviation: g.teams[v].abbreviation.clone(),
                team_name: g.teams[v].name.clone(),
            })
            .collect(),
        players: g
            .roster
            .iter()
            .map(|p| PlayerRow {
                player_id: p.id,
                first_name: p.first_name.clone(),
                last_name: p.last_name.clone(),
            })
            .collect(),
        game_teams: Venue::BOTH
            .iter()
            .map(|&v| GameTeamRow {
                game_id: g.game_id,
                team_id: g.teams[v].id,
                venue: v,
                score: g.final_score[v],
            })
            .collect(),
        game_players: g
            .roster
            .iter()
            .map(|p| GamePlayerRow {
                game_id: g.game_id,
                player_id: p.id,
                team_id: p.team,
                jersey: p.jersey,
                position: p.position.clone(),
            })
            .collect(),
        game_team_stats: team_stat_rows(g),
        game_player_stats: player_stat_rows(g),
        game_events: g.events.iter().map(|ev| event_row(g.game_id, ev)).collect(),
        game_event_players: g
            .events
            .iter()
            .filter(|ev| !ev.is_shootout())
            .flat_map(|ev| event_player_rows(g.game_id, ev))
            .collect(),
        game_shifts: shift_rows(g),
        game_situations: g
            .situations
            .iter()
            .map(|(key, ranges)| GameSituationRow {
                game_id: g.game_id,
                team_id: g.teams[key.venue].id,
                strength_sit: key.strength,
                score_sit: key.score,
                period: key.period,
                timeranges: ranges.clone(),
            })
            .collect(),
    }
}

fn game_row(g: &GameSummary<'_>) -> GameRow {
    GameRow {
        game_id: g.game_id,
        season: season_of(g.game_id),
        game_date: g.game_date,
        periods: g.periods.iter().map(|p| p.number).max().unwrap_or(0),
        is_playoff: is_playoff_game(g.game_id),
        has_shootout: g.periods.iter().any(|p| p.period_type == PeriodType::Shootout),
    }
}

fn team_stat_rows(g: &GameSummary<'_>) -> Vec<StatRow> {
    Venue::BOTH
        .iter()
        .flat_map(|&v| {
            g.stats.teams[v]
                .iter()
                .filter(|(_, _, c)| c.any_nonzero(Stat::on_ice()))
                .map(move |(strength_sit, score_sit, c)| StatRow {
                    game_id: g.game_id,
                    owner: StatOwner::Team(g.teams[v].id),
                    strength_sit,
                    score_sit,
                    counters: *c,
                })
        })
        .collect()
}

fn player_stat_rows(g: &GameSummary<'_>) -> Vec<StatRow> {
    g.stats
        .players
        .iter()
        .flat_map(|(&pid, table)| {
            table
                .iter()
                .filter(|(_, _, c)| c.any_nonzero(Stat::ALL.into_iter()))
                .map(move |(strength_sit, score_sit, c)| StatRow {
                    game_id: g.game_id,
                    owner: StatOwner::Player(pid),
                    strength_sit,
                    score_sit,
                    counters: *c,
                })
        })
        .collect()
}

fn event_row(game_id: u64, ev: &NormalizedEvent) -> GameEventRow {
    let count = |list: &Vec<u32>| u8::try_from(list.len()).unwrap_or(u8::MAX);
    let skaters = ev.on_ice.as_ref().map(|o| o.skaters.as_ref().map(count));
    let goalies = ev.on_ice.as_ref().map(|o| o.goalies.as_ref().map(count));
    GameEventRow {
        game_id,
        event_id: ev.id,
        period: ev.period,
        period_type: ev.period_type.as_str(),
        event_time: ev.time,
        event_desc: ev.description.clone(),
        event_type: ev.kind.clone(),
        event_subtype: ev.subtype.clone(),
        pen_severity: ev.penalty.as_ref().map(|p| p.severity.clone()),
        pen_mins: ev.penalty.as_ref().and_then(|p| p.minutes),
        pen_is_effective: ev.penalty.as_ref().map(|p| p.is_effective),
        team_id: ev.team,
        venue: ev.venue,
        loc_x: ev.location.map(|l| l.x),
        loc_y: ev.location.map(|l| l.y),
        a_zone: ev.zones.map(|z| z.away),
        h_zone: ev.zones.map(|z| z.home),
        a_def_side: ev.def_sides.map(|s| s.away),
        h_def_side: ev.def_sides.map(|s| s.home),
        a_strength_sit: ev.strength_sits.map(|s| s.away),
        h_strength_sit: ev.strength_sits.map(|s| s.home),
        a_score: ev.score.away,
        h_score: ev.score.home,
        a_score_sit: ev.score_sits.map(|s| s.away),
        h_score_sit: ev.score_sits.map(|s| s.home),
        a_skaters: skaters.map(|s| s.away),
        h_skaters: skaters.map(|s| s.home),
        a_goalies: goalies.map(|g| g.away),
        h_goalies: goalies.map(|g| g.home),
    }
}

/// On-ice players first, then role players. A player both on the ice and
/// in a role gets a single row; the last role listed wins.
fn event_player_rows(game_id: u64, ev: &NormalizedEvent) -> Vec<GameEventPlayerRow> {
    let mut rows: Vec<GameEventPlayerRow> = Vec::new();
    if let Some(on_ice) = &ev.on_ice {
        let players = on_ice
            .skaters
            .away
            .iter()
            .chain(&on_ice.skaters.home)
            .chain(&on_ice.goalies.away)
            .chain(&on_ice.goalies.home);
        for &pid in players {
            rows.push(GameEventPlayerRow {
                game_id,
                event_id: ev.id,
                player_id: pid,
                on_ice: true,
                role: None,
            });
        }
    }
    for r in &ev.roles {
        match rows.iter_mut().find(|row| row.player_id == r.player) {
            Some(row) => row.role = Some(r.role.clone()),
            None => rows.push(GameEventPlayerRow {
                game_id,
                event_id: ev.id,
                player_id: r.player,
                on_ice: false,
                role: Some(r.role.clone()),
            }),
        }
    }
    rows
}

fn shift_rows(g: &GameSummary<'_>) -> Vec<GameShiftRow> {
    let mut by_player: BTreeMap<(u32, u8), Vec<Range>> = BTreeMap::new();
    for sh in g.shifts {
        by_player
            .entry((sh.player, sh.period))
            .or_default()
            .push((sh.start, sh.end));
    }
    by_player
        .into_iter()
        .map(|((player_id, period), mut shifts)| {
            shifts.sort_unstable();
            GameShiftRow {
                game_id: g.game_id,
                player_id,
                period,
                shifts,
            }
        })
        .collect()
}
