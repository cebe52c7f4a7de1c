//! Shapes of the two input documents, as published by the league feeds.
//!
//! Only the fields the engine reads are declared; everything else in the
//! documents is ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Just enough of the play-by-play document to decide whether a game is final.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusProbe {
    pub game_data: StatusProbeData,
}

#[derive(Debug, Deserialize)]
pub struct StatusProbeData {
    pub status: GameStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    pub abstract_game_state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbpFeed {
    pub game_pk: u64,
    pub game_data: GameData,
    pub live_data: LiveData,
}

#[derive(Debug, Deserialize)]
pub struct GameData {
    pub datetime: GameDateTime,
    pub teams: Sides<TeamMeta>,
    /// Keyed by "ID{player id}".
    pub players: BTreeMap<String, PlayerMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDateTime {
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct Sides<T> {
    pub away: T,
    pub home: T,
}

#[derive(Debug, Deserialize)]
pub struct TeamMeta {
    pub id: u32,
    pub name: String,
    pub abbreviation: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMeta {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LiveData {
    pub plays: Plays,
    pub boxscore: Boxscore,
    pub linescore: Linescore,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plays {
    pub all_plays: Vec<RawPlay>,
}

#[derive(Debug, Deserialize)]
pub struct Boxscore {
    pub teams: Sides<BoxscoreTeam>,
}

#[derive(Debug, Deserialize)]
pub struct BoxscoreTeam {
    /// Keyed by "ID{player id}", same keys as [`GameData::players`].
    pub players: BTreeMap<String, BoxscorePlayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxscorePlayer {
    pub jersey_number: Option<String>,
    pub position: Position,
}

#[derive(Debug, Deserialize)]
pub struct Position {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct Linescore {
    pub teams: Sides<LinescoreTeam>,
}

#[derive(Debug, Deserialize)]
pub struct LinescoreTeam {
    pub goals: u16,
}

#[derive(Debug, Deserialize)]
pub struct RawPlay {
    pub about: PlayAbout,
    pub result: PlayResult,
    pub coordinates: Option<Coordinates>,
    pub team: Option<TeamRef>,
    pub players: Option<Vec<PlayRole>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayAbout {
    pub event_idx: u32,
    pub period: u8,
    pub period_type: String,
    /// "mm:ss" elapsed in the period.
    pub period_time: String,
    pub goals: Sides<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResult {
    #[serde(default)]
    pub description: String,
    pub event_type_id: String,
    pub secondary_type: Option<String>,
    pub penalty_severity: Option<String>,
    pub penalty_minutes: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct Coordinates {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TeamRef {
    pub id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRole {
    pub player: PlayerRef,
    pub player_type: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayerRef {
    pub id: u32,
}

#[derive(Debug, Deserialize)]
pub struct ShiftFeed {
    pub data: Vec<RawShift>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShift {
    pub player_id: u32,
    pub team_id: u32,
    pub period: u8,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Convert a "mm:ss" clock to elapsed seconds.
pub fn parse_clock(mmss: &str) -> Option<u32> {
    let (mm, ss) = mmss.trim().split_once(':')?;
    let mm: u32 = mm.parse().ok()?;
    let ss: u32 = ss.parse().ok()?;
    Some(60 * mm + ss)
}
