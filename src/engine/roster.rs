//! Teams and dressed players read from the play-by-play boxscore.

use std::collections::BTreeMap;

use super::raw::PbpFeed;
use super::situation::{Venue, VenuePair};

#[derive(Debug, Clone, PartialEq)]
pub struct TeamInfo {
    pub id: u32,
    pub name: String,
    /// Lower-cased, e.g. "tor".
    pub abbreviation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosterPlayer {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    pub venue: Venue,
    pub team: u32,
    pub jersey: Option<u16>,
    /// Lower-cased position code with slashes removed: "c", "d", "g", "na"...
    pub position: String,
}

impl RosterPlayer {
    pub fn is_goalie(&self) -> bool {
        self.position == "g"
    }
}

/// Everyone dressed (or scratched) for the game, ordered by player id.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: BTreeMap<u32, RosterPlayer>,
}

impl Roster {
    pub fn from_feed(feed: &PbpFeed, teams: &VenuePair<TeamInfo>) -> Self {
        let boxscore = &feed.live_data.boxscore.teams;
        let players = feed
            .game_data
            .players
            .iter()
            .map(|(key, meta)| {
                // Anyone not listed with the away team belongs to the home team.
                let (venue, entry) = match boxscore.away.players.get(key) {
                    Some(entry) => (Venue::Away, Some(entry)),
                    None => (Venue::Home, boxscore.home.players.get(key)),
                };
                let player = RosterPlayer {
                    id: meta.id,
                    first_name: meta.first_name.clone(),
                    last_name: meta.last_name.clone(),
                    venue,
                    team: teams[venue].id,
                    jersey: entry
                        .and_then(|e| e.jersey_number.as_deref())
                        .and_then(|j| j.trim().parse().ok()),
                    position: entry
                        .map(|e| e.position.code.to_lowercase().replace('/', ""))
                        .unwrap_or_else(|| "na".to_string()),
                };
                (meta.id, player)
            })
            .collect();
        Roster { players }
    }

    pub fn get(&self, id: u32) -> Option<&RosterPlayer> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.players.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RosterPlayer> {
        self.players.values()
    }
}

#[cfg(test)]
impl Roster {
    pub fn from_players(players: impl IntoIterator<Item = RosterPlayer>) -> Self {
        Roster {
            players: players.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}
