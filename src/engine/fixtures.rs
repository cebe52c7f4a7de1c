//! Feed-shaped builders shared by the engine tests.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};

use super::raw::RawPlay;
use super::roster::RosterPlayer;
use super::situation::Venue;

pub const AWAY: u32 = 10;
pub const HOME: u32 = 8;

static NEXT_EVENT_IDX: AtomicU32 = AtomicU32::new(1);

/// One entry of `liveData.plays.allPlays`.
#[derive(Debug, Clone)]
pub struct Play(Value);

/// A play of `event_type` at "mm:ss" of `period`, with no team, players or
/// coordinates.
pub fn play(period: u8, clock: &str, event_type: &str) -> Play {
    Play(json!({
        "about": {
            "eventIdx": NEXT_EVENT_IDX.fetch_add(1, Ordering::Relaxed),
            "period": period,
            "periodType": "REGULAR",
            "periodTime": clock,
            "goals": { "away": 0, "home": 0 }
        },
        "result": {
            "description": "",
            "eventTypeId": event_type
        }
    }))
}

impl Play {
    pub fn team(mut self, id: u32) -> Self {
        self.0["team"] = json!({ "id": id, "name": "Team", "triCode": "TTT" });
        self
    }

    pub fn subtype(mut self, s: &str) -> Self {
        self.0["result"]["secondaryType"] = json!(s);
        self
    }

    pub fn description(mut self, s: &str) -> Self {
        self.0["result"]["description"] = json!(s);
        self
    }

    pub fn severity(mut self, s: &str) -> Self {
        self.0["result"]["penaltySeverity"] = json!(s);
        self.0["result"]["penaltyMinutes"] = json!(2);
        self
    }

    pub fn period_type(mut self, s: &str) -> Self {
        self.0["about"]["periodType"] = json!(s);
        self
    }

    /// Running score after the play, as the feed reports it.
    pub fn score(mut self, away: u16, home: u16) -> Self {
        self.0["about"]["goals"] = json!({ "away": away, "home": home });
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.0["coordinates"] = json!({ "x": x, "y": y });
        self
    }

    pub fn role(mut self, player: u32, player_type: &str) -> Self {
        let entry = json!({
            "player": { "id": player, "fullName": "Some Player" },
            "playerType": player_type
        });
        match self.0["players"].as_array_mut() {
            Some(list) => list.push(entry),
            None => self.0["players"] = json!([entry]),
        }
        self
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn into_raw(self) -> RawPlay {
        serde_json::from_value(self.0).unwrap()
    }
}

pub fn roster_player(id: u32, venue: Venue, position: &str) -> RosterPlayer {
    RosterPlayer {
        id,
        first_name: format!("First{}", id),
        last_name: format!("Last{}", id),
        venue,
        team: match venue {
            Venue::Away => AWAY,
            Venue::Home => HOME,
        },
        jersey: Some((id % 100) as u16),
        position: position.to_string(),
    }
}

/// Both documents of one game.
///
/// `standard()` dresses goalie 100 and skaters 101..=105 for the away team
/// and goalie 200 and skaters 201..=205 for the home team.
#[derive(Debug, Clone)]
pub struct GameDoc {
    pub game_id: u64,
    pub status: String,
    players: Vec<(u32, Venue, String)>,
    plays: Vec<Value>,
    shifts: Vec<Value>,
    final_score: (u16, u16),
}

impl GameDoc {
    pub fn new(game_id: u64) -> Self {
        GameDoc {
            game_id,
            status: "Final".to_string(),
            players: Vec::new(),
            plays: Vec::new(),
            shifts: Vec::new(),
            final_score: (0, 0),
        }
    }

    pub fn standard() -> Self {
        let mut doc = GameDoc::new(2016020001);
        for venue in Venue::BOTH {
            let base = Self::base(venue);
            doc = doc.player(base, venue, "G");
            for i in 1..=5 {
                doc = doc.player(base + i, venue, if i <= 3 { "C" } else { "D" });
            }
        }
        doc
    }

    fn base(venue: Venue) -> u32 {
        match venue {
            Venue::Away => 100,
            Venue::Home => 200,
        }
    }

    pub fn player(mut self, id: u32, venue: Venue, position: &str) -> Self {
        self.players.push((id, venue, position.to_string()));
        self
    }

    pub fn play(mut self, p: Play) -> Self {
        self.plays.push(p.into_value());
        self
    }

    pub fn shift(mut self, player: u32, team: u32, period: u8, start: &str, end: &str) -> Self {
        self.shifts.push(json!({
            "playerId": player,
            "teamId": team,
            "period": period,
            "startTime": start,
            "endTime": end
        }));
        self
    }

    /// Period markers plus a whole-period shift for every standard player.
    pub fn full_period(mut self, period: u8, length: &str) -> Self {
        self = self
            .play(play(period, "00:00", "PERIOD_START"))
            .play(play(period, length, "PERIOD_END"));
        for venue in Venue::BOTH {
            let team = match venue {
                Venue::Away => AWAY,
                Venue::Home => HOME,
            };
            for i in 0..=5 {
                self = self.shift(Self::base(venue) + i, team, period, "00:00", length);
            }
        }
        self
    }

    pub fn final_score(mut self, away: u16, home: u16) -> Self {
        self.final_score = (away, home);
        self
    }

    pub fn pbp_json(&self) -> String {
        let mut players = serde_json::Map::new();
        let mut boxscore = [serde_json::Map::new(), serde_json::Map::new()];
        for (id, venue, position) in &self.players {
            let key = format!("ID{}", id);
            players.insert(
                key.clone(),
                json!({ "id": id, "firstName": format!("First{}", id), "lastName": format!("Last{}", id) }),
            );
            boxscore[*venue as usize].insert(
                key,
                json!({ "jerseyNumber": (id % 100).to_string(), "position": { "code": position } }),
            );
        }
        // Builders may add plays out of order; the feed lists them in order.
        let mut plays = self.plays.clone();
        plays.sort_by_key(|p| {
            (
                p["about"]["period"].as_u64(),
                p["about"]["periodTime"].as_str().map(str::to_string),
            )
        });
        json!({
            "gamePk": self.game_id,
            "gameData": {
                "status": { "abstractGameState": self.status },
                "datetime": { "dateTime": "2016-10-12T23:00:00Z" },
                "teams": {
                    "away": { "id": AWAY, "name": "Toronto Maple Leafs", "abbreviation": "TOR" },
                    "home": { "id": HOME, "name": "Montréal Canadiens", "abbreviation": "MTL" }
                },
                "players": players
            },
            "liveData": {
                "plays": { "allPlays": plays },
                "boxscore": {
                    "teams": {
                        "away": { "players": boxscore[0] },
                        "home": { "players": boxscore[1] }
                    }
                },
                "linescore": {
                    "teams": {
                        "away": { "goals": self.final_score.0 },
                        "home": { "goals": self.final_score.1 }
                    }
                }
            }
        })
        .to_string()
    }

    pub fn shifts_json(&self) -> String {
        json!({ "data": self.shifts, "total": self.shifts.len() }).to_string()
    }
}
