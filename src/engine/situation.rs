//! Fixed situational vocabularies: venue, strength, score and zone labels.
//!
//! Every derived label in the engine comes from one of the lookup functions in
//! this module, so a skater/goalie combination or goal differential is always
//! classified the same way whether it is attached to an interval or an event.

use serde::Serialize;
use std::fmt;
use std::ops::{Index, IndexMut};

/// "away" or "home" designation of a team within a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Away,
    Home,
}

impl Venue {
    pub const BOTH: [Venue; 2] = [Venue::Away, Venue::Home];

    pub fn opponent(self) -> Venue {
        match self {
            Venue::Away => Venue::Home,
            Venue::Home => Venue::Away,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Venue::Away => "away",
            Venue::Home => "home",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per side, always ordered (away, home).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VenuePair<T> {
    pub away: T,
    pub home: T,
}

impl<T> VenuePair<T> {
    pub fn new(away: T, home: T) -> Self {
        VenuePair { away, home }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> VenuePair<U> {
        VenuePair {
            away: f(self.away),
            home: f(self.home),
        }
    }

    pub fn as_ref(&self) -> VenuePair<&T> {
        VenuePair {
            away: &self.away,
            home: &self.home,
        }
    }

    /// Swap the two sides in place.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.away, &mut self.home);
    }
}

impl<T> Index<Venue> for VenuePair<T> {
    type Output = T;

    fn index(&self, venue: Venue) -> &T {
        match venue {
            Venue::Away => &self.away,
            Venue::Home => &self.home,
        }
    }
}

impl<T> IndexMut<Venue> for VenuePair<T> {
    fn index_mut(&mut self, venue: Venue) -> &mut T {
        match venue {
            Venue::Away => &mut self.away,
            Venue::Home => &mut self.home,
        }
    }
}

// ── Strength situations ──────────────────────────────────────────────────────

/// Classification of on-ice skater/goalie counts from one side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrengthSit {
    Ev5,
    Ev4,
    Ev3,
    Pp54,
    Pp53,
    Pp43,
    Sh45,
    Sh35,
    Sh34,
    /// Assigned to events flagged as penalty shots, never to intervals.
    PenShot,
    NoOwnG,
    NoOppG,
    Other,
}

impl StrengthSit {
    pub const ALL: [StrengthSit; 13] = [
        StrengthSit::Ev5,
        StrengthSit::Ev4,
        StrengthSit::Ev3,
        StrengthSit::Pp54,
        StrengthSit::Pp53,
        StrengthSit::Pp43,
        StrengthSit::Sh45,
        StrengthSit::Sh35,
        StrengthSit::Sh34,
        StrengthSit::PenShot,
        StrengthSit::NoOwnG,
        StrengthSit::NoOppG,
        StrengthSit::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrengthSit::Ev5 => "ev5",
            StrengthSit::Ev4 => "ev4",
            StrengthSit::Ev3 => "ev3",
            StrengthSit::Pp54 => "pp54",
            StrengthSit::Pp53 => "pp53",
            StrengthSit::Pp43 => "pp43",
            StrengthSit::Sh45 => "sh45",
            StrengthSit::Sh35 => "sh35",
            StrengthSit::Sh34 => "sh34",
            StrengthSit::PenShot => "penShot",
            StrengthSit::NoOwnG => "noOwnG",
            StrengthSit::NoOppG => "noOppG",
            StrengthSit::Other => "other",
        }
    }

    pub fn from_str_label(label: &str) -> Option<Self> {
        StrengthSit::ALL.into_iter().find(|s| s.as_str() == label)
    }

    /// Position in [`StrengthSit::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Skater-count label for one side with `own` skaters against `opp`.
    /// Only called with both counts in 3..=5.
    fn from_skaters(own: usize, opp: usize) -> Self {
        match (own, opp) {
            (5, 5) => StrengthSit::Ev5,
            (4, 4) => StrengthSit::Ev4,
            (3, 3) => StrengthSit::Ev3,
            (5, 4) => StrengthSit::Pp54,
            (5, 3) => StrengthSit::Pp53,
            (4, 3) => StrengthSit::Pp43,
            (4, 5) => StrengthSit::Sh45,
            (3, 5) => StrengthSit::Sh35,
            (3, 4) => StrengthSit::Sh34,
            _ => StrengthSit::Other,
        }
    }
}

impl fmt::Display for StrengthSit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StrengthSit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Strength situation lookup on (goalie counts, skater counts).
///
/// Anything that is not a single empty net or a one-goalie-each game state
/// with 3..=5 skaters per side falls through to `other`.
pub fn strength_sits(goalies: VenuePair<usize>, skaters: VenuePair<usize>) -> VenuePair<StrengthSit> {
    match (goalies.away, goalies.home) {
        (0, 1) => VenuePair::new(StrengthSit::NoOwnG, StrengthSit::NoOppG),
        (1, 0) => VenuePair::new(StrengthSit::NoOppG, StrengthSit::NoOwnG),
        (1, 1)
            if (3..=5).contains(&skaters.away) && (3..=5).contains(&skaters.home) =>
        {
            VenuePair::new(
                StrengthSit::from_skaters(skaters.away, skaters.home),
                StrengthSit::from_skaters(skaters.home, skaters.away),
            )
        }
        _ => VenuePair::new(StrengthSit::Other, StrengthSit::Other),
    }
}

// ── Score situations ─────────────────────────────────────────────────────────

/// Goal differential from one side's perspective, clamped to -3..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScoreSit(i8);

impl ScoreSit {
    pub const ALL: [ScoreSit; 7] = [
        ScoreSit(-3),
        ScoreSit(-2),
        ScoreSit(-1),
        ScoreSit(0),
        ScoreSit(1),
        ScoreSit(2),
        ScoreSit(3),
    ];

    pub fn from_diff(diff: i32) -> Self {
        ScoreSit(diff.clamp(-3, 3) as i8)
    }

    pub fn value(self) -> i8 {
        self.0
    }

    /// Position in [`ScoreSit::ALL`].
    pub fn index(self) -> usize {
        (self.0 + 3) as usize
    }
}

impl fmt::Display for ScoreSit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Score situations for (away score, home score).
pub fn score_sits(score: VenuePair<u16>) -> VenuePair<ScoreSit> {
    let away = ScoreSit::from_diff(i32::from(score.away) - i32::from(score.home));
    // Keep a tied game at a plain 0 on both sides rather than a negated 0.
    let home = if away.0 == 0 { ScoreSit(0) } else { ScoreSit(-away.0) };
    VenuePair::new(away, home)
}

// ── Zones ────────────────────────────────────────────────────────────────────

/// Zones within 25 units of centre ice are neutral.
pub const NEUTRAL_ZONE_HALF_WIDTH: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    Offensive,
    Defensive,
    Neutral,
}

impl Zone {
    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Offensive => "o",
            Zone::Defensive => "d",
            Zone::Neutral => "n",
        }
    }

    /// The same location seen from the other side.
    pub fn flip(self) -> Zone {
        match self {
            Zone::Offensive => Zone::Defensive,
            Zone::Defensive => Zone::Offensive,
            Zone::Neutral => Zone::Neutral,
        }
    }
}

impl Serialize for Zone {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// (away, home) zones of an x coordinate for the given rink orientation.
pub fn zones_at(home_def_neg: bool, x: f64) -> VenuePair<Zone> {
    let home = if x.abs() <= NEUTRAL_ZONE_HALF_WIDTH {
        Zone::Neutral
    } else if (x < 0.0) == home_def_neg {
        Zone::Defensive
    } else {
        Zone::Offensive
    };
    VenuePair::new(home.flip(), home)
}

/// (away, home) defended sides: the sign of the x coordinates of each
/// team's defensive half.
pub fn def_sides(home_def_neg: bool) -> VenuePair<i8> {
    if home_def_neg {
        VenuePair::new(1, -1)
    } else {
        VenuePair::new(-1, 1)
    }
}
