//! Team and player counters keyed by (strength situation, score situation).

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use super::events::NormalizedEvent;
use super::roster::Roster;
use super::situation::{ScoreSit, StrengthSit, Venue, VenuePair, Zone};
use super::timeline::{Shift, Timeline};

/// Every tracked event count. Time on ice is kept separately in
/// [`Counters::toi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    // Individual
    Ig,
    Isog,
    Ibs,
    Ims,
    Ia1,
    Ia2,
    IBlocked,
    IOfoWon,
    IOfoLost,
    IDfoWon,
    IDfoLost,
    INfoWon,
    INfoLost,
    IOtf,
    IPenTaken,
    IPenDrawn,
    IEffPenTaken,
    IEffPenDrawn,
    Ihf,
    Iha,
    IGive,
    ITake,
    // On ice
    Gf,
    Ga,
    Sf,
    Sa,
    Bsf,
    Bsa,
    Msf,
    Msa,
    OfoWon,
    OfoLost,
    DfoWon,
    DfoLost,
    NfoWon,
    NfoLost,
    PenTaken,
    PenDrawn,
    EffPenTaken,
    EffPenDrawn,
    Hf,
    Ha,
    Give,
    Take,
    IcingTaken,
    IcingDrawn,
}

impl Stat {
    pub const COUNT: usize = 46;

    pub const ALL: [Stat; Stat::COUNT] = [
        Stat::Ig,
        Stat::Isog,
        Stat::Ibs,
        Stat::Ims,
        Stat::Ia1,
        Stat::Ia2,
        Stat::IBlocked,
        Stat::IOfoWon,
        Stat::IOfoLost,
        Stat::IDfoWon,
        Stat::IDfoLost,
        Stat::INfoWon,
        Stat::INfoLost,
        Stat::IOtf,
        Stat::IPenTaken,
        Stat::IPenDrawn,
        Stat::IEffPenTaken,
        Stat::IEffPenDrawn,
        Stat::Ihf,
        Stat::Iha,
        Stat::IGive,
        Stat::ITake,
        Stat::Gf,
        Stat::Ga,
        Stat::Sf,
        Stat::Sa,
        Stat::Bsf,
        Stat::Bsa,
        Stat::Msf,
        Stat::Msa,
        Stat::OfoWon,
        Stat::OfoLost,
        Stat::DfoWon,
        Stat::DfoLost,
        Stat::NfoWon,
        Stat::NfoLost,
        Stat::PenTaken,
        Stat::PenDrawn,
        Stat::EffPenTaken,
        Stat::EffPenDrawn,
        Stat::Hf,
        Stat::Ha,
        Stat::Give,
        Stat::Take,
        Stat::IcingTaken,
        Stat::IcingDrawn,
    ];

    /// Storage column name.
    pub fn column(self) -> &'static str {
        match self {
            Stat::Ig => "ig",
            Stat::Isog => "isog",
            Stat::Ibs => "ibs",
            Stat::Ims => "ims",
            Stat::Ia1 => "ia1",
            Stat::Ia2 => "ia2",
            Stat::IBlocked => "i_blocked",
            Stat::IOfoWon => "i_ofo_won",
            Stat::IOfoLost => "i_ofo_lost",
            Stat::IDfoWon => "i_dfo_won",
            Stat::IDfoLost => "i_dfo_lost",
            Stat::INfoWon => "i_nfo_won",
            Stat::INfoLost => "i_nfo_lost",
            Stat::IOtf => "i_otf",
            Stat::IPenTaken => "i_pen_taken",
            Stat::IPenDrawn => "i_pen_drawn",
            Stat::IEffPenTaken => "i_eff_pen_taken",
            Stat::IEffPenDrawn => "i_eff_pen_drawn",
            Stat::Ihf => "ihf",
            Stat::Iha => "iha",
            Stat::IGive => "i_give",
            Stat::ITake => "i_take",
            Stat::Gf => "gf",
            Stat::Ga => "ga",
            Stat::Sf => "sf",
            Stat::Sa => "sa",
            Stat::Bsf => "bsf",
            Stat::Bsa => "bsa",
            Stat::Msf => "msf",
            Stat::Msa => "msa",
            Stat::OfoWon => "ofo_won",
            Stat::OfoLost => "ofo_lost",
            Stat::DfoWon => "dfo_won",
            Stat::DfoLost => "dfo_lost",
            Stat::NfoWon => "nfo_won",
            Stat::NfoLost => "nfo_lost",
            Stat::PenTaken => "pen_taken",
            Stat::PenDrawn => "pen_drawn",
            Stat::EffPenTaken => "eff_pen_taken",
            Stat::EffPenDrawn => "eff_pen_drawn",
            Stat::Hf => "hf",
            Stat::Ha => "ha",
            Stat::Give => "give",
            Stat::Take => "take",
            Stat::IcingTaken => "icing_taken",
            Stat::IcingDrawn => "icing_drawn",
        }
    }

    /// Individual counters only make sense for players.
    pub fn is_individual(self) -> bool {
        (self as usize) < (Stat::Gf as usize)
    }

    /// Team-level (on-ice) counters, in column order.
    pub fn on_ice() -> impl Iterator<Item = Stat> {
        Stat::ALL.into_iter().filter(|s| !s.is_individual())
    }

    fn faceoff(zone: Zone, won: bool) -> Stat {
        match (zone, won) {
            (Zone::Offensive, true) => Stat::OfoWon,
            (Zone::Offensive, false) => Stat::OfoLost,
            (Zone::Defensive, true) => Stat::DfoWon,
            (Zone::Defensive, false) => Stat::DfoLost,
            (Zone::Neutral, true) => Stat::NfoWon,
            (Zone::Neutral, false) => Stat::NfoLost,
        }
    }

    fn individual_faceoff(zone: Zone, won: bool) -> Stat {
        match (zone, won) {
            (Zone::Offensive, true) => Stat::IOfoWon,
            (Zone::Offensive, false) => Stat::IOfoLost,
            (Zone::Defensive, true) => Stat::IDfoWon,
            (Zone::Defensive, false) => Stat::IDfoLost,
            (Zone::Neutral, true) => Stat::INfoWon,
            (Zone::Neutral, false) => Stat::INfoLost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    /// Seconds on ice.
    pub toi: u32,
    values: [u32; Stat::COUNT],
}

impl Counters {
    pub const ZERO: Counters = Counters {
        toi: 0,
        values: [0; Stat::COUNT],
    };

    pub fn get(&self, stat: Stat) -> u32 {
        self.values[stat as usize]
    }

    pub fn bump(&mut self, stat: Stat) {
        self.values[stat as usize] += 1;
    }

    /// Whether toi or any of `stats` is non-zero.
    pub fn any_nonzero(&self, mut stats: impl Iterator<Item = Stat>) -> bool {
        self.toi > 0 || stats.any(|s| self.get(s) > 0)
    }
}

impl Default for Counters {
    fn default() -> Self {
        Counters::ZERO
    }
}

/// Counters for every (strength, score) combination, all present from the
/// start so that absent situations stay addressable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SituationTable {
    cells: [[Counters; 7]; 13],
}

impl Default for SituationTable {
    fn default() -> Self {
        SituationTable {
            cells: [[Counters::ZERO; 7]; 13],
        }
    }
}

impl SituationTable {
    pub fn get(&self, strength: StrengthSit, score: ScoreSit) -> &Counters {
        &self.cells[strength.index()][score.index()]
    }

    pub fn get_mut(&mut self, strength: StrengthSit, score: ScoreSit) -> &mut Counters {
        &mut self.cells[strength.index()][score.index()]
    }

    /// Cells in (strength, score) enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (StrengthSit, ScoreSit, &Counters)> {
        StrengthSit::ALL.into_iter().flat_map(move |strength| {
            ScoreSit::ALL
                .into_iter()
                .map(move |score| (strength, score, self.get(strength, score)))
        })
    }

    #[cfg(test)]
    pub fn total_toi(&self) -> u32 {
        self.iter().map(|(_, _, c)| c.toi).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatBook {
    pub teams: VenuePair<SituationTable>,
    /// One table per rostered player, ordered by player id.
    pub players: BTreeMap<u32, SituationTable>,
}

impl StatBook {
    fn new(roster: &Roster) -> Self {
        StatBook {
            teams: VenuePair::default(),
            players: roster
                .iter()
                .map(|p| (p.id, SituationTable::default()))
                .collect(),
        }
    }

    fn bump_side(
        &mut self,
        venue: Venue,
        players: impl Iterator<Item = u32>,
        strength: StrengthSit,
        score: ScoreSit,
        stats: &[Stat],
    ) {
        let team = self.teams[venue].get_mut(strength, score);
        for &stat in stats {
            team.bump(stat);
        }
        for pid in players {
            if let Some(table) = self.players.get_mut(&pid) {
                let cell = table.get_mut(strength, score);
                for &stat in stats {
                    cell.bump(stat);
                }
            }
        }
    }
}

/// Walk the timeline and the events and fill the counters.
///
/// Events must already carry their on-ice personnel and strength labels.
pub fn aggregate(
    events: &[NormalizedEvent],
    timeline: &Timeline,
    shifts: &[Shift],
    roster: &Roster,
) -> StatBook {
    let mut book = StatBook::new(roster);

    add_time_on_ice(&mut book, timeline);
    for ev in events.iter().filter(|ev| !ev.is_shootout()) {
        add_on_ice_stats(&mut book, ev);
        add_individual_stats(&mut book, ev, roster);
    }
    add_otf_shifts(&mut book, events, timeline, shifts, roster);
    book
}

fn add_time_on_ice(book: &mut StatBook, timeline: &Timeline) {
    for interval in timeline.intervals() {
        for venue in Venue::BOTH {
            let strength = interval.strength_sits[venue];
            let score = interval.score_sits[venue];
            book.teams[venue].get_mut(strength, score).toi += 1;
            for pid in interval.on_ice.players(venue) {
                if let Some(table) = book.players.get_mut(&pid) {
                    table.get_mut(strength, score).toi += 1;
                }
            }
        }
    }
}

/// Counters an event adds to the side `venue`, given which side the event
/// is credited to.
fn on_ice_stats(ev: &NormalizedEvent, venue: Venue, credited: Venue) -> Vec<Stat> {
    let ours = venue == credited;
    match ev.kind.as_str() {
        "goal" => {
            if ours {
                vec![Stat::Gf, Stat::Sf]
            } else {
                vec![Stat::Ga, Stat::Sa]
            }
        }
        "shot" => vec![if ours { Stat::Sf } else { Stat::Sa }],
        "blocked_shot" => vec![if ours { Stat::Bsf } else { Stat::Bsa }],
        "missed_shot" => vec![if ours { Stat::Msf } else { Stat::Msa }],
        "hit" => vec![if ours { Stat::Hf } else { Stat::Ha }],
        "giveaway" if ours => vec![Stat::Give],
        "takeaway" if ours => vec![Stat::Take],
        "faceoff" => match ev.zones {
            Some(zones) => vec![Stat::faceoff(zones[venue], ours)],
            None => vec![],
        },
        "penalty" => {
            let effective = ev.penalty.as_ref().is_some_and(|p| p.is_effective);
            match (ours, effective) {
                (true, true) => vec![Stat::PenTaken, Stat::EffPenTaken],
                (true, false) => vec![Stat::PenTaken],
                (false, true) => vec![Stat::PenDrawn, Stat::EffPenDrawn],
                (false, false) => vec![Stat::PenDrawn],
            }
        }
        _ if ev.is_icing() => vec![if ours { Stat::IcingTaken } else { Stat::IcingDrawn }],
        _ => vec![],
    }
}

fn add_on_ice_stats(book: &mut StatBook, ev: &NormalizedEvent) {
    let (Some(credited), Some(strength_sits), Some(score_sits), Some(on_ice)) =
        (ev.venue, ev.strength_sits, ev.score_sits, ev.on_ice.as_ref())
    else {
        return;
    };
    for venue in Venue::BOTH {
        let stats = on_ice_stats(ev, venue, credited);
        if stats.is_empty() {
            continue;
        }
        book.bump_side(
            venue,
            on_ice.players(venue),
            strength_sits[venue],
            score_sits[venue],
            &stats,
        );
    }
}

/// Individual counters for one role on one event.
fn role_stats(ev: &NormalizedEvent, role: &str, own_zone: Option<Zone>) -> Vec<Stat> {
    let effective = ev.penalty.as_ref().is_some_and(|p| p.is_effective);
    match role {
        "winner" => own_zone
            .map(|z| vec![Stat::individual_faceoff(z, true)])
            .unwrap_or_default(),
        "loser" => own_zone
            .map(|z| vec![Stat::individual_faceoff(z, false)])
            .unwrap_or_default(),
        "blocker" => vec![Stat::IBlocked],
        "scorer" => vec![Stat::Ig, Stat::Isog],
        "assist1" => vec![Stat::Ia1],
        "assist2" => vec![Stat::Ia2],
        "hitter" => vec![Stat::Ihf],
        "hittee" => vec![Stat::Iha],
        "giver" => vec![Stat::IGive],
        "taker" => vec![Stat::ITake],
        "penaltyon" if effective => vec![Stat::IPenTaken, Stat::IEffPenTaken],
        "penaltyon" => vec![Stat::IPenTaken],
        "drewby" if effective => vec![Stat::IPenDrawn, Stat::IEffPenDrawn],
        "drewby" => vec![Stat::IPenDrawn],
        "shooter" => match ev.kind.as_str() {
            "shot" => vec![Stat::Isog],
            "blocked_shot" => vec![Stat::Ibs],
            "missed_shot" => vec![Stat::Ims],
            _ => vec![],
        },
        _ => vec![],
    }
}

fn add_individual_stats(book: &mut StatBook, ev: &NormalizedEvent, roster: &Roster) {
    let (Some(strength_sits), Some(score_sits)) = (ev.strength_sits, ev.score_sits) else {
        return;
    };
    for role in &ev.roles {
        // Feeds occasionally name people who appear nowhere else in the game
        // (e.g. a player serving a coach's penalty).
        let Some(player) = roster.get(role.player) else {
            debug!("Event {}: skipping unrostered player {}", ev.id, role.player);
            continue;
        };
        let venue = player.venue;
        let stats = role_stats(ev, &role.role, ev.zones.map(|z| z[venue]));
        if let Some(table) = book.players.get_mut(&player.id) {
            let cell = table.get_mut(strength_sits[venue], score_sits[venue]);
            for stat in stats {
                cell.bump(stat);
            }
        }
    }
}

/// Count shifts that did not start on a faceoff.
fn add_otf_shifts(
    book: &mut StatBook,
    events: &[NormalizedEvent],
    timeline: &Timeline,
    shifts: &[Shift],
    roster: &Roster,
) {
    let faceoffs: HashSet<(u8, u32)> = events
        .iter()
        .filter(|ev| ev.kind == "faceoff")
        .map(|ev| (ev.period, ev.time))
        .collect();

    for sh in shifts.iter().filter(|sh| !faceoffs.contains(&(sh.period, sh.start))) {
        let Some(interval) = timeline.starting_at(sh.period, sh.start) else {
            warn!("Shift of player {} starts after period {} ended", sh.player, sh.period);
            continue;
        };
        let venue = roster.get(sh.player).map_or(sh.venue, |p| p.venue);
        if let Some(table) = book.players.get_mut(&sh.player) {
            table
                .get_mut(interval.strength_sits[venue], interval.score_sits[venue])
                .bump(Stat::IOtf);
        }
    }
}
