//! Dense one-second timeline of each period.
//!
//! Personnel and score can change at any second, so every second of every
//! non-shootout period gets its own [`Interval`] holding who was on the ice,
//! the running score and the resulting situation labels.

use tracing::{debug, warn};

use super::events::NormalizedEvent;
use super::periods::Period;
use super::raw::{parse_clock, RawShift};
use super::roster::Roster;
use super::situation::{score_sits, strength_sits, ScoreSit, StrengthSit, Venue, VenuePair};
use super::EngineError;

/// Players on the ice, per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnIce {
    pub skaters: VenuePair<Vec<u32>>,
    pub goalies: VenuePair<Vec<u32>>,
}

impl OnIce {
    /// Skaters then goalies of one side.
    pub fn players(&self, venue: Venue) -> impl Iterator<Item = u32> + '_ {
        self.skaters[venue]
            .iter()
            .chain(self.goalies[venue].iter())
            .copied()
    }

    pub fn contains(&self, venue: Venue, player: u32) -> bool {
        self.skaters[venue].contains(&player) || self.goalies[venue].contains(&player)
    }

    fn insert(&mut self, venue: Venue, player: u32, goalie: bool) {
        let list = if goalie {
            &mut self.goalies[venue]
        } else {
            &mut self.skaters[venue]
        };
        // Overlapping shift records for one player must not count them twice.
        if !list.contains(&player) {
            list.push(player);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub period: u8,
    pub start: u32,
    pub end: u32,
    pub on_ice: OnIce,
    pub score: VenuePair<u16>,
    pub strength_sits: VenuePair<StrengthSit>,
    pub score_sits: VenuePair<ScoreSit>,
}

/// One continuous on-ice stint, in seconds of its period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shift {
    pub player: u32,
    pub team: u32,
    pub venue: Venue,
    pub period: u8,
    pub start: u32,
    pub end: u32,
}

/// Keep the shifts the timeline can use: known players, known non-shootout
/// periods, readable clocks and a positive length.
pub fn collect_shifts(
    raw: &[RawShift],
    roster: &Roster,
    periods: &[Period],
    teams: VenuePair<u32>,
) -> Vec<Shift> {
    let mut shifts = Vec::with_capacity(raw.len());
    for sh in raw {
        if !roster.contains(sh.player_id) {
            debug!("Dropping shift for player {} who is not on the roster", sh.player_id);
            continue;
        }
        let venue = if sh.team_id == teams.away {
            Venue::Away
        } else if sh.team_id == teams.home {
            Venue::Home
        } else {
            warn!(
                "Dropping shift for player {} with unknown team {} (period {})",
                sh.player_id, sh.team_id, sh.period
            );
            continue;
        };
        match periods.iter().find(|p| p.number == sh.period) {
            Some(p) if !p.is_shootout() => {}
            Some(_) => continue,
            None => {
                debug!("Dropping shift in unplayed period {}", sh.period);
                continue;
            }
        }
        let start = sh.start_time.as_deref().and_then(parse_clock);
        let end = sh.end_time.as_deref().and_then(parse_clock);
        let (Some(start), Some(end)) = (start, end) else {
            continue;
        };
        if start >= end {
            continue;
        }
        shifts.push(Shift {
            player: sh.player_id,
            team: sh.team_id,
            venue,
            period: sh.period,
            start,
            end,
        });
    }
    shifts
}

#[derive(Debug, Clone)]
pub struct PeriodTimeline {
    pub period: u8,
    pub duration: u32,
    /// `intervals[t]` covers [t, t + 1).
    pub intervals: Vec<Interval>,
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    periods: Vec<PeriodTimeline>,
}

impl Timeline {
    /// Build and label every interval of every non-shootout period.
    pub fn build(
        periods: &[Period],
        shifts: &[Shift],
        roster: &Roster,
        events: &[NormalizedEvent],
    ) -> Self {
        let mut timeline = Timeline {
            periods: periods
                .iter()
                .filter(|p| !p.is_shootout())
                .map(|p| PeriodTimeline {
                    period: p.number,
                    duration: p.duration,
                    intervals: (0..p.duration)
                        .map(|t| Interval {
                            period: p.number,
                            start: t,
                            end: t + 1,
                            on_ice: OnIce::default(),
                            score: VenuePair::default(),
                            strength_sits: VenuePair::new(StrengthSit::Other, StrengthSit::Other),
                            score_sits: score_sits(VenuePair::default()),
                        })
                        .collect(),
                })
                .collect(),
        };

        timeline.add_shifts(shifts, roster);
        timeline.add_goals(events);
        timeline.label();
        timeline
    }

    fn add_shifts(&mut self, shifts: &[Shift], roster: &Roster) {
        for sh in shifts {
            let goalie = roster.get(sh.player).is_some_and(|p| p.is_goalie());
            let Some(pt) = self.periods.iter_mut().find(|pt| pt.period == sh.period) else {
                continue;
            };
            let end = sh.end.min(pt.duration) as usize;
            let start = (sh.start as usize).min(end);
            for interval in &mut pt.intervals[start..end] {
                interval.on_ice.insert(sh.venue, sh.player, goalie);
            }
        }
    }

    /// A goal at second t counts from [t, t + 1) onward, including all later
    /// periods. A goal at the final second of a period changes nothing in it.
    fn add_goals(&mut self, events: &[NormalizedEvent]) {
        let goals = events
            .iter()
            .filter(|ev| ev.kind == "goal" && !ev.is_shootout());
        for goal in goals {
            let Some(venue) = goal.venue else {
                debug!("Goal {} has no team; score not updated", goal.id);
                continue;
            };
            for pt in &mut self.periods {
                let from = if pt.period > goal.period {
                    0
                } else if pt.period == goal.period {
                    goal.time as usize
                } else {
                    continue;
                };
                for interval in pt.intervals.iter_mut().skip(from) {
                    interval.score[venue] += 1;
                }
            }
        }
    }

    fn label(&mut self) {
        for interval in self.periods.iter_mut().flat_map(|pt| pt.intervals.iter_mut()) {
            interval.score_sits = score_sits(interval.score);
            interval.strength_sits = strength_sits(
                interval.on_ice.goalies.as_ref().map(Vec::len),
                interval.on_ice.skaters.as_ref().map(Vec::len),
            );
        }
    }

    pub fn periods(&self) -> &[PeriodTimeline] {
        &self.periods
    }

    pub fn intervals(&self) -> impl Iterator<Item = &Interval> {
        self.periods.iter().flat_map(|pt| pt.intervals.iter())
    }

    pub fn period(&self, number: u8) -> Option<&PeriodTimeline> {
        self.periods.iter().find(|pt| pt.period == number)
    }

    pub fn starting_at(&self, period: u8, t: u32) -> Option<&Interval> {
        self.period(period)?.intervals.get(t as usize)
    }

    pub fn ending_at(&self, period: u8, t: u32) -> Option<&Interval> {
        let index = (t as usize).checked_sub(1)?;
        self.period(period)?.intervals.get(index)
    }

    /// The interval whose situation an event happened in.
    ///
    /// An event at second t normally belongs to [t - 1, t): it happened at the
    /// end of that second. Faceoffs and period-opening events start the play
    /// that follows, so they belong to [t, t + 1). Period-closing events can
    /// only belong to the final interval.
    pub fn interval_for(&self, ev: &NormalizedEvent) -> Result<&Interval, EngineError> {
        let missing = || EngineError::MissingInterval {
            event_id: ev.id,
            period: ev.period,
            time: ev.time,
        };
        let pt = self.period(ev.period).ok_or_else(missing)?;

        let interval = if ev.time == 0 {
            self.starting_at(ev.period, 0)
        } else if ev.time == pt.duration {
            self.ending_at(ev.period, ev.time)
        } else if ev.kind == "faceoff" {
            self.starting_at(ev.period, ev.time)
        } else {
            self.ending_at(ev.period, ev.time)
        };
        interval.ok_or_else(missing)
    }
}

/// Copy on-ice personnel and strength labels onto every non-shootout event.
pub fn attach_situations(
    events: &mut [NormalizedEvent],
    timeline: &Timeline,
) -> Result<(), EngineError> {
    for ev in events.iter_mut().filter(|ev| !ev.is_shootout()) {
        let interval = timeline.interval_for(ev)?;
        ev.on_ice = Some(interval.on_ice.clone());
        ev.strength_sits = Some(if ev.is_pen_shot {
            VenuePair::new(StrengthSit::PenShot, StrengthSit::PenShot)
        } else {
            interval.strength_sits
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::normalize_events;
    use crate::engine::fixtures::{play, roster_player, Play, AWAY, HOME};
    use crate::engine::periods::PeriodType;
    use crate::engine::raw::RawPlay;

    fn regular(number: u8, duration: u32) -> Period {
        Period {
            number,
            duration,
            period_type: PeriodType::Regular,
            home_def_neg: Some(true),
        }
    }

    fn normalize(plays: Vec<Play>) -> Vec<NormalizedEvent> {
        let raw: Vec<RawPlay> = plays.into_iter().map(Play::into_raw).collect();
        normalize_events(&raw, VenuePair::new(AWAY, HOME)).unwrap()
    }

    fn shift(player: u32, venue: Venue, period: u8, start: u32, end: u32) -> Shift {
        Shift {
            player,
            team: if venue == Venue::Away { AWAY } else { HOME },
            venue,
            period,
            start,
            end,
        }
    }

    /// Five skaters and a goalie per side for the whole period.
    fn full_strength(period: u8, duration: u32) -> (Roster, Vec<Shift>) {
        let mut players = Vec::new();
        let mut shifts = Vec::new();
        for venue in Venue::BOTH {
            let base = if venue == Venue::Away { 100 } else { 200 };
            players.push(roster_player(base, venue, "g"));
            shifts.push(shift(base, venue, period, 0, duration));
            for i in 1..=5 {
                players.push(roster_player(base + i, venue, "c"));
                shifts.push(shift(base + i, venue, period, 0, duration));
            }
        }
        (Roster::from_players(players), shifts)
    }

    #[test]
    fn test_intervals_cover_period_exactly() {
        let periods = vec![regular(1, 1200), regular(2, 1200), regular(4, 300)];
        let timeline = Timeline::build(&periods, &[], &Roster::default(), &[]);
        for (pt, p) in timeline.periods().iter().zip(&periods) {
            assert_eq!(pt.intervals.len() as u32, p.duration);
            let mut expected_start = 0;
            for interval in &pt.intervals {
                assert_eq!(interval.start, expected_start);
                assert_eq!(interval.end, interval.start + 1);
                expected_start = interval.end;
            }
            assert_eq!(expected_start, p.duration);
        }
    }

    #[test]
    fn test_shootout_has_no_intervals() {
        let mut so = regular(5, 0);
        so.period_type = PeriodType::Shootout;
        let timeline = Timeline::build(&[regular(1, 60), so], &[], &Roster::default(), &[]);
        assert!(timeline.period(5).is_none());
        assert_eq!(timeline.intervals().count(), 60);
    }

    #[test]
    fn test_overlapping_shifts_counted_once() {
        let roster = Roster::from_players(vec![roster_player(7, Venue::Away, "d")]);
        let shifts = vec![
            shift(7, Venue::Away, 1, 10, 40),
            shift(7, Venue::Away, 1, 30, 50),
        ];
        let timeline = Timeline::build(&[regular(1, 60)], &shifts, &roster, &[]);
        let at = |t| timeline.starting_at(1, t).unwrap();
        assert!(at(9).on_ice.skaters.away.is_empty());
        assert_eq!(at(10).on_ice.skaters.away, vec![7]);
        assert_eq!(at(35).on_ice.skaters.away, vec![7]);
        assert_eq!(at(49).on_ice.skaters.away, vec![7]);
        assert!(at(50).on_ice.skaters.away.is_empty());
    }

    #[test]
    fn test_goalies_and_strength_labels() {
        let (roster, mut shifts) = full_strength(1, 120);
        // home skater 205 sits 30..60
        shifts.retain(|s| s.player != 205);
        shifts.push(shift(205, Venue::Home, 1, 0, 30));
        shifts.push(shift(205, Venue::Home, 1, 60, 120));
        // away pulls its goalie for the last 20 seconds
        shifts.retain(|s| s.player != 100);
        shifts.push(shift(100, Venue::Away, 1, 0, 100));

        let timeline = Timeline::build(&[regular(1, 120)], &shifts, &roster, &[]);
        let at = |t| timeline.starting_at(1, t).unwrap();
        assert_eq!(at(0).strength_sits, VenuePair::new(StrengthSit::Ev5, StrengthSit::Ev5));
        assert_eq!(at(0).on_ice.goalies.home, vec![200]);
        assert_eq!(at(45).strength_sits, VenuePair::new(StrengthSit::Pp54, StrengthSit::Sh45));
        assert_eq!(at(110).strength_sits, VenuePair::new(StrengthSit::NoOwnG, StrengthSit::NoOppG));
    }

    #[test]
    fn test_goal_at_second_zero_and_last_second() {
        let evs = normalize(vec![
            play(1, "00:00", "GOAL").team(AWAY).score(1, 0),
            play(1, "01:00", "GOAL").team(HOME).score(1, 1),
        ]);
        let periods = vec![regular(1, 60), regular(2, 60)];
        let timeline = Timeline::build(&periods, &[], &Roster::default(), &evs);

        // the goal at 0:00 counts from [0, 1)
        assert_eq!(timeline.starting_at(1, 0).unwrap().score, VenuePair::new(1, 0));
        // the goal at the final second leaves period 1 untouched
        assert_eq!(timeline.starting_at(1, 59).unwrap().score, VenuePair::new(1, 0));
        // but carries into period 2
        assert_eq!(timeline.starting_at(2, 0).unwrap().score, VenuePair::new(1, 1));
        assert_eq!(timeline.starting_at(2, 0).unwrap().score_sits.home.value(), 0);
    }

    #[test]
    fn test_interval_attribution_rules() {
        let evs = normalize(vec![
            play(1, "00:00", "PERIOD_START"),
            play(1, "00:05", "FACEOFF").team(AWAY),
            play(1, "00:05", "SHOT").team(AWAY),
            play(1, "01:00", "PERIOD_END"),
            play(1, "01:00", "FACEOFF").team(AWAY),
        ]);
        let timeline = Timeline::build(&[regular(1, 60)], &[], &Roster::default(), &[]);
        let start_of = |i: usize| timeline.interval_for(&evs[i]).unwrap().start;
        assert_eq!(start_of(0), 0);
        assert_eq!(start_of(1), 5);
        assert_eq!(start_of(2), 4);
        assert_eq!(start_of(3), 59);
        assert_eq!(start_of(4), 59);
    }

    #[test]
    fn test_event_without_interval_is_fatal() {
        let evs = normalize(vec![
            play(1, "01:30", "SHOT").team(AWAY),
            play(3, "00:10", "SHOT").team(AWAY),
        ]);
        let timeline = Timeline::build(&[regular(1, 60)], &[], &Roster::default(), &[]);
        assert!(matches!(
            timeline.interval_for(&evs[0]),
            Err(EngineError::MissingInterval { time: 90, .. })
        ));
        assert!(matches!(
            timeline.interval_for(&evs[1]),
            Err(EngineError::MissingInterval { period: 3, .. })
        ));
    }

    #[test]
    fn test_pen_shot_strength() {
        let mut evs = normalize(vec![
            play(1, "00:20", "PENALTY").team(AWAY).severity("Penalty Shot"),
            play(1, "00:30", "SHOT").team(HOME),
        ]);
        let (roster, shifts) = full_strength(1, 60);
        let timeline = Timeline::build(&[regular(1, 60)], &shifts, &roster, &evs);
        attach_situations(&mut evs, &timeline).unwrap();
        assert_eq!(evs[0].strength_sits.unwrap().away, StrengthSit::Ev5);
        assert_eq!(evs[1].strength_sits.unwrap(), VenuePair::new(StrengthSit::PenShot, StrengthSit::PenShot));
        assert_eq!(evs[1].on_ice.as_ref().unwrap().skaters.home.len(), 5);
    }

    #[test]
    fn test_collect_shifts_filters() {
        let roster = Roster::from_players(vec![roster_player(7, Venue::Away, "d")]);
        let mut so = regular(5, 0);
        so.period_type = PeriodType::Shootout;
        let periods = vec![regular(1, 1200), so];
        let raw = |player, period, start: &str, end: &str| RawShift {
            player_id: player,
            team_id: AWAY,
            period,
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
        };
        let shifts = collect_shifts(
            &[
                raw(7, 1, "00:00", "00:40"),
                raw(7, 1, "00:40", "00:40"),
                raw(7, 1, "01:00", "00:50"),
                raw(8, 1, "00:00", "00:40"),
                raw(7, 5, "00:00", "00:10"),
                raw(7, 2, "00:00", "00:10"),
            ],
            &roster,
            &periods,
            VenuePair::new(AWAY, HOME),
        );
        assert_eq!(shifts.len(), 1);
        assert_eq!((shifts[0].start, shifts[0].end), (0, 40));
    }

    #[test]
    fn test_shift_for_unknown_team_is_dropped() {
        let roster = Roster::from_players(vec![roster_player(7, Venue::Away, "d")]);
        let periods = vec![regular(1, 1200)];
        let raw = |team_id| RawShift {
            player_id: 7,
            team_id,
            period: 1,
            start_time: Some("00:00".to_string()),
            end_time: Some("00:40".to_string()),
        };
        let shifts = collect_shifts(&[raw(99), raw(AWAY)], &roster, &periods, VenuePair::new(AWAY, HOME));
        assert_eq!(shifts.len(), 1);
        assert_eq!(shifts[0].venue, Venue::Away);
    }
}
