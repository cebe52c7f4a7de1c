//! Run-length compression of the timeline into situation ranges.

use std::collections::BTreeMap;

use super::situation::{ScoreSit, StrengthSit, Venue};
use super::timeline::Timeline;

/// Half-open [start, end) second range within a period.
pub type Range = (u32, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SituationKey {
    pub venue: Venue,
    pub strength: StrengthSit,
    pub score: ScoreSit,
    pub period: u8,
}

/// Maximal ranges per (venue, strength, score, period). Only situations that
/// actually occurred are present.
pub type SituationRanges = BTreeMap<SituationKey, Vec<Range>>;

/// Append `[start, end)` to `ranges`, merging it into the last range when
/// they touch.
fn push_range(ranges: &mut Vec<Range>, start: u32, end: u32) {
    match ranges.last_mut() {
        Some(last) if last.1 == start => last.1 = end,
        _ => ranges.push((start, end)),
    }
}

pub fn compress(timeline: &Timeline) -> SituationRanges {
    let mut out = SituationRanges::new();
    // Intervals within a period are already ordered by start.
    for interval in timeline.intervals() {
        for venue in Venue::BOTH {
            let key = SituationKey {
                venue,
                strength: interval.strength_sits[venue],
                score: interval.score_sits[venue],
                period: interval.period,
            };
            push_range(out.entry(key).or_default(), interval.start, interval.end);
        }
    }
    out
}

/// Inverse of [`compress`] for one key: every second covered by `ranges`.
#[cfg(test)]
pub fn expand(ranges: &[Range]) -> impl Iterator<Item = u32> + '_ {
    ranges.iter().flat_map(|&(start, end)| start..end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::roster_player;
    use crate::engine::periods::{Period, PeriodType};
    use crate::engine::roster::Roster;
    use crate::engine::timeline::Shift;

    fn period(number: u8, duration: u32) -> Period {
        Period {
            number,
            duration,
            period_type: PeriodType::Regular,
            home_def_neg: Some(false),
        }
    }

    #[test]
    fn test_push_range_merges_adjacent() {
        let mut ranges = Vec::new();
        push_range(&mut ranges, 0, 1);
        push_range(&mut ranges, 1, 2);
        push_range(&mut ranges, 5, 6);
        push_range(&mut ranges, 6, 7);
        push_range(&mut ranges, 9, 10);
        assert_eq!(ranges, vec![(0, 2), (5, 7), (9, 10)]);
    }

    #[test]
    fn test_last_interval_is_kept() {
        let timeline = Timeline::build(&[period(1, 30)], &[], &Roster::default(), &[]);
        let ranges = compress(&timeline);
        assert_eq!(ranges.len(), 2);
        for r in ranges.values() {
            assert_eq!(r, &vec![(0, 30)]);
        }
    }

    #[test]
    fn test_round_trip_covers_every_interval_once() {
        // Away goalie is pulled 10..20 and 40..50.
        let roster = Roster::from_players(vec![
            roster_player(1, Venue::Away, "g"),
            roster_player(2, Venue::Home, "g"),
        ]);
        let shift = |player, venue, period, start, end| Shift {
            player,
            team: player,
            venue,
            period,
            start,
            end,
        };
        let shifts = vec![
            shift(1, Venue::Away, 1, 0, 10),
            shift(1, Venue::Away, 1, 20, 40),
            shift(1, Venue::Away, 1, 50, 60),
            shift(2, Venue::Home, 1, 0, 60),
            shift(2, Venue::Home, 2, 0, 60),
        ];
        let periods = [period(1, 60), period(2, 60)];
        let timeline = Timeline::build(&periods, &shifts, &roster, &[]);
        let ranges = compress(&timeline);

        let no_own = SituationKey {
            venue: Venue::Away,
            strength: StrengthSit::NoOwnG,
            score: ScoreSit::from_diff(0),
            period: 1,
        };
        assert_eq!(ranges[&no_own], vec![(10, 20), (40, 50)]);

        for venue in Venue::BOTH {
            for p in &periods {
                let mut seconds: Vec<u32> = ranges
                    .iter()
                    .filter(|(k, _)| k.venue == venue && k.period == p.number)
                    .flat_map(|(_, r)| expand(r))
                    .collect();
                seconds.sort_unstable();
                assert_eq!(seconds, (0..p.duration).collect::<Vec<_>>());
            }
        }
    }
}
