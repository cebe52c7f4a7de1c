//! Period list and rink orientation.
//!
//! The feed never states which end of the rink each team defends, so it is
//! inferred per period from where the busier shooting team's shots came from.
//! Known-bad periods are corrected from the override configuration.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::events::NormalizedEvent;
use super::situation::{def_sides, zones_at, Venue};
use super::EngineError;
use crate::overrides::{GameOverride, PeriodFix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Regular,
    Overtime,
    Shootout,
}

impl PeriodType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "regular" => Some(PeriodType::Regular),
            "overtime" => Some(PeriodType::Overtime),
            "shootout" => Some(PeriodType::Shootout),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodType::Regular => "regular",
            PeriodType::Overtime => "overtime",
            PeriodType::Shootout => "shootout",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub number: u8,
    /// Length in seconds.
    pub duration: u32,
    pub period_type: PeriodType,
    /// Whether the home team's defensive half has negative x coordinates.
    /// Always `None` for shootouts.
    pub home_def_neg: Option<bool>,
}

impl Period {
    pub fn is_shootout(&self) -> bool {
        self.period_type == PeriodType::Shootout
    }
}

/// Build the sorted period list from `period_end` markers, then apply any
/// duration fixes. Only the first marker of a period counts; some games list
/// the same period end twice.
pub fn build_periods(events: &[NormalizedEvent], fixes: &[PeriodFix]) -> Vec<Period> {
    let mut periods: BTreeMap<u8, Period> = BTreeMap::new();
    for ev in events.iter().filter(|ev| ev.kind == "period_end") {
        if periods.contains_key(&ev.period) {
            debug!("Ignoring duplicate period_end marker for period {}", ev.period);
            continue;
        }
        periods.insert(
            ev.period,
            Period {
                number: ev.period,
                duration: ev.time,
                period_type: ev.period_type,
                home_def_neg: None,
            },
        );
    }

    for fix in fixes {
        periods
            .entry(fix.period)
            .and_modify(|p| p.duration = fix.duration)
            .or_insert_with(|| Period {
                number: fix.period,
                duration: fix.duration,
                period_type: fix.period_type,
                home_def_neg: None,
            });
    }

    periods.into_values().collect()
}

/// Automatic orientation for one period's shot attempts.
///
/// Uses the venue with more attempts (ties go to whichever venue is examined
/// first, away). Returns `None` when the period has no attempts to judge by.
pub fn home_defends_negative<'a>(
    shots: impl IntoIterator<Item = &'a NormalizedEvent>,
) -> Option<bool> {
    let mut by_venue: [Vec<&NormalizedEvent>; 2] = [Vec::new(), Vec::new()];
    for shot in shots {
        match shot.venue {
            Some(Venue::Away) => by_venue[0].push(shot),
            Some(Venue::Home) => by_venue[1].push(shot),
            None => {}
        }
    }

    let (venue, busier) = if by_venue[1].len() > by_venue[0].len() {
        (Venue::Home, &by_venue[1])
    } else {
        (Venue::Away, &by_venue[0])
    };
    if busier.is_empty() {
        return None;
    }

    let pos_minus_neg: i32 = busier
        .iter()
        .filter_map(|ev| ev.location)
        .map(|loc| {
            if loc.x > 0.0 {
                1
            } else if loc.x < 0.0 {
                -1
            } else {
                0
            }
        })
        .sum();

    Some(match venue {
        Venue::Home => pos_minus_neg > 0,
        Venue::Away => pos_minus_neg < 0,
    })
}

/// Set `home_def_neg` on every non-shootout period: heuristic first, then
/// the per-game override table.
pub fn resolve_orientation(
    periods: &mut [Period],
    events: &[NormalizedEvent],
    overrides: Option<&GameOverride>,
) {
    for period in periods.iter_mut().filter(|p| !p.is_shootout()) {
        let shots = events
            .iter()
            .filter(|ev| ev.period == period.number && ev.is_shot_attempt());
        let detected = home_defends_negative(shots);

        let forced = overrides.and_then(|o| o.orientation.get(&period.number).copied());
        period.home_def_neg = match (forced, detected) {
            (Some(flag), _) => {
                debug!("Orientation of period {} forced to home_def_neg={}", period.number, flag);
                Some(flag)
            }
            (None, Some(flag)) => Some(flag),
            (None, None) => {
                warn!(
                    "No shot attempts in period {}; assuming home defends positive x",
                    period.number
                );
                Some(false)
            }
        };
    }
}

/// Attach zones and defended sides to every located non-shootout event, then
/// reverse them for the second half of periods where teams switched ends
/// without the feed marking it.
pub fn assign_zones(
    events: &mut [NormalizedEvent],
    periods: &[Period],
    overrides: Option<&GameOverride>,
) -> Result<(), EngineError> {
    for ev in events.iter_mut().filter(|ev| !ev.is_shootout()) {
        let Some(loc) = ev.location else {
            continue;
        };
        let period = periods
            .iter()
            .find(|p| p.number == ev.period)
            .ok_or(EngineError::UnknownPeriod {
                event_id: ev.id,
                period: ev.period,
            })?;
        let home_def_neg = period.home_def_neg.unwrap_or(false);
        ev.zones = Some(zones_at(home_def_neg, loc.x));
        ev.def_sides = Some(def_sides(home_def_neg));
    }

    let Some(overrides) = overrides else {
        return Ok(());
    };
    for &switched in &overrides.switched_ends {
        let Some(period) = periods.iter().find(|p| p.number == switched) else {
            warn!("Switched-ends override names period {} which was not played", switched);
            continue;
        };
        let halfway = f64::from(period.duration) / 2.0;
        for ev in events
            .iter_mut()
            .filter(|ev| ev.period == switched && f64::from(ev.time) > halfway)
        {
            if let Some(zones) = ev.zones.as_mut() {
                zones.reverse();
            }
            if let Some(sides) = ev.def_sides.as_mut() {
                sides.reverse();
            }
        }
    }
    Ok(())
}
