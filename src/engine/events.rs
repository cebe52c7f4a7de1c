//! Event normalization: the raw play list becomes a canonical event sequence
//! with venue attribution, pre-goal score and penalty metadata.

use tracing::debug;

use super::periods::PeriodType;
use super::raw::{parse_clock, RawPlay};
use super::situation::{score_sits, ScoreSit, StrengthSit, Venue, VenuePair, Zone};
use super::timeline::OnIce;
use super::SkipReason;

pub const SHOT_TYPES: [&str; 4] = ["goal", "shot", "missed_shot", "blocked_shot"];

/// A player referenced by an event together with what they did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRole {
    pub player: u32,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Penalty {
    pub severity: String,
    pub minutes: Option<u16>,
    /// Whether the penalty gave the drawing team a real on-ice advantage.
    pub is_effective: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub id: u32,
    pub period: u8,
    pub period_type: PeriodType,
    /// Seconds elapsed in the period.
    pub time: u32,
    pub description: String,
    /// Lower-cased event type id, e.g. "blocked_shot".
    pub kind: String,
    pub subtype: String,
    pub penalty: Option<Penalty>,
    pub location: Option<Location>,
    pub team: Option<u32>,
    pub venue: Option<Venue>,
    pub roles: Vec<EventRole>,
    /// Score before the event; a goal does not count towards its own score.
    pub score: VenuePair<u16>,
    pub score_sits: Option<VenuePair<ScoreSit>>,
    pub is_pen_shot: bool,

    // Filled in by the orientation resolver and the timeline.
    pub zones: Option<VenuePair<Zone>>,
    pub def_sides: Option<VenuePair<i8>>,
    pub strength_sits: Option<VenuePair<StrengthSit>>,
    pub on_ice: Option<OnIce>,
}

impl NormalizedEvent {
    pub fn is_shootout(&self) -> bool {
        self.period_type == PeriodType::Shootout
    }

    pub fn is_shot_attempt(&self) -> bool {
        SHOT_TYPES.contains(&self.kind.as_str())
    }

    pub fn is_icing(&self) -> bool {
        self.kind == "stop" && self.description.eq_ignore_ascii_case("icing")
    }

    pub fn player_with_role(&self, role: &str) -> Option<u32> {
        self.roles.iter().find(|r| r.role == role).map(|r| r.player)
    }
}

/// Build normalized events from the raw play list.
///
/// `teams` holds the (away, home) team ids.
pub fn normalize_events(
    plays: &[RawPlay],
    teams: VenuePair<u32>,
) -> Result<Vec<NormalizedEvent>, SkipReason> {
    let mut events = plays
        .iter()
        .map(|play| normalize_play(play, teams))
        .collect::<Result<Vec<_>, _>>()?;

    flag_penalty_shots(&mut events);
    flag_effective_penalties(&mut events);
    Ok(events)
}

fn normalize_play(play: &RawPlay, teams: VenuePair<u32>) -> Result<NormalizedEvent, SkipReason> {
    let about = &play.about;
    let time = parse_clock(&about.period_time).ok_or_else(|| {
        SkipReason::Malformed(format!(
            "event {} has unreadable clock '{}'",
            about.event_idx, about.period_time
        ))
    })?;
    let period_type = PeriodType::parse(&about.period_type).ok_or_else(|| {
        SkipReason::Malformed(format!("unknown period type '{}'", about.period_type))
    })?;
    let kind = play.result.event_type_id.to_lowercase();

    let penalty = (kind == "penalty").then(|| Penalty {
        severity: play
            .result
            .penalty_severity
            .as_deref()
            .unwrap_or_default()
            .to_lowercase(),
        minutes: play.result.penalty_minutes,
        is_effective: true,
    });

    let location = play.coordinates.as_ref().and_then(|c| match (c.x, c.y) {
        (Some(x), Some(y)) => Some(Location { x, y }),
        _ => None,
    });

    let roles = play
        .players
        .as_deref()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, p)| EventRole {
            player: p.player.id,
            role: canonical_role(&kind, &p.player_type, i),
        })
        .collect();

    let (team, venue) = match play.team.as_ref().map(|t| t.id) {
        Some(id) => attribute_team(&kind, id, teams),
        None => (None, None),
    };

    // The running score already includes a non-shootout goal; report the
    // score the goal was scored at. Shootout goals never reach the running
    // score in the feed.
    let mut score = VenuePair::new(about.goals.away, about.goals.home);
    if period_type != PeriodType::Shootout && kind == "goal" {
        if let Some(v) = venue {
            score[v] = score[v].saturating_sub(1);
        }
    }
    let score_sits = (period_type != PeriodType::Shootout).then(|| score_sits(score));

    Ok(NormalizedEvent {
        id: about.event_idx,
        period: about.period,
        period_type,
        time,
        description: play.result.description.clone(),
        subtype: play
            .result
            .secondary_type
            .as_deref()
            .unwrap_or_default()
            .to_lowercase(),
        kind,
        penalty,
        location,
        team,
        venue,
        roles,
        score,
        score_sits,
        is_pen_shot: false,
        zones: None,
        def_sides: None,
        strength_sits: None,
        on_ice: None,
    })
}

/// Resolve the team and venue an event is credited to. Blocked shots arrive
/// credited to the blocking team and are moved to the shooting team.
fn attribute_team(kind: &str, team_id: u32, teams: VenuePair<u32>) -> (Option<u32>, Option<Venue>) {
    let venue = if team_id == teams.away {
        Venue::Away
    } else if team_id == teams.home {
        Venue::Home
    } else {
        debug!("Event credited to team {} which is not playing", team_id);
        return (Some(team_id), None);
    };

    if kind == "blocked_shot" {
        let shooter = venue.opponent();
        (Some(teams[shooter]), Some(shooter))
    } else {
        (Some(team_id), Some(venue))
    }
}

/// Goals list assisters as plain "assist" in order after the scorer; number
/// them by position. Giveaways and takeaways only name the player.
fn canonical_role(kind: &str, player_type: &str, position: usize) -> String {
    let role = player_type.to_lowercase();
    match (kind, role.as_str()) {
        ("goal", "assist") => format!("assist{}", position),
        ("giveaway", "playerid") => "giver".to_string(),
        ("takeaway", "playerid") => "taker".to_string(),
        _ => role,
    }
}

/// A "penalty shot" penalty flags the next shot attempt as the penalty shot.
fn flag_penalty_shots(events: &mut [NormalizedEvent]) {
    let mut pending = false;
    for ev in events.iter_mut() {
        let is_pen_shot_call = ev
            .penalty
            .as_ref()
            .is_some_and(|p| p.severity == "penalty shot");
        if is_pen_shot_call {
            pending = true;
        } else if pending && ev.is_shot_attempt() {
            pending = false;
            ev.is_pen_shot = true;
        }
    }
}

/// Coincidental penalties and misconducts do not change the on-ice manpower,
/// so they are not effective.
fn flag_effective_penalties(events: &mut [NormalizedEvent]) {
    // (period, time, severity, penalized player) for every penalty
    let taken: Vec<(u8, u32, String, Option<u32>)> = events
        .iter()
        .filter_map(|ev| {
            ev.penalty.as_ref().map(|p| {
                (ev.period, ev.time, p.severity.clone(), ev.player_with_role("penaltyon"))
            })
        })
        .collect();

    for ev in events.iter_mut() {
        let drew_by = ev.player_with_role("drewby");
        let (period, time) = (ev.period, ev.time);
        let Some(penalty) = ev.penalty.as_mut() else {
            continue;
        };

        let coincidental = drew_by.is_some_and(|drew_by| {
            taken.iter().any(|(p, t, severity, offender)| {
                *p == period && *t == time && *severity == penalty.severity && *offender == Some(drew_by)
            })
        });
        if coincidental || penalty.severity.contains("misconduct") {
            penalty.is_effective = false;
        }
    }
}

/// Credit each icing stoppage to the team whose defensive zone hosts the
/// next faceoff. Requires zones to be resolved.
pub fn attribute_icings(events: &mut [NormalizedEvent], teams: VenuePair<u32>) {
    let mut pending: Option<usize> = None;
    for i in 0..events.len() {
        if events[i].is_icing() {
            pending = Some(i);
        } else if events[i].kind == "faceoff" {
            let Some(icing) = pending.take() else {
                continue;
            };
            match events[i].zones {
                Some(zones) => {
                    let offender = if zones.away == Zone::Defensive {
                        Venue::Away
                    } else {
                        Venue::Home
                    };
                    events[icing].venue = Some(offender);
                    events[icing].team = Some(teams[offender]);
                }
                None => debug!(
                    "Icing event {} left unattributed: faceoff {} has no location",
                    events[icing].id, events[i].id
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{play, Play, AWAY, HOME};

    fn normalize(plays: Vec<Play>) -> Vec<NormalizedEvent> {
        let raw: Vec<RawPlay> = plays.into_iter().map(Play::into_raw).collect();
        normalize_events(&raw, VenuePair::new(AWAY, HOME)).unwrap()
    }

    #[test]
    fn test_clock_and_lowercase() {
        let evs = normalize(vec![play(1, "03:25", "SHOT").team(AWAY).subtype("Wrist Shot")]);
        assert_eq!(evs[0].time, 205);
        assert_eq!(evs[0].kind, "shot");
        assert_eq!(evs[0].subtype, "wrist shot");
        assert_eq!(evs[0].venue, Some(Venue::Away));
    }

    #[test]
    fn test_blocked_shot_credited_to_shooter() {
        // The feed credits the home team, whose player blocked an away shot.
        let evs = normalize(vec![play(1, "10:00", "BLOCKED_SHOT")
            .team(HOME)
            .role(11, "Blocker")
            .role(21, "Shooter")]);
        assert_eq!(evs[0].team, Some(AWAY));
        assert_eq!(evs[0].venue, Some(Venue::Away));
    }

    #[test]
    fn test_goal_score_excludes_itself() {
        let evs = normalize(vec![
            play(1, "05:00", "GOAL").team(HOME).score(0, 1),
            play(1, "06:00", "SHOT").team(AWAY).score(0, 1),
        ]);
        assert_eq!(evs[0].score, VenuePair::new(0, 0));
        assert_eq!(evs[0].score_sits.unwrap().home.value(), 0);
        assert_eq!(evs[1].score, VenuePair::new(0, 1));
        assert_eq!(evs[1].score_sits.unwrap().away.value(), -1);
    }

    #[test]
    fn test_shootout_goal_keeps_running_score_and_has_no_score_sits() {
        let evs = normalize(vec![play(5, "00:00", "GOAL")
            .period_type("SHOOTOUT")
            .team(AWAY)
            .score(2, 2)]);
        assert_eq!(evs[0].score, VenuePair::new(2, 2));
        assert!(evs[0].score_sits.is_none());
    }

    #[test]
    fn test_assist_and_turnover_roles() {
        let evs = normalize(vec![
            play(1, "05:00", "GOAL")
                .team(HOME)
                .role(1, "Scorer")
                .role(2, "Assist")
                .role(3, "Assist")
                .role(4, "Goalie"),
            play(1, "06:00", "GIVEAWAY").team(HOME).role(5, "PlayerID"),
            play(1, "07:00", "TAKEAWAY").team(AWAY).role(6, "PlayerID"),
        ]);
        let roles: Vec<&str> = evs[0].roles.iter().map(|r| r.role.as_str()).collect();
        assert_eq!(roles, vec!["scorer", "assist1", "assist2", "goalie"]);
        assert_eq!(evs[1].roles[0].role, "giver");
        assert_eq!(evs[2].roles[0].role, "taker");
    }

    #[test]
    fn test_penalty_shot_flags_next_attempt_only() {
        let evs = normalize(vec![
            play(2, "04:00", "PENALTY").team(AWAY).severity("Penalty Shot"),
            play(2, "04:00", "FACEOFF").team(AWAY),
            play(2, "04:30", "MISSED_SHOT").team(HOME),
            play(2, "05:00", "SHOT").team(HOME),
        ]);
        assert!(!evs[1].is_pen_shot);
        assert!(evs[2].is_pen_shot);
        assert!(!evs[3].is_pen_shot);
    }

    #[test]
    fn test_coincidental_penalties_are_ineffective() {
        let evs = normalize(vec![
            play(1, "08:00", "PENALTY")
                .team(AWAY)
                .severity("Major")
                .role(10, "PenaltyOn")
                .role(20, "DrewBy"),
            play(1, "08:00", "PENALTY")
                .team(HOME)
                .severity("Major")
                .role(20, "PenaltyOn")
                .role(10, "DrewBy"),
            play(1, "09:00", "PENALTY")
                .team(HOME)
                .severity("Minor")
                .role(21, "PenaltyOn")
                .role(11, "DrewBy"),
        ]);
        assert!(!evs[0].penalty.as_ref().unwrap().is_effective);
        assert!(!evs[1].penalty.as_ref().unwrap().is_effective);
        assert!(evs[2].penalty.as_ref().unwrap().is_effective);
    }

    #[test]
    fn test_unequal_severity_is_not_coincidental() {
        let evs = normalize(vec![
            play(1, "08:00", "PENALTY")
                .team(AWAY)
                .severity("Major")
                .role(10, "PenaltyOn")
                .role(20, "DrewBy"),
            play(1, "08:00", "PENALTY")
                .team(HOME)
                .severity("Minor")
                .role(20, "PenaltyOn")
                .role(10, "DrewBy"),
        ]);
        assert!(evs[0].penalty.as_ref().unwrap().is_effective);
        assert!(evs[1].penalty.as_ref().unwrap().is_effective);
    }

    #[test]
    fn test_misconduct_is_ineffective() {
        let evs = normalize(vec![play(3, "15:00", "PENALTY")
            .team(HOME)
            .severity("Game Misconduct")
            .role(21, "PenaltyOn")]);
        assert!(!evs[0].penalty.as_ref().unwrap().is_effective);
    }

    #[test]
    fn test_unreadable_clock_is_malformed() {
        let raw = vec![play(1, "bad", "SHOT").into_raw()];
        let err = normalize_events(&raw, VenuePair::new(AWAY, HOME)).unwrap_err();
        assert!(matches!(err, SkipReason::Malformed(_)));
    }

    #[test]
    fn test_icing_attributed_from_next_faceoff_zone() {
        let mut evs = normalize(vec![
            play(1, "02:00", "STOP").description("Icing"),
            play(1, "02:00", "FACEOFF").team(HOME).at(-69.0, 22.0),
        ]);
        evs[1].zones = Some(VenuePair::new(Zone::Defensive, Zone::Offensive));
        attribute_icings(&mut evs, VenuePair::new(AWAY, HOME));
        assert_eq!(evs[0].venue, Some(Venue::Away));
        assert_eq!(evs[0].team, Some(AWAY));
    }
}
