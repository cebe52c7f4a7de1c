//! Skater totals over a date range, read from the per-game situational rows.

use anyhow::Result;
use chrono::Days;
use rusqlite::types::Value;
use rusqlite::params_from_iter;
use std::collections::BTreeMap;

use super::models::{PlayoffFilter, Skater, SkaterQuery};
use super::Database;
use crate::engine::situation::ScoreSit;

/// Shot-attempt weights for the shooting team by its score situation. Teams
/// that trail shoot more, so their attempts count for less.
pub const CF_WEIGHTS: [(i8, f64); 7] = [
    (-3, 0.841),
    (-2, 0.884),
    (-1, 0.932),
    (0, 1.0),
    (1, 1.068),
    (2, 1.116),
    (3, 1.159),
];

pub fn cf_weight(score_sit: ScoreSit) -> f64 {
    CF_WEIGHTS[score_sit.index()].1
}

/// Shots against are weighted by the opponent's score situation.
pub fn ca_weight(score_sit: ScoreSit) -> f64 {
    CF_WEIGHTS[6 - score_sit.index()].1
}

fn weighted_sum(columns: &str, weight: fn(ScoreSit) -> f64) -> String {
    let arms: String = ScoreSit::ALL
        .iter()
        .map(|&s| format!(" WHEN {} THEN {:?} * ({})", s.value(), weight(s), columns))
        .collect();
    format!("SUM(CASE s.score_sit{} END)", arms)
}

/// Game filter shared by both halves of the query. Appends its parameters.
fn game_filter(q: &SkaterQuery, params: &mut Vec<Value>) -> String {
    params.push(Value::Text(q.start.to_string()));
    // game_date is stored as text starting with the date; compare against the
    // day after the inclusive end date
    let end = q.end.checked_add_days(Days::new(1)).unwrap_or(q.end);
    params.push(Value::Text(end.to_string()));
    let mut sql = "g.game_date >= ? AND g.game_date < ?".to_string();
    match q.playoffs {
        PlayoffFilter::Include => {}
        PlayoffFilter::Only => sql.push_str(" AND g.is_playoff = 1"),
        PlayoffFilter::Exclude => sql.push_str(" AND g.is_playoff = 0"),
    }
    sql
}

#[derive(Default)]
struct Appearances {
    positions: Vec<String>,
    teams: Vec<String>,
}

impl Database {
    /// Skater totals for every non-goalie who played in the queried games.
    pub fn skaters(&self, q: &SkaterQuery) -> Result<Vec<Skater>> {
        let conn = self.conn()?;

        // Positions and teams per game, in game order
        let mut params = Vec::new();
        let sql = format!(
            "SELECT gp.player_id, gp.position, t.abbreviation
             FROM game_players gp
             JOIN games g ON g.game_id = gp.game_id
             JOIN teams t ON t.team_id = gp.team_id
             WHERE {}
             ORDER BY g.game_date, g.game_id",
            game_filter(q, &mut params)
        );
        let mut appearances: BTreeMap<u32, Appearances> = BTreeMap::new();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        while let Some(row) = rows.next()? {
            let entry = appearances.entry(row.get(0)?).or_default();
            entry
                .positions
                .push(row.get::<_, Option<String>>(1)?.unwrap_or_else(|| "na".to_string()));
            entry.teams.push(row.get(2)?);
        }

        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT s.player_id, p.first_name, p.last_name,
                SUM(s.toi), SUM(s.ig), SUM(s.isog), SUM(s.isog + s.ibs + s.ims),
                SUM(s.ia1), SUM(s.ia2), SUM(s.i_blocked),
                SUM(s.i_ofo_won + s.i_dfo_won + s.i_nfo_won),
                SUM(s.i_ofo_lost + s.i_dfo_lost + s.i_nfo_lost),
                SUM(s.i_eff_pen_drawn), SUM(s.i_eff_pen_taken),
                SUM(s.gf), SUM(s.ga), SUM(s.sf), SUM(s.sa),
                SUM(s.sf + s.bsf + s.msf), SUM(s.sa + s.bsa + s.msa),
                {}, {},
                SUM(s.i_otf),
                SUM(s.ofo_won + s.ofo_lost), SUM(s.dfo_won + s.dfo_lost), SUM(s.nfo_won + s.nfo_lost)
             FROM game_player_stats s
             JOIN games g ON g.game_id = s.game_id
             JOIN players p ON p.player_id = s.player_id
             WHERE {}",
            weighted_sum("s.sf + s.msf + s.bsf", cf_weight),
            weighted_sum("s.sa + s.msa + s.bsa", ca_weight),
            game_filter(q, &mut params)
        );
        if !q.strength_sits.is_empty() {
            sql.push_str(&format!(" AND s.strength_sit IN ({})", placeholders(q.strength_sits.len())));
            params.extend(q.strength_sits.iter().map(|s| Value::Text(s.as_str().to_string())));
        }
        if !q.score_sits.is_empty() {
            sql.push_str(&format!(" AND s.score_sit IN ({})", placeholders(q.score_sits.len())));
            params.extend(q.score_sits.iter().map(|s| Value::Integer(i64::from(s.value()))));
        }
        sql.push_str(" GROUP BY s.player_id ORDER BY s.player_id");

        let mut stmt = conn.prepare(&sql)?;
        let skaters = stmt
            .query_map(params_from_iter(params), |row| {
                Ok(Skater {
                    player_id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    position: String::new(),
                    positions: Vec::new(),
                    teams: Vec::new(),
                    gp: 0,
                    toi: row.get(3)?,
                    ig: row.get(4)?,
                    isog: row.get(5)?,
                    ic: row.get(6)?,
                    ia1: row.get(7)?,
                    ia2: row.get(8)?,
                    i_blocked: row.get(9)?,
                    i_fo_won: row.get(10)?,
                    i_fo_lost: row.get(11)?,
                    i_eff_pen_drawn: row.get(12)?,
                    i_eff_pen_taken: row.get(13)?,
                    gf: row.get(14)?,
                    ga: row.get(15)?,
                    sf: row.get(16)?,
                    sa: row.get(17)?,
                    cf: row.get(18)?,
                    ca: row.get(19)?,
                    adj_cf: row.get(20)?,
                    adj_ca: row.get(21)?,
                    otf: row.get(22)?,
                    ofo: row.get(23)?,
                    dfo: row.get(24)?,
                    nfo: row.get(25)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(skaters
            .into_iter()
            .filter_map(|mut s| {
                let seen = appearances.remove(&s.player_id).unwrap_or_default();
                let played: Vec<String> = seen.positions.into_iter().filter(|p| p != "na").collect();
                s.gp = played.len() as u32;
                s.position = most_common(&played).unwrap_or_else(|| "na".to_string());
                s.positions = unique(played);
                s.teams = unique(seen.teams);
                (s.position != "g").then_some(s)
            })
            .collect())
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Ties go to the position played first.
fn most_common(positions: &[String]) -> Option<String> {
    let mut counts: Vec<(&String, usize)> = Vec::new();
    for p in positions {
        match counts.iter().position(|(q, _)| *q == p) {
            Some(i) => counts[i].1 += 1,
            None => counts.push((p, 1)),
        }
    }
    let max = counts.iter().map(|(_, n)| *n).max()?;
    counts
        .into_iter()
        .find(|(_, n)| *n == max)
        .map(|(p, _)| p.clone())
}

fn unique(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
