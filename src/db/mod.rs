use anyhow::{anyhow, Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::engine::rows::{
    GameEventPlayerRow, GameEventRow, StatOwner, StatRow, TableRows,
};
use crate::engine::stats::Stat;

pub mod models;
pub mod skaters;

/// Per-game tables, children before parents.
const GAME_TABLES: [&str; 9] = [
    "game_situations",
    "game_shifts",
    "game_event_players",
    "game_events",
    "game_player_stats",
    "game_players",
    "game_team_stats",
    "game_teams",
    "games",
];

/// Thread-safe SQLite handle (single connection behind a mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("Database mutex poisoned"))
    }

    /// Create every table that does not exist yet (idempotent)
    pub fn create_tables(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        conn.execute_batch(&stats_table_sql("game_team_stats", "team_id", "teams", Stat::on_ice()))?;
        conn.execute_batch(&stats_table_sql(
            "game_player_stats",
            "player_id",
            "players",
            Stat::ALL.into_iter(),
        ))?;
        Ok(())
    }

    // ── Games ────────────────────────────────────────────────────────────────

    /// Replace everything stored for the game in `rows`, all or nothing.
    pub fn replace_game(&self, rows: &TableRows) -> Result<()> {
        let game_id = rows
            .game_id()
            .ok_or_else(|| anyhow!("No games row to store"))?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        upsert_dimensions(&tx, rows)?;
        for table in GAME_TABLES {
            let deleted = tx.execute(
                &format!("DELETE FROM {} WHERE game_id = ?1", table),
                params![game_id as i64],
            )?;
            if deleted > 0 {
                debug!("[{}] Deleted {} rows from {}", game_id, deleted, table);
            }
        }
        insert_game_rows(&tx, rows)
            .with_context(|| format!("Failed to insert rows for game {}", game_id))?;

        tx.commit()?;
        Ok(())
    }

    /// Number of rows in `table` belonging to `game_id`.
    #[cfg(test)]
    pub fn count_game_rows(&self, table: &str, game_id: u64) -> Result<i64> {
        if !GAME_TABLES.contains(&table) {
            anyhow::bail!("Unknown game table {}", table);
        }
        let conn = self.conn()?;
        let n = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE game_id = ?1", table),
            params![game_id as i64],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

// ── Write helpers ────────────────────────────────────────────────────────────

fn upsert_dimensions(tx: &Transaction<'_>, rows: &TableRows) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO players (player_id, first_name, last_name) VALUES (?1, ?2, ?3)
         ON CONFLICT(player_id) DO UPDATE SET
            first_name = excluded.first_name,
            last_name = excluded.last_name",
    )?;
    for p in &rows.players {
        stmt.execute(params![p.player_id, p.first_name, p.last_name])?;
    }

    let mut stmt = tx.prepare(
        "INSERT INTO teams (team_id, abbreviation, team_name) VALUES (?1, ?2, ?3)
         ON CONFLICT(team_id) DO UPDATE SET
            abbreviation = excluded.abbreviation,
            team_name = excluded.team_name",
    )?;
    for t in &rows.teams {
        stmt.execute(params![t.team_id, t.abbreviation, t.team_name])?;
    }
    Ok(())
}

fn insert_game_rows(tx: &Transaction<'_>, rows: &TableRows) -> Result<()> {
    for g in &rows.games {
        tx.execute(
            "INSERT INTO games (game_id, season, game_date, periods, is_playoff, has_shootout)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![g.game_id as i64, g.season, g.game_date, g.periods, g.is_playoff, g.has_shootout],
        )?;
    }

    let mut stmt = tx.prepare(
        "INSERT INTO game_teams (game_id, team_id, venue, score) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for t in &rows.game_teams {
        stmt.execute(params![t.game_id as i64, t.team_id, t.venue.as_str(), t.score])?;
    }

    let mut stmt = tx.prepare(
        "INSERT INTO game_players (game_id, player_id, team_id, jersey, position)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for p in &rows.game_players {
        stmt.execute(params![p.game_id as i64, p.player_id, p.team_id, p.jersey, p.position])?;
    }

    insert_stat_rows(tx, "game_team_stats", &rows.game_team_stats)?;
    insert_stat_rows(tx, "game_player_stats", &rows.game_player_stats)?;

    let mut stmt = tx.prepare(&insert_sql("game_events", &EVENT_COLUMNS))?;
    for ev in &rows.game_events {
        stmt.execute(params_from_iter(event_values(ev)))?;
    }

    let mut stmt = tx.prepare(
        "INSERT INTO game_event_players (game_id, event_id, player_id, on_ice, role)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for GameEventPlayerRow { game_id, event_id, player_id, on_ice, role } in &rows.game_event_players {
        stmt.execute(params![*game_id as i64, event_id, player_id, on_ice, role])?;
    }

    let mut stmt = tx.prepare(
        "INSERT INTO game_shifts (game_id, player_id, period, shifts) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for s in &rows.game_shifts {
        stmt.execute(params![s.game_id as i64, s.player_id, s.period, serde_json::to_string(&s.shifts)?])?;
    }

    let mut stmt = tx.prepare(
        "INSERT INTO game_situations (game_id, team_id, strength_sit, score_sit, period, timeranges)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for s in &rows.game_situations {
        stmt.execute(params![
            s.game_id as i64,
            s.team_id,
            s.strength_sit.as_str(),
            s.score_sit.value(),
            s.period,
            serde_json::to_string(&s.timeranges)?
        ])?;
    }
    Ok(())
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({}) VALUES ({})", table, columns.join(", "), placeholders)
}

fn insert_stat_rows(tx: &Transaction<'_>, table: &str, rows: &[StatRow]) -> Result<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let owner_column = match first.owner {
        StatOwner::Team(_) => "team_id",
        StatOwner::Player(_) => "player_id",
    };
    let mut columns = vec!["game_id", owner_column, "strength_sit", "score_sit", "toi"];
    columns.extend(first.stats().map(Stat::column));
    let mut stmt = tx.prepare(&insert_sql(table, &columns))?;

    for row in rows {
        let owner = match row.owner {
            StatOwner::Team(id) | StatOwner::Player(id) => id,
        };
        let mut values = vec![
            Value::Integer(row.game_id as i64),
            Value::Integer(i64::from(owner)),
            Value::Text(row.strength_sit.as_str().to_string()),
            Value::Integer(i64::from(row.score_sit.value())),
            Value::Integer(i64::from(row.counters.toi)),
        ];
        values.extend(row.stats().map(|s| Value::Integer(i64::from(row.counters.get(s)))));
        stmt.execute(params_from_iter(values))?;
    }
    Ok(())
}

const EVENT_COLUMNS: [&str; 29] = [
    "game_id",
    "event_id",
    "period",
    "period_type",
    "event_time",
    "event_desc",
    "event_type",
    "event_subtype",
    "pen_severity",
    "pen_mins",
    "pen_is_effective",
    "team_id",
    "venue",
    "loc_x",
    "loc_y",
    "a_zone",
    "h_zone",
    "a_def_side",
    "h_def_side",
    "a_strength_sit",
    "h_strength_sit",
    "a_score",
    "h_score",
    "a_score_sit",
    "h_score_sit",
    "a_skaters",
    "h_skaters",
    "a_goalies",
    "h_goalies",
];

/// Values in [`EVENT_COLUMNS`] order.
fn event_values(ev: &GameEventRow) -> Vec<Value> {
    fn int(v: Option<i64>) -> Value {
        v.map_or(Value::Null, Value::Integer)
    }
    fn text(v: Option<&str>) -> Value {
        v.map_or(Value::Null, |s| Value::Text(s.to_string()))
    }
    fn real(v: Option<f64>) -> Value {
        v.map_or(Value::Null, Value::Real)
    }
    vec![
        Value::Integer(ev.game_id as i64),
        Value::Integer(i64::from(ev.event_id)),
        Value::Integer(i64::from(ev.period)),
        Value::Text(ev.period_type.to_string()),
        Value::Integer(i64::from(ev.event_time)),
        Value::Text(ev.event_desc.clone()),
        Value::Text(ev.event_type.clone()),
        Value::Text(ev.event_subtype.clone()),
        text(ev.pen_severity.as_deref()),
        int(ev.pen_mins.map(i64::from)),
        int(ev.pen_is_effective.map(i64::from)),
        int(ev.team_id.map(i64::from)),
        text(ev.venue.map(|v| v.as_str())),
        real(ev.loc_x),
        real(ev.loc_y),
        text(ev.a_zone.map(|z| z.as_str())),
        text(ev.h_zone.map(|z| z.as_str())),
        int(ev.a_def_side.map(i64::from)),
        int(ev.h_def_side.map(i64::from)),
        text(ev.a_strength_sit.map(|s| s.as_str())),
        text(ev.h_strength_sit.map(|s| s.as_str())),
        Value::Integer(i64::from(ev.a_score)),
        Value::Integer(i64::from(ev.h_score)),
        int(ev.a_score_sit.map(|s| i64::from(s.value()))),
        int(ev.h_score_sit.map(|s| i64::from(s.value()))),
        int(ev.a_skaters.map(i64::from)),
        int(ev.h_skaters.map(i64::from)),
        int(ev.a_goalies.map(i64::from)),
        int(ev.h_goalies.map(i64::from)),
    ]
}

/// DDL for a situational stats table with one INTEGER column per counter.
fn stats_table_sql(
    table: &str,
    owner_column: &str,
    owner_table: &str,
    stats: impl Iterator<Item = Stat>,
) -> String {
    let counters: String = stats
        .map(|s| format!("    {} INTEGER NOT NULL DEFAULT 0,\n", s.column()))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
    game_id INTEGER NOT NULL REFERENCES games(game_id),
    {owner} INTEGER NOT NULL REFERENCES {owner_table}({owner}),
    strength_sit TEXT NOT NULL,
    score_sit INTEGER NOT NULL,
    toi INTEGER NOT NULL DEFAULT 0,
{counters}    PRIMARY KEY (game_id, {owner}, strength_sit, score_sit)
);",
        table = table,
        owner = owner_column,
        owner_table = owner_table,
        counters = counters,
    )
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS). The two stats tables are
/// generated from the counter list by [`stats_table_sql`].
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS players (
    player_id   INTEGER PRIMARY KEY,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS teams (
    team_id       INTEGER PRIMARY KEY,
    abbreviation  TEXT NOT NULL,
    team_name     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS games (
    game_id       INTEGER PRIMARY KEY,
    season        INTEGER NOT NULL,
    game_date     TEXT NOT NULL,
    periods       INTEGER NOT NULL,
    is_playoff    INTEGER NOT NULL,
    has_shootout  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS game_teams (
    game_id   INTEGER NOT NULL REFERENCES games(game_id),
    team_id   INTEGER NOT NULL REFERENCES teams(team_id),
    venue     TEXT NOT NULL,
    score     INTEGER NOT NULL,
    PRIMARY KEY (game_id, team_id)
);

CREATE TABLE IF NOT EXISTS game_players (
    game_id    INTEGER NOT NULL REFERENCES games(game_id),
    player_id  INTEGER NOT NULL REFERENCES players(player_id),
    team_id    INTEGER NOT NULL REFERENCES teams(team_id),
    jersey     INTEGER,
    position   TEXT,
    PRIMARY KEY (game_id, player_id)
);

CREATE TABLE IF NOT EXISTS game_events (
    game_id           INTEGER NOT NULL REFERENCES games(game_id),
    event_id          INTEGER NOT NULL,
    period            INTEGER,
    period_type       TEXT NOT NULL,
    event_time        INTEGER,
    event_desc        TEXT,
    event_type        TEXT,
    event_subtype     TEXT,
    pen_severity      TEXT,
    pen_mins          INTEGER,
    pen_is_effective  INTEGER,
    team_id           INTEGER,
    venue             TEXT,
    loc_x             REAL,
    loc_y             REAL,
    a_zone            TEXT,
    h_zone            TEXT,
    a_def_side        INTEGER,
    h_def_side        INTEGER,
    a_strength_sit    TEXT,
    h_strength_sit    TEXT,
    a_score           INTEGER,
    h_score           INTEGER,
    a_score_sit       INTEGER,
    h_score_sit       INTEGER,
    a_skaters         INTEGER,
    h_skaters         INTEGER,
    a_goalies         INTEGER,
    h_goalies         INTEGER,
    PRIMARY KEY (game_id, event_id)
);

CREATE TABLE IF NOT EXISTS game_event_players (
    game_id    INTEGER NOT NULL,
    event_id   INTEGER NOT NULL,
    player_id  INTEGER NOT NULL,
    on_ice     INTEGER NOT NULL,
    role       TEXT,
    PRIMARY KEY (game_id, event_id, player_id),
    FOREIGN KEY (game_id, event_id) REFERENCES game_events(game_id, event_id)
);

-- shifts: JSON array of [start, end] pairs
CREATE TABLE IF NOT EXISTS game_shifts (
    game_id    INTEGER NOT NULL REFERENCES games(game_id),
    player_id  INTEGER NOT NULL REFERENCES players(player_id),
    period     INTEGER NOT NULL,
    shifts     TEXT NOT NULL,
    PRIMARY KEY (game_id, player_id, period)
);

-- timeranges: JSON array of [start, end] pairs
CREATE TABLE IF NOT EXISTS game_situations (
    game_id       INTEGER NOT NULL REFERENCES games(game_id),
    team_id       INTEGER NOT NULL REFERENCES teams(team_id),
    strength_sit  TEXT NOT NULL,
    score_sit     INTEGER NOT NULL,
    period        INTEGER NOT NULL,
    timeranges    TEXT NOT NULL,
    PRIMARY KEY (game_id, team_id, strength_sit, score_sit, period)
);

CREATE INDEX IF NOT EXISTS idx_games_date ON games(game_date);
CREATE INDEX IF NOT EXISTS idx_game_players_player ON game_players(player_id);
";
