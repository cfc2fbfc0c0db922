// SQLite-backed store for provider data. The scoring engine only reads from
// it; writes happen through bulk snapshot imports.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row, Transaction};
use serde::Deserialize;
use tracing::{info, warn};

use crate::market::{coerce_moneyline, coerce_number};
use crate::model::{
    BettingLine, Game, InjuryStatus, PassingAdvanced, Player, PlayerProp, PlayerSeasonStat,
    Position, PropMarket, ReceivingAdvanced, RushingAdvanced, TeamSeasonStat, TeamSide,
};
use crate::snapshot::{DisplayMetadata, Snapshot, SnapshotSource, TeamColors};

// ---------------------------------------------------------------------------
// Import rows
// ---------------------------------------------------------------------------

/// A player plus the display fields kept beside it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub player: Player,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeamRecord {
    pub abbreviation: String,
    pub name: String,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
}

/// One vendor line exactly as the provider reported it. Market values stay
/// text until read, where they are coerced.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineRow {
    pub game_id: String,
    pub vendor: String,
    pub spread: Option<String>,
    pub total: Option<String>,
    pub home_moneyline: Option<String>,
    pub away_moneyline: Option<String>,
    pub updated_at: String,
}

/// One vendor prop quote as reported. `market` is `over_under` or
/// `milestone`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropRow {
    pub player_id: String,
    pub game_id: String,
    pub vendor: String,
    pub prop_type: String,
    pub market: String,
    pub line_value: Option<String>,
    pub over_odds: Option<String>,
    pub under_odds: Option<String>,
    pub milestone_odds: Option<String>,
    pub updated_at: String,
}

/// Everything one import writes, applied in a single transaction.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub players: Vec<PlayerRecord>,
    pub teams: Vec<TeamRecord>,
    pub games: Vec<Game>,
    pub season_stats: Vec<PlayerSeasonStat>,
    pub passing: Vec<PassingAdvanced>,
    pub rushing: Vec<RushingAdvanced>,
    pub receiving: Vec<ReceivingAdvanced>,
    pub team_stats: Vec<TeamSeasonStat>,
    pub lines: Vec<LineRow>,
    pub props: Vec<PropRow>,
}

impl ImportBatch {
    pub fn row_count(&self) -> usize {
        self.players.len()
            + self.teams.len()
            + self.games.len()
            + self.season_stats.len()
            + self.passing.len()
            + self.rushing.len()
            + self.receiving.len()
            + self.team_stats.len()
            + self.lines.len()
            + self.props.len()
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// SQLite-backed storage for players, games, season and advanced stats,
/// team ledgers, betting lines, and player props.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        // Market columns are untyped. Values such as "PK" or "EVEN" are
        // stored as sent and coerced on read.
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                id            TEXT PRIMARY KEY,
                name          TEXT NOT NULL,
                position      TEXT NOT NULL,
                team          TEXT NOT NULL,
                injury_status TEXT,
                photo_url     TEXT
            );

            CREATE TABLE IF NOT EXISTS teams (
                abbreviation    TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                primary_color   TEXT,
                secondary_color TEXT
            );

            CREATE TABLE IF NOT EXISTS games (
                id        TEXT PRIMARY KEY,
                season    INTEGER NOT NULL,
                week      INTEGER NOT NULL,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                kickoff   TEXT
            );

            CREATE TABLE IF NOT EXISTS player_season_stats (
                player_id        TEXT NOT NULL,
                season           INTEGER NOT NULL,
                postseason       INTEGER NOT NULL DEFAULT 0,
                games_played     INTEGER NOT NULL DEFAULT 0,
                pass_attempts    INTEGER NOT NULL DEFAULT 0,
                pass_completions INTEGER NOT NULL DEFAULT 0,
                pass_yards       REAL NOT NULL DEFAULT 0,
                pass_tds         INTEGER NOT NULL DEFAULT 0,
                interceptions    INTEGER NOT NULL DEFAULT 0,
                rush_attempts    INTEGER NOT NULL DEFAULT 0,
                rush_yards       REAL NOT NULL DEFAULT 0,
                rush_tds         INTEGER NOT NULL DEFAULT 0,
                targets          INTEGER NOT NULL DEFAULT 0,
                receptions       INTEGER NOT NULL DEFAULT 0,
                rec_yards        REAL NOT NULL DEFAULT 0,
                rec_tds          INTEGER NOT NULL DEFAULT 0,
                qb_rating        REAL,
                PRIMARY KEY (player_id, season, postseason)
            );

            CREATE TABLE IF NOT EXISTS advanced_passing (
                player_id                        TEXT NOT NULL,
                season                           INTEGER NOT NULL,
                week                             INTEGER NOT NULL,
                avg_time_to_throw                REAL,
                completion_pct_above_expectation REAL,
                aggressiveness                   REAL,
                avg_intended_air_yards           REAL,
                PRIMARY KEY (player_id, season, week)
            );

            CREATE TABLE IF NOT EXISTS advanced_rushing (
                player_id                           TEXT NOT NULL,
                season                              INTEGER NOT NULL,
                week                                INTEGER NOT NULL,
                rush_yards_over_expected_per_att    REAL,
                efficiency                          REAL,
                percent_attempts_gte_eight_defenders REAL,
                PRIMARY KEY (player_id, season, week)
            );

            CREATE TABLE IF NOT EXISTS advanced_receiving (
                player_id                           TEXT NOT NULL,
                season                              INTEGER NOT NULL,
                week                                INTEGER NOT NULL,
                avg_separation                      REAL,
                avg_cushion                         REAL,
                avg_intended_air_yards              REAL,
                percent_share_of_intended_air_yards REAL,
                catch_percentage                    REAL,
                PRIMARY KEY (player_id, season, week)
            );

            CREATE TABLE IF NOT EXISTS team_season_stats (
                team                  TEXT NOT NULL,
                season                INTEGER NOT NULL,
                games_played          INTEGER NOT NULL DEFAULT 0,
                passing_yards         REAL,
                rushing_yards         REAL,
                points                REAL,
                sacks                 REAL,
                interceptions         REAL,
                fumbles_lost          REAL,
                red_zone_attempts     REAL,
                red_zone_scores       REAL,
                opp_passing_yards     REAL,
                opp_rushing_yards     REAL,
                opp_points            REAL,
                opp_sacks             REAL,
                opp_interceptions     REAL,
                opp_fumbles_lost      REAL,
                opp_red_zone_attempts REAL,
                opp_red_zone_scores   REAL,
                PRIMARY KEY (team, season)
            );

            CREATE TABLE IF NOT EXISTS betting_lines (
                game_id        TEXT NOT NULL,
                vendor         TEXT NOT NULL,
                spread,
                total,
                home_moneyline,
                away_moneyline,
                updated_at     TEXT NOT NULL,
                PRIMARY KEY (game_id, vendor)
            );

            CREATE TABLE IF NOT EXISTS player_props (
                player_id      TEXT NOT NULL,
                game_id        TEXT NOT NULL,
                vendor         TEXT NOT NULL,
                prop_type      TEXT NOT NULL,
                market         TEXT NOT NULL,
                line_value,
                over_odds,
                under_odds,
                milestone_odds,
                updated_at     TEXT NOT NULL,
                PRIMARY KEY (player_id, game_id, vendor, prop_type)
            );
            ",
        )
        .context("failed to create database schema")?;

        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_games_season_week ON games(season, week);
             CREATE INDEX IF NOT EXISTS idx_player_props_game ON player_props(game_id);",
        )
        .context("failed to create indexes")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Write a batch in one transaction. Existing rows with the same key are
    /// replaced, so re-importing a snapshot is idempotent.
    pub fn import(&self, batch: &ImportBatch) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for record in &batch.players {
            insert_player(&tx, record)?;
        }
        for team in &batch.teams {
            tx.execute(
                "INSERT OR REPLACE INTO teams (abbreviation, name, primary_color, secondary_color)
                 VALUES (?1, ?2, ?3, ?4)",
                params![team.abbreviation, team.name, team.primary_color, team.secondary_color],
            )
            .context("failed to insert team")?;
        }
        for game in &batch.games {
            tx.execute(
                "INSERT OR REPLACE INTO games (id, season, week, home_team, away_team, kickoff)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    game.id,
                    game.season,
                    game.week,
                    game.home_team,
                    game.away_team,
                    game.kickoff.map(|k| k.to_rfc3339()),
                ],
            )
            .context("failed to insert game")?;
        }
        for stat in &batch.season_stats {
            insert_season_stat(&tx, stat)?;
        }
        for r in &batch.passing {
            tx.execute(
                "INSERT OR REPLACE INTO advanced_passing
                    (player_id, season, week, avg_time_to_throw,
                     completion_pct_above_expectation, aggressiveness, avg_intended_air_yards)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    r.player_id,
                    r.season,
                    r.week,
                    r.avg_time_to_throw,
                    r.completion_pct_above_expectation,
                    r.aggressiveness,
                    r.avg_intended_air_yards,
                ],
            )
            .context("failed to insert passing advanced stats")?;
        }
        for r in &batch.rushing {
            tx.execute(
                "INSERT OR REPLACE INTO advanced_rushing
                    (player_id, season, week, rush_yards_over_expected_per_att,
                     efficiency, percent_attempts_gte_eight_defenders)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    r.player_id,
                    r.season,
                    r.week,
                    r.rush_yards_over_expected_per_att,
                    r.efficiency,
                    r.percent_attempts_gte_eight_defenders,
                ],
            )
            .context("failed to insert rushing advanced stats")?;
        }
        for r in &batch.receiving {
            tx.execute(
                "INSERT OR REPLACE INTO advanced_receiving
                    (player_id, season, week, avg_separation, avg_cushion,
                     avg_intended_air_yards, percent_share_of_intended_air_yards, catch_percentage)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    r.player_id,
                    r.season,
                    r.week,
                    r.avg_separation,
                    r.avg_cushion,
                    r.avg_intended_air_yards,
                    r.percent_share_of_intended_air_yards,
                    r.catch_percentage,
                ],
            )
            .context("failed to insert receiving advanced stats")?;
        }
        for stat in &batch.team_stats {
            insert_team_stat(&tx, stat)?;
        }
        for line in &batch.lines {
            tx.execute(
                "INSERT OR REPLACE INTO betting_lines
                    (game_id, vendor, spread, total, home_moneyline, away_moneyline, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    line.game_id,
                    line.vendor,
                    line.spread,
                    line.total,
                    line.home_moneyline,
                    line.away_moneyline,
                    line.updated_at,
                ],
            )
            .context("failed to insert betting line")?;
        }
        for prop in &batch.props {
            tx.execute(
                "INSERT OR REPLACE INTO player_props
                    (player_id, game_id, vendor, prop_type, market, line_value,
                     over_odds, under_odds, milestone_odds, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    prop.player_id,
                    prop.game_id,
                    prop.vendor,
                    prop.prop_type,
                    prop.market,
                    prop.line_value,
                    prop.over_odds,
                    prop.under_odds,
                    prop.milestone_odds,
                    prop.updated_at,
                ],
            )
            .context("failed to insert player prop")?;
        }

        tx.commit().context("failed to commit import")?;
        let rows = batch.row_count();
        info!("imported {rows} rows");
        Ok(rows)
    }

    /// Remove one prop quote. Props are live; a withdrawn quote simply
    /// disappears.
    pub fn delete_prop(&self, player_id: &str, game_id: &str) -> Result<usize> {
        let conn = self.conn();
        let removed = conn
            .execute(
                "DELETE FROM player_props WHERE player_id = ?1 AND game_id = ?2",
                params![player_id, game_id],
            )
            .context("failed to delete player prop")?;
        Ok(removed)
    }

    pub fn load_players(&self) -> Result<Vec<Player>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, name, position, team, injury_status FROM players ORDER BY id")
            .context("failed to prepare load_players query")?;
        let players = stmt
            .query_map([], |row| {
                let position: String = row.get(2)?;
                let injury: Option<String> = row.get(4)?;
                Ok(Player {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    position: Position::from_str_pos(&position),
                    team: row.get(3)?,
                    injury_status: InjuryStatus::parse(injury.as_deref()),
                })
            })
            .context("failed to query players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;
        Ok(players)
    }

    pub fn load_games(&self, season: i32, week: u32) -> Result<Vec<Game>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, season, week, home_team, away_team, kickoff
                 FROM games WHERE season = ?1 AND week = ?2 ORDER BY id",
            )
            .context("failed to prepare load_games query")?;
        let games = stmt
            .query_map(params![season, week], |row| {
                let kickoff: Option<String> = row.get(5)?;
                Ok(Game {
                    id: row.get(0)?,
                    season: row.get(1)?,
                    week: row.get(2)?,
                    home_team: row.get(3)?,
                    away_team: row.get(4)?,
                    kickoff: kickoff.as_deref().map(parse_timestamp),
                })
            })
            .context("failed to query games")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map game rows")?;
        Ok(games)
    }

    pub fn load_season_stats(&self, season: i32) -> Result<Vec<PlayerSeasonStat>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player_id, season, postseason, games_played, pass_attempts,
                        pass_completions, pass_yards, pass_tds, interceptions, rush_attempts,
                        rush_yards, rush_tds, targets, receptions, rec_yards, rec_tds, qb_rating
                 FROM player_season_stats WHERE season = ?1
                 ORDER BY player_id, postseason",
            )
            .context("failed to prepare load_season_stats query")?;
        let stats = stmt
            .query_map(params![season], |row| {
                Ok(PlayerSeasonStat {
                    player_id: row.get(0)?,
                    season: row.get(1)?,
                    postseason: row.get(2)?,
                    games_played: row.get(3)?,
                    pass_attempts: row.get(4)?,
                    pass_completions: row.get(5)?,
                    pass_yards: row.get(6)?,
                    pass_tds: row.get(7)?,
                    interceptions: row.get(8)?,
                    rush_attempts: row.get(9)?,
                    rush_yards: row.get(10)?,
                    rush_tds: row.get(11)?,
                    targets: row.get(12)?,
                    receptions: row.get(13)?,
                    rec_yards: row.get(14)?,
                    rec_tds: row.get(15)?,
                    qb_rating: row.get(16)?,
                })
            })
            .context("failed to query season stats")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map season stat rows")?;
        Ok(stats)
    }

    /// Season-aggregate (week 0) advanced stats for all three categories.
    pub fn load_advanced(
        &self,
        season: i32,
    ) -> Result<(Vec<PassingAdvanced>, Vec<RushingAdvanced>, Vec<ReceivingAdvanced>)> {
        let conn = self.conn();

        let passing = conn
            .prepare(
                "SELECT player_id, season, week, avg_time_to_throw,
                        completion_pct_above_expectation, aggressiveness, avg_intended_air_yards
                 FROM advanced_passing WHERE season = ?1 AND week = 0",
            )
            .context("failed to prepare advanced passing query")?
            .query_map(params![season], |row| {
                Ok(PassingAdvanced {
                    player_id: row.get(0)?,
                    season: row.get(1)?,
                    week: row.get(2)?,
                    avg_time_to_throw: row.get(3)?,
                    completion_pct_above_expectation: row.get(4)?,
                    aggressiveness: row.get(5)?,
                    avg_intended_air_yards: row.get(6)?,
                })
            })
            .context("failed to query advanced passing")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map advanced passing rows")?;

        let rushing = conn
            .prepare(
                "SELECT player_id, season, week, rush_yards_over_expected_per_att,
                        efficiency, percent_attempts_gte_eight_defenders
                 FROM advanced_rushing WHERE season = ?1 AND week = 0",
            )
            .context("failed to prepare advanced rushing query")?
            .query_map(params![season], |row| {
                Ok(RushingAdvanced {
                    player_id: row.get(0)?,
                    season: row.get(1)?,
                    week: row.get(2)?,
                    rush_yards_over_expected_per_att: row.get(3)?,
                    efficiency: row.get(4)?,
                    percent_attempts_gte_eight_defenders: row.get(5)?,
                })
            })
            .context("failed to query advanced rushing")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map advanced rushing rows")?;

        let receiving = conn
            .prepare(
                "SELECT player_id, season, week, avg_separation, avg_cushion,
                        avg_intended_air_yards, percent_share_of_intended_air_yards, catch_percentage
                 FROM advanced_receiving WHERE season = ?1 AND week = 0",
            )
            .context("failed to prepare advanced receiving query")?
            .query_map(params![season], |row| {
                Ok(ReceivingAdvanced {
                    player_id: row.get(0)?,
                    season: row.get(1)?,
                    week: row.get(2)?,
                    avg_separation: row.get(3)?,
                    avg_cushion: row.get(4)?,
                    avg_intended_air_yards: row.get(5)?,
                    percent_share_of_intended_air_yards: row.get(6)?,
                    catch_percentage: row.get(7)?,
                })
            })
            .context("failed to query advanced receiving")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map advanced receiving rows")?;

        Ok((passing, rushing, receiving))
    }

    pub fn load_team_stats(&self, season: i32) -> Result<Vec<TeamSeasonStat>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT team, season, games_played,
                        passing_yards, rushing_yards, points, sacks, interceptions,
                        fumbles_lost, red_zone_attempts, red_zone_scores,
                        opp_passing_yards, opp_rushing_yards, opp_points, opp_sacks,
                        opp_interceptions, opp_fumbles_lost, opp_red_zone_attempts,
                        opp_red_zone_scores
                 FROM team_season_stats WHERE season = ?1 ORDER BY team",
            )
            .context("failed to prepare load_team_stats query")?;
        let stats = stmt
            .query_map(params![season], |row| {
                Ok(TeamSeasonStat {
                    team: row.get(0)?,
                    season: row.get(1)?,
                    games_played: row.get(2)?,
                    own: team_side(row, 3)?,
                    opp: team_side(row, 11)?,
                })
            })
            .context("failed to query team stats")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map team stat rows")?;
        Ok(stats)
    }

    /// All vendor lines for the week's games, with market values coerced.
    pub fn load_lines(&self, season: i32, week: u32) -> Result<Vec<BettingLine>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT l.game_id, l.vendor, l.spread, l.total, l.home_moneyline,
                        l.away_moneyline, l.updated_at
                 FROM betting_lines l JOIN games g ON g.id = l.game_id
                 WHERE g.season = ?1 AND g.week = ?2",
            )
            .context("failed to prepare load_lines query")?;
        let lines = stmt
            .query_map(params![season, week], |row| {
                let updated_at: String = row.get(6)?;
                Ok(BettingLine {
                    game_id: row.get(0)?,
                    vendor: row.get(1)?,
                    spread: market_value(row.get(2)?, "spread", coerce_number),
                    total: market_value(row.get(3)?, "total", coerce_number),
                    home_moneyline: market_value(row.get(4)?, "home_moneyline", coerce_moneyline),
                    away_moneyline: market_value(row.get(5)?, "away_moneyline", coerce_moneyline),
                    updated_at: parse_timestamp(&updated_at),
                })
            })
            .context("failed to query betting lines")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map betting line rows")?;
        Ok(lines)
    }

    /// All current prop quotes for the week's games. Quotes whose market
    /// cannot be interpreted are skipped.
    pub fn load_props(&self, season: i32, week: u32) -> Result<Vec<PlayerProp>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT p.player_id, p.game_id, p.vendor, p.prop_type, p.market, p.line_value,
                        p.over_odds, p.under_odds, p.milestone_odds, p.updated_at
                 FROM player_props p JOIN games g ON g.id = p.game_id
                 WHERE g.season = ?1 AND g.week = ?2",
            )
            .context("failed to prepare load_props query")?;
        let rows = stmt
            .query_map(params![season, week], |row| {
                Ok(RawProp {
                    player_id: row.get(0)?,
                    game_id: row.get(1)?,
                    vendor: row.get(2)?,
                    prop_type: row.get(3)?,
                    market: row.get(4)?,
                    line_value: row.get(5)?,
                    over_odds: row.get(6)?,
                    under_odds: row.get(7)?,
                    milestone_odds: row.get(8)?,
                    updated_at: row.get(9)?,
                })
            })
            .context("failed to query player props")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player prop rows")?;

        Ok(rows.into_iter().filter_map(RawProp::into_prop).collect())
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

/// A prop row before its market columns are interpreted.
struct RawProp {
    player_id: String,
    game_id: String,
    vendor: String,
    prop_type: String,
    market: String,
    line_value: Value,
    over_odds: Value,
    under_odds: Value,
    milestone_odds: Value,
    updated_at: String,
}

impl RawProp {
    /// Over/under quotes need a usable line; milestones only need to exist.
    fn into_prop(self) -> Option<PlayerProp> {
        let line = market_value(self.line_value, "line_value", coerce_number);
        let market = match self.market.trim().to_lowercase().as_str() {
            "over_under" => PropMarket::OverUnder {
                line: line?,
                over_odds: market_value(self.over_odds, "over_odds", coerce_moneyline),
                under_odds: market_value(self.under_odds, "under_odds", coerce_moneyline),
            },
            "milestone" => PropMarket::Milestone {
                line,
                odds: market_value(self.milestone_odds, "milestone_odds", coerce_moneyline),
            },
            other => {
                warn!(
                    player_id = %self.player_id,
                    vendor = %self.vendor,
                    "skipping prop with unknown market {other:?}"
                );
                return None;
            }
        };
        Some(PlayerProp {
            player_id: self.player_id,
            game_id: self.game_id,
            vendor: self.vendor,
            prop_type: self.prop_type,
            market,
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

fn insert_player(tx: &Transaction<'_>, record: &PlayerRecord) -> Result<()> {
    let p = &record.player;
    let injury = match &p.injury_status {
        InjuryStatus::Active => None,
        other => Some(other.label().to_string()),
    };
    tx.execute(
        "INSERT OR REPLACE INTO players (id, name, position, team, injury_status, photo_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            p.id,
            p.name,
            p.position.display_str(),
            p.team,
            injury,
            record.photo_url,
        ],
    )
    .context("failed to insert player")?;
    Ok(())
}

fn insert_season_stat(tx: &Transaction<'_>, s: &PlayerSeasonStat) -> Result<()> {
    tx.execute(
        "INSERT OR REPLACE INTO player_season_stats
            (player_id, season, postseason, games_played, pass_attempts, pass_completions,
             pass_yards, pass_tds, interceptions, rush_attempts, rush_yards, rush_tds,
             targets, receptions, rec_yards, rec_tds, qb_rating)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            s.player_id,
            s.season,
            s.postseason,
            s.games_played,
            s.pass_attempts,
            s.pass_completions,
            s.pass_yards,
            s.pass_tds,
            s.interceptions,
            s.rush_attempts,
            s.rush_yards,
            s.rush_tds,
            s.targets,
            s.receptions,
            s.rec_yards,
            s.rec_tds,
            s.qb_rating,
        ],
    )
    .context("failed to insert season stat")?;
    Ok(())
}

fn insert_team_stat(tx: &Transaction<'_>, t: &TeamSeasonStat) -> Result<()> {
    let (o, d) = (&t.own, &t.opp);
    tx.execute(
        "INSERT OR REPLACE INTO team_season_stats
            (team, season, games_played,
             passing_yards, rushing_yards, points, sacks, interceptions, fumbles_lost,
             red_zone_attempts, red_zone_scores,
             opp_passing_yards, opp_rushing_yards, opp_points, opp_sacks, opp_interceptions,
             opp_fumbles_lost, opp_red_zone_attempts, opp_red_zone_scores)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                 ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            t.team,
            t.season,
            t.games_played,
            o.passing_yards,
            o.rushing_yards,
            o.points,
            o.sacks,
            o.interceptions,
            o.fumbles_lost,
            o.red_zone_attempts,
            o.red_zone_scores,
            d.passing_yards,
            d.rushing_yards,
            d.points,
            d.sacks,
            d.interceptions,
            d.fumbles_lost,
            d.red_zone_attempts,
            d.red_zone_scores,
        ],
    )
    .context("failed to insert team stat")?;
    Ok(())
}

/// Read eight consecutive team-side columns starting at `start`.
fn team_side(row: &Row<'_>, start: usize) -> rusqlite::Result<TeamSide> {
    Ok(TeamSide {
        passing_yards: row.get(start)?,
        rushing_yards: row.get(start + 1)?,
        points: row.get(start + 2)?,
        sacks: row.get(start + 3)?,
        interceptions: row.get(start + 4)?,
        fumbles_lost: row.get(start + 5)?,
        red_zone_attempts: row.get(start + 6)?,
        red_zone_scores: row.get(start + 7)?,
    })
}

/// Coerce an untyped market column. Values that cannot be read are absent.
fn market_value(value: Value, column: &str, coerce: fn(&str) -> Option<f64>) -> Option<f64> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i as f64),
        Value::Real(r) => r.is_finite().then_some(r),
        Value::Text(s) => {
            let parsed = coerce(&s);
            if parsed.is_none() && !s.trim().is_empty() {
                warn!("could not coerce {column} value {s:?}; treating as absent");
            }
            parsed
        }
        Value::Blob(_) => {
            warn!("unexpected blob in {column}; treating as absent");
            None
        }
    }
}

/// Parse a provider timestamp (RFC 3339, or `YYYY-MM-DD HH:MM:SS` in UTC).
/// Unparseable stamps sort as the oldest possible quote.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return naive.and_utc();
        }
    }
    warn!("unparseable timestamp {raw:?}; treating as epoch");
    DateTime::<Utc>::UNIX_EPOCH
}

// ---------------------------------------------------------------------------
// Collaborator impls
// ---------------------------------------------------------------------------

impl SnapshotSource for Database {
    fn load_snapshot(&self, season: i32, week: u32) -> Result<Snapshot> {
        let (passing, rushing, receiving) = self.load_advanced(season)?;
        Ok(Snapshot {
            season,
            week,
            players: self.load_players()?,
            games: self.load_games(season, week)?,
            season_stats: self.load_season_stats(season)?,
            passing,
            rushing,
            receiving,
            team_stats: self.load_team_stats(season)?,
            lines: self.load_lines(season, week)?,
            props: self.load_props(season, week)?,
        })
    }
}

impl DisplayMetadata for Database {
    fn photo_url(&self, player_id: &str) -> Option<String> {
        let conn = self.conn();
        let result: rusqlite::Result<Option<String>> = conn.query_row(
            "SELECT photo_url FROM players WHERE id = ?1",
            params![player_id],
            |row| row.get(0),
        );
        match result {
            Ok(url) => url.filter(|u| !u.trim().is_empty()),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                warn!("failed to read photo url for {player_id}: {e}");
                None
            }
        }
    }

    fn team_colors(&self, team: &str) -> Option<TeamColors> {
        let conn = self.conn();
        let result: rusqlite::Result<(Option<String>, Option<String>)> = conn.query_row(
            "SELECT primary_color, secondary_color FROM teams WHERE abbreviation = ?1",
            params![team],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );
        match result {
            Ok((Some(primary), secondary)) => Some(TeamColors { primary, secondary }),
            Ok((None, _)) | Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                warn!("failed to read team colors for {team}: {e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn game() -> Game {
        Game {
            id: "2025_07_LV_KC".into(),
            season: 2025,
            week: 7,
            home_team: "KC".into(),
            away_team: "LV".into(),
            kickoff: Some(Utc.with_ymd_and_hms(2025, 10, 19, 20, 25, 0).unwrap()),
        }
    }

    fn line_row(vendor: &str, spread: &str, home_ml: &str, away_ml: &str) -> LineRow {
        LineRow {
            game_id: "2025_07_LV_KC".into(),
            vendor: vendor.into(),
            spread: Some(spread.into()),
            total: Some("47.5".into()),
            home_moneyline: Some(home_ml.into()),
            away_moneyline: Some(away_ml.into()),
            updated_at: "2025-10-18 14:00:00".into(),
        }
    }

    fn prop_row(market: &str, line: Option<&str>) -> PropRow {
        PropRow {
            player_id: "wr1".into(),
            game_id: "2025_07_LV_KC".into(),
            vendor: "fanduel".into(),
            prop_type: "receiving_yards".into(),
            market: market.into(),
            line_value: line.map(String::from),
            over_odds: Some("-115".into()),
            under_odds: Some("EVEN".into()),
            milestone_odds: None,
            updated_at: "2025-10-18T16:30:00Z".into(),
        }
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for expected in [
            "players",
            "teams",
            "games",
            "player_season_stats",
            "advanced_passing",
            "advanced_rushing",
            "advanced_receiving",
            "team_season_stats",
            "betting_lines",
            "player_props",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn players_round_trip_with_status() {
        let db = test_db();
        let batch = ImportBatch {
            players: vec![
                PlayerRecord {
                    player: Player {
                        id: "wr1".into(),
                        name: "Deep Threat".into(),
                        position: Position::WideReceiver,
                        team: "LV".into(),
                        injury_status: InjuryStatus::Questionable,
                    },
                    photo_url: Some("https://img.example/wr1.png".into()),
                },
                PlayerRecord {
                    player: Player {
                        id: "rb1".into(),
                        name: "Bell Cow".into(),
                        position: Position::RunningBack,
                        team: "KC".into(),
                        injury_status: InjuryStatus::Active,
                    },
                    photo_url: None,
                },
            ],
            ..Default::default()
        };
        db.import(&batch).unwrap();

        let players = db.load_players().unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].id, "rb1");
        assert_eq!(players[0].injury_status, InjuryStatus::Active);
        assert_eq!(players[1].injury_status, InjuryStatus::Questionable);
        assert_eq!(
            db.photo_url("wr1").as_deref(),
            Some("https://img.example/wr1.png")
        );
        assert_eq!(db.photo_url("rb1"), None);
        assert_eq!(db.photo_url("nobody"), None);
    }

    #[test]
    fn lines_are_coerced_on_read() {
        let db = test_db();
        let mut pk = line_row("caesars", "PK", "EVEN", "-110");
        pk.total = Some("n/a".into());
        let batch = ImportBatch {
            games: vec![game()],
            lines: vec![line_row("draftkings", "+3.5", "-180", "+150"), pk],
            ..Default::default()
        };
        db.import(&batch).unwrap();

        let mut lines = db.load_lines(2025, 7).unwrap();
        lines.sort_by(|a, b| a.vendor.cmp(&b.vendor));
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0].vendor, "caesars");
        assert_eq!(lines[0].spread, Some(0.0));
        assert_eq!(lines[0].total, None);
        assert_eq!(lines[0].home_moneyline, Some(100.0));

        // Stored as reported; sign normalization happens in canonicalization.
        assert_eq!(lines[1].spread, Some(3.5));
        assert_eq!(lines[1].home_moneyline, Some(-180.0));
        assert_eq!(
            lines[1].updated_at,
            Utc.with_ymd_and_hms(2025, 10, 18, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn props_parse_markets_and_skip_unusable() {
        let db = test_db();
        let mut milestone = prop_row("milestone", None);
        milestone.prop_type = "anytime_td".into();
        milestone.milestone_odds = Some("+240".into());
        let mut broken = prop_row("over_under", Some("lots"));
        broken.vendor = "betmgm".into();
        let batch = ImportBatch {
            games: vec![game()],
            props: vec![prop_row("over_under", Some("64.5")), milestone, broken],
            ..Default::default()
        };
        db.import(&batch).unwrap();

        let mut props = db.load_props(2025, 7).unwrap();
        props.sort_by(|a, b| a.prop_type.cmp(&b.prop_type));
        assert_eq!(props.len(), 2);
        assert_eq!(
            props[0].market,
            PropMarket::Milestone {
                line: None,
                odds: Some(240.0)
            }
        );
        assert_eq!(
            props[1].market,
            PropMarket::OverUnder {
                line: 64.5,
                over_odds: Some(-115.0),
                under_odds: Some(100.0)
            }
        );
    }

    #[test]
    fn week_scoping_for_markets() {
        let db = test_db();
        let mut other = game();
        other.id = "2025_08_KC_DEN".into();
        other.week = 8;
        let mut other_line = line_row("draftkings", "-3", "-150", "+130");
        other_line.game_id = other.id.clone();
        let batch = ImportBatch {
            games: vec![game(), other],
            lines: vec![line_row("draftkings", "+3.5", "-180", "+150"), other_line],
            ..Default::default()
        };
        db.import(&batch).unwrap();

        assert_eq!(db.load_games(2025, 7).unwrap().len(), 1);
        let lines = db.load_lines(2025, 8).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].game_id, "2025_08_KC_DEN");
    }

    #[test]
    fn team_stats_round_trip_both_sides() {
        let db = test_db();
        let stat = TeamSeasonStat {
            team: "KC".into(),
            season: 2025,
            games_played: 6,
            own: TeamSide {
                sacks: Some(11.0),
                interceptions: Some(4.0),
                ..Default::default()
            },
            opp: TeamSide {
                passing_yards: Some(1310.0),
                sacks: Some(17.0),
                red_zone_attempts: Some(18.0),
                red_zone_scores: Some(9.0),
                ..Default::default()
            },
        };
        db.import(&ImportBatch {
            team_stats: vec![stat.clone()],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(db.load_team_stats(2025).unwrap(), vec![stat]);
        assert!(db.load_team_stats(2024).unwrap().is_empty());
    }

    #[test]
    fn reimport_replaces_rows() {
        let db = test_db();
        let mut s = PlayerSeasonStat {
            player_id: "wr1".into(),
            season: 2025,
            games_played: 5,
            targets: 40,
            ..Default::default()
        };
        db.import(&ImportBatch {
            season_stats: vec![s.clone()],
            ..Default::default()
        })
        .unwrap();
        s.games_played = 6;
        s.targets = 49;
        db.import(&ImportBatch {
            season_stats: vec![s.clone()],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(db.load_season_stats(2025).unwrap(), vec![s]);
    }

    #[test]
    fn advanced_stats_only_season_aggregate() {
        let db = test_db();
        let agg = ReceivingAdvanced {
            player_id: "wr1".into(),
            season: 2025,
            week: 0,
            avg_separation: Some(3.2),
            ..Default::default()
        };
        let weekly = ReceivingAdvanced {
            week: 6,
            avg_separation: Some(1.1),
            ..agg.clone()
        };
        db.import(&ImportBatch {
            receiving: vec![agg.clone(), weekly],
            ..Default::default()
        })
        .unwrap();
        let (_, _, receiving) = db.load_advanced(2025).unwrap();
        assert_eq!(receiving, vec![agg]);
    }

    #[test]
    fn delete_prop_removes_quote() {
        let db = test_db();
        db.import(&ImportBatch {
            games: vec![game()],
            props: vec![prop_row("over_under", Some("64.5"))],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(db.delete_prop("wr1", "2025_07_LV_KC").unwrap(), 1);
        assert!(db.load_props(2025, 7).unwrap().is_empty());
    }

    #[test]
    fn team_colors_lookup() {
        let db = test_db();
        db.import(&ImportBatch {
            teams: vec![
                TeamRecord {
                    abbreviation: "KC".into(),
                    name: "Kansas City Chiefs".into(),
                    primary_color: Some("#E31837".into()),
                    secondary_color: Some("#FFB81C".into()),
                },
                TeamRecord {
                    abbreviation: "LV".into(),
                    name: "Las Vegas Raiders".into(),
                    primary_color: None,
                    secondary_color: None,
                },
            ],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            db.team_colors("KC"),
            Some(TeamColors {
                primary: "#E31837".into(),
                secondary: Some("#FFB81C".into())
            })
        );
        assert_eq!(db.team_colors("LV"), None);
        assert_eq!(db.team_colors("XXX"), None);
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 10, 18, 14, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-10-18T14:00:00Z"), expected);
        assert_eq!(parse_timestamp("2025-10-18T16:00:00+02:00"), expected);
        assert_eq!(parse_timestamp("2025-10-18 14:00:00"), expected);
        assert_eq!(parse_timestamp("2025-10-18 14:00:00.000"), expected);
        assert_eq!(parse_timestamp("yesterday"), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn snapshot_source_assembles_week() {
        let db = test_db();
        db.import(&ImportBatch {
            games: vec![game()],
            lines: vec![line_row("draftkings", "-3.5", "-180", "+150")],
            ..Default::default()
        })
        .unwrap();
        let snap = db.load_snapshot(2025, 7).unwrap();
        assert_eq!((snap.season, snap.week), (2025, 7));
        assert_eq!(snap.games.len(), 1);
        assert_eq!(snap.lines.len(), 1);
        assert!(snap.players.is_empty());

        let empty = db.load_snapshot(2025, 9).unwrap();
        assert!(empty.games.is_empty() && empty.lines.is_empty());
    }
}
