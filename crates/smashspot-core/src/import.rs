// Snapshot import: seed the store from a directory of CSV files.
//
// Malformed rows are skipped with a warning. Everything that parses is
// written in a single transaction.

use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::{Database, ImportBatch, LineRow, PlayerRecord, PropRow, TeamRecord};
use crate::model::{
    Game, InjuryStatus, PassingAdvanced, Player, PlayerSeasonStat, Position, ReceivingAdvanced,
    RushingAdvanced, TeamSeasonStat, TeamSide,
};

/// Files every snapshot directory must contain.
pub const REQUIRED_FILES: [&str; 2] = ["players.csv", "games.csv"];

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("failed to write snapshot: {0:#}")]
    Store(anyhow::Error),
}

// ---------------------------------------------------------------------------
// Raw CSV rows (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPlayer {
    id: String,
    name: String,
    position: String,
    team: String,
    #[serde(default)]
    injury_status: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGame {
    id: String,
    season: i32,
    week: u32,
    home_team: String,
    away_team: String,
    #[serde(default)]
    kickoff: Option<String>,
}

/// Flat team ledger row; `opp_*` columns mirror the own-side columns.
#[derive(Debug, Deserialize)]
struct RawTeamStat {
    team: String,
    season: i32,
    games_played: u32,
    passing_yards: Option<f64>,
    rushing_yards: Option<f64>,
    points: Option<f64>,
    sacks: Option<f64>,
    interceptions: Option<f64>,
    fumbles_lost: Option<f64>,
    red_zone_attempts: Option<f64>,
    red_zone_scores: Option<f64>,
    opp_passing_yards: Option<f64>,
    opp_rushing_yards: Option<f64>,
    opp_points: Option<f64>,
    opp_sacks: Option<f64>,
    opp_interceptions: Option<f64>,
    opp_fumbles_lost: Option<f64>,
    opp_red_zone_attempts: Option<f64>,
    opp_red_zone_scores: Option<f64>,
}

impl From<RawTeamStat> for TeamSeasonStat {
    fn from(r: RawTeamStat) -> Self {
        TeamSeasonStat {
            team: r.team.trim().to_string(),
            season: r.season,
            games_played: r.games_played,
            own: TeamSide {
                passing_yards: r.passing_yards,
                rushing_yards: r.rushing_yards,
                points: r.points,
                sacks: r.sacks,
                interceptions: r.interceptions,
                fumbles_lost: r.fumbles_lost,
                red_zone_attempts: r.red_zone_attempts,
                red_zone_scores: r.red_zone_scores,
            },
            opp: TeamSide {
                passing_yards: r.opp_passing_yards,
                rushing_yards: r.opp_rushing_yards,
                points: r.opp_points,
                sacks: r.opp_sacks,
                interceptions: r.opp_interceptions,
                fumbles_lost: r.opp_fumbles_lost,
                red_zone_attempts: r.opp_red_zone_attempts,
                red_zone_scores: r.opp_red_zone_scores,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders
// ---------------------------------------------------------------------------

/// Deserialize every well-formed row; log and skip the rest.
fn read_rows<T: DeserializeOwned, R: Read>(rdr: R, file: &str) -> Result<Vec<T>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    // Header problems are fatal for the file; row problems are not.
    reader.headers()?;
    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!("skipping malformed row {} in {file}: {e}", idx + 1),
        }
    }
    Ok(rows)
}

fn players_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerRecord>, csv::Error> {
    let raw: Vec<RawPlayer> = read_rows(rdr, "players.csv")?;
    Ok(raw
        .into_iter()
        .filter(|p| {
            let ok = !p.id.is_empty() && !p.team.is_empty();
            if !ok {
                warn!("skipping player {:?}: missing id or team", p.name);
            }
            ok
        })
        .map(|p| PlayerRecord {
            player: Player {
                id: p.id,
                name: p.name,
                position: Position::from_str_pos(&p.position),
                team: p.team,
                injury_status: InjuryStatus::parse(p.injury_status.as_deref()),
            },
            photo_url: p.photo_url.filter(|u| !u.is_empty()),
        })
        .collect())
}

fn games_from_reader<R: Read>(rdr: R) -> Result<Vec<Game>, csv::Error> {
    let raw: Vec<RawGame> = read_rows(rdr, "games.csv")?;
    Ok(raw
        .into_iter()
        .filter(|g| {
            let ok = !g.home_team.is_empty() && g.home_team != g.away_team;
            if !ok {
                warn!("skipping game {}: invalid teams", g.id);
            }
            ok
        })
        .map(|g| Game {
            id: g.id,
            season: g.season,
            week: g.week,
            home_team: g.home_team,
            away_team: g.away_team,
            kickoff: g
                .kickoff
                .filter(|k| !k.is_empty())
                .map(|k| crate::db::parse_timestamp(&k)),
        })
        .collect())
}

fn team_stats_from_reader<R: Read>(rdr: R) -> Result<Vec<TeamSeasonStat>, csv::Error> {
    let raw: Vec<RawTeamStat> = read_rows(rdr, "team_season_stats.csv")?;
    Ok(raw.into_iter().map(TeamSeasonStat::from).collect())
}

/// Market rows keep their raw text; rows missing a timestamp are dropped.
fn lines_from_reader<R: Read>(rdr: R) -> Result<Vec<LineRow>, csv::Error> {
    let rows: Vec<LineRow> = read_rows(rdr, "betting_lines.csv")?;
    Ok(rows
        .into_iter()
        .filter(|l| !l.updated_at.is_empty())
        .map(|mut l| {
            l.spread = l.spread.filter(|v| !v.is_empty());
            l.total = l.total.filter(|v| !v.is_empty());
            l.home_moneyline = l.home_moneyline.filter(|v| !v.is_empty());
            l.away_moneyline = l.away_moneyline.filter(|v| !v.is_empty());
            l
        })
        .collect())
}

fn props_from_reader<R: Read>(rdr: R) -> Result<Vec<PropRow>, csv::Error> {
    let rows: Vec<PropRow> = read_rows(rdr, "player_props.csv")?;
    Ok(rows
        .into_iter()
        .filter(|p| !p.updated_at.is_empty())
        .map(|mut p| {
            p.line_value = p.line_value.filter(|v| !v.is_empty());
            p.over_odds = p.over_odds.filter(|v| !v.is_empty());
            p.under_odds = p.under_odds.filter(|v| !v.is_empty());
            p.milestone_odds = p.milestone_odds.filter(|v| !v.is_empty());
            p
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Directory loading
// ---------------------------------------------------------------------------

/// Open `dir/name` and parse it with `parse`. Optional files that do not
/// exist yield an empty list.
fn load_file<T, F>(dir: &Path, name: &str, required: bool, parse: F) -> Result<Vec<T>, ImportError>
where
    F: FnOnce(std::fs::File) -> Result<Vec<T>, csv::Error>,
{
    let path = dir.join(name);
    if !path.exists() {
        if required {
            return Err(ImportError::Validation(format!(
                "{} is required but missing from {}",
                name,
                dir.display()
            )));
        }
        info!("{name} not present; skipping");
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(&path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(file).map_err(|e| ImportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Parse a snapshot directory into an [`ImportBatch`] without writing it.
pub fn load_batch_from_dir(dir: &Path) -> Result<ImportBatch, ImportError> {
    if !dir.is_dir() {
        return Err(ImportError::Validation(format!(
            "snapshot directory {} does not exist",
            dir.display()
        )));
    }

    let batch = ImportBatch {
        players: load_file(dir, REQUIRED_FILES[0], true, players_from_reader)?,
        games: load_file(dir, REQUIRED_FILES[1], true, games_from_reader)?,
        teams: load_file(dir, "teams.csv", false, |f| read_rows::<TeamRecord, _>(f, "teams.csv"))?,
        season_stats: load_file(dir, "player_season_stats.csv", false, |f| {
            read_rows::<PlayerSeasonStat, _>(f, "player_season_stats.csv")
        })?,
        passing: load_file(dir, "advanced_passing.csv", false, |f| {
            read_rows::<PassingAdvanced, _>(f, "advanced_passing.csv")
        })?,
        rushing: load_file(dir, "advanced_rushing.csv", false, |f| {
            read_rows::<RushingAdvanced, _>(f, "advanced_rushing.csv")
        })?,
        receiving: load_file(dir, "advanced_receiving.csv", false, |f| {
            read_rows::<ReceivingAdvanced, _>(f, "advanced_receiving.csv")
        })?,
        team_stats: load_file(dir, "team_season_stats.csv", false, team_stats_from_reader)?,
        lines: load_file(dir, "betting_lines.csv", false, lines_from_reader)?,
        props: load_file(dir, "player_props.csv", false, props_from_reader)?,
    };

    if batch.players.is_empty() {
        return Err(ImportError::Validation(
            "players.csv contains no usable rows".into(),
        ));
    }

    Ok(batch)
}

/// Parse a snapshot directory and write it to `db` in one transaction.
/// Returns the number of rows written.
pub fn import_dir(db: &Database, dir: &Path) -> Result<usize, ImportError> {
    let batch = load_batch_from_dir(dir)?;
    info!(
        players = batch.players.len(),
        games = batch.games.len(),
        lines = batch.lines.len(),
        props = batch.props.len(),
        "importing snapshot from {}",
        dir.display()
    );
    db.import(&batch).map_err(ImportError::Store)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
