// Domain records read from the metric providers. Nothing in the engine
// mutates these; every scoring pass builds fresh derived state from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Offensive roster positions the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    TightEnd,
    #[serde(rename = "OTHER")]
    Other,
}

impl Position {
    /// Parse a provider position abbreviation. Unknown strings map to
    /// `Position::Other` so they are simply never scored.
    ///
    /// - "HB"/"FB" -> RunningBack
    pub fn from_str_pos(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "QB" => Position::Quarterback,
            "RB" | "HB" | "FB" => Position::RunningBack,
            "WR" => Position::WideReceiver,
            "TE" => Position::TightEnd,
            _ => Position::Other,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Other => "OTHER",
        }
    }

    /// The scoring model a player at this position is evaluated with.
    pub fn model(&self) -> Option<PositionModel> {
        match self {
            Position::WideReceiver | Position::TightEnd => Some(PositionModel::PassCatcher),
            Position::RunningBack => Some(PositionModel::Rusher),
            Position::Quarterback => Some(PositionModel::Passer),
            Position::Other => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

/// The three independent position pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionModel {
    PassCatcher,
    Rusher,
    Passer,
}

impl PositionModel {
    pub const ALL: [PositionModel; 3] = [
        PositionModel::PassCatcher,
        PositionModel::Rusher,
        PositionModel::Passer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PositionModel::PassCatcher => "pass-catcher",
            PositionModel::Rusher => "rusher",
            PositionModel::Passer => "passer",
        }
    }

    /// Prop market preferred when picking a player's canonical quote.
    pub fn primary_prop_type(&self) -> &'static str {
        match self {
            PositionModel::PassCatcher => "receiving_yards",
            PositionModel::Rusher => "rushing_yards",
            PositionModel::Passer => "passing_yards",
        }
    }
}

// ---------------------------------------------------------------------------
// Injury status
// ---------------------------------------------------------------------------

/// Reported game status for a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjuryStatus {
    Active,
    Probable,
    Questionable,
    Doubtful,
    Out,
    InjuredReserve,
    /// Anything the provider reports that we do not recognise. Not excluded.
    Other(String),
}

impl InjuryStatus {
    /// Parse a provider status string. Missing or blank means active.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return InjuryStatus::Active;
        };
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "" | "active" | "healthy" | "act" => InjuryStatus::Active,
            "probable" | "p" => InjuryStatus::Probable,
            "questionable" | "q" => InjuryStatus::Questionable,
            "doubtful" | "d" => InjuryStatus::Doubtful,
            "out" | "o" => InjuryStatus::Out,
            "injured reserve" | "ir" | "reserve/injured" | "injured_reserve" => {
                InjuryStatus::InjuredReserve
            }
            _ => InjuryStatus::Other(raw.trim().to_string()),
        }
    }

    /// Out, Doubtful, and Injured Reserve remove a player from the feed.
    pub fn is_excluded(&self) -> bool {
        matches!(
            self,
            InjuryStatus::Out | InjuryStatus::Doubtful | InjuryStatus::InjuredReserve
        )
    }

    pub fn label(&self) -> &str {
        match self {
            InjuryStatus::Active => "Active",
            InjuryStatus::Probable => "Probable",
            InjuryStatus::Questionable => "Questionable",
            InjuryStatus::Doubtful => "Doubtful",
            InjuryStatus::Out => "Out",
            InjuryStatus::InjuredReserve => "Injured Reserve",
            InjuryStatus::Other(s) => s,
        }
    }
}

// ---------------------------------------------------------------------------
// Players and season totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub team: String,
    pub injury_status: InjuryStatus,
}

/// Season totals for one player. One row per (player, season, postseason).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSeasonStat {
    pub player_id: String,
    pub season: i32,
    pub postseason: bool,
    pub games_played: u32,
    pub pass_attempts: u32,
    pub pass_completions: u32,
    pub pass_yards: f64,
    pub pass_tds: u32,
    pub interceptions: u32,
    pub rush_attempts: u32,
    pub rush_yards: f64,
    pub rush_tds: u32,
    pub targets: u32,
    pub receptions: u32,
    pub rec_yards: f64,
    pub rec_tds: u32,
    pub qb_rating: Option<f64>,
}

impl PlayerSeasonStat {
    /// Per-game average of a season total; `None` when no games were played.
    pub fn per_game(&self, total: f64) -> Option<f64> {
        if self.games_played == 0 {
            return None;
        }
        Some(total / self.games_played as f64)
    }

    /// Fold another row for the same player into this one. Used to combine
    /// regular-season and postseason totals for playoff weeks.
    pub fn absorb(&mut self, other: &PlayerSeasonStat) {
        self.games_played += other.games_played;
        self.pass_attempts += other.pass_attempts;
        self.pass_completions += other.pass_completions;
        self.pass_yards += other.pass_yards;
        self.pass_tds += other.pass_tds;
        self.interceptions += other.interceptions;
        self.rush_attempts += other.rush_attempts;
        self.rush_yards += other.rush_yards;
        self.rush_tds += other.rush_tds;
        self.targets += other.targets;
        self.receptions += other.receptions;
        self.rec_yards += other.rec_yards;
        self.rec_tds += other.rec_tds;
        if self.qb_rating.is_none() {
            self.qb_rating = other.qb_rating;
        }
    }
}

// ---------------------------------------------------------------------------
// Advanced per-category stats (week 0 = season aggregate)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassingAdvanced {
    pub player_id: String,
    pub season: i32,
    pub week: u32,
    pub avg_time_to_throw: Option<f64>,
    pub completion_pct_above_expectation: Option<f64>,
    /// Share of attempts into tight windows, in percent.
    pub aggressiveness: Option<f64>,
    pub avg_intended_air_yards: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RushingAdvanced {
    pub player_id: String,
    pub season: i32,
    pub week: u32,
    pub rush_yards_over_expected_per_att: Option<f64>,
    pub efficiency: Option<f64>,
    pub percent_attempts_gte_eight_defenders: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceivingAdvanced {
    pub player_id: String,
    pub season: i32,
    pub week: u32,
    pub avg_separation: Option<f64>,
    pub avg_cushion: Option<f64>,
    /// Average depth of target.
    pub avg_intended_air_yards: Option<f64>,
    pub percent_share_of_intended_air_yards: Option<f64>,
    pub catch_percentage: Option<f64>,
}

// ---------------------------------------------------------------------------
// Team season stats
// ---------------------------------------------------------------------------

/// One side of a team's season ledger. `TeamSeasonStat::own` is what the
/// team's offense did; `TeamSeasonStat::opp` mirrors the same fields for
/// what opponents did against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSide {
    pub passing_yards: Option<f64>,
    pub rushing_yards: Option<f64>,
    pub points: Option<f64>,
    /// Sacks taken by this side's passers.
    pub sacks: Option<f64>,
    /// Interceptions thrown by this side.
    pub interceptions: Option<f64>,
    pub fumbles_lost: Option<f64>,
    pub red_zone_attempts: Option<f64>,
    pub red_zone_scores: Option<f64>,
}

impl TeamSide {
    /// Interceptions plus lost fumbles; `None` only when both are missing.
    pub fn giveaways(&self) -> Option<f64> {
        match (self.interceptions, self.fumbles_lost) {
            (None, None) => None,
            (i, f) => Some(i.unwrap_or(0.0) + f.unwrap_or(0.0)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSeasonStat {
    pub team: String,
    pub season: i32,
    pub games_played: u32,
    pub own: TeamSide,
    pub opp: TeamSide,
}

impl TeamSeasonStat {
    pub fn per_game(&self, total: Option<f64>) -> Option<f64> {
        if self.games_played == 0 {
            return None;
        }
        total.map(|t| t / self.games_played as f64)
    }

    /// Takeaways minus giveaways. Negative means the team gives the ball away
    /// more often than it takes it.
    pub fn turnover_differential(&self) -> Option<f64> {
        let takeaways = self.opp.giveaways()?;
        let giveaways = self.own.giveaways()?;
        Some(takeaways - giveaways)
    }
}

// ---------------------------------------------------------------------------
// Games and markets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub season: i32,
    pub week: u32,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: Option<DateTime<Utc>>,
}

impl Game {
    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn is_home(&self, team: &str) -> bool {
        self.home_team == team
    }

    /// The other team in this game, if `team` plays in it.
    pub fn opponent_of(&self, team: &str) -> Option<&str> {
        if self.home_team == team {
            Some(&self.away_team)
        } else if self.away_team == team {
            Some(&self.home_team)
        } else {
            None
        }
    }
}

/// One vendor's quote for a game. The spread is from the home team's
/// perspective (negative = home favored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BettingLine {
    pub game_id: String,
    pub vendor: String,
    pub spread: Option<f64>,
    pub total: Option<f64>,
    pub home_moneyline: Option<f64>,
    pub away_moneyline: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "market", rename_all = "snake_case")]
pub enum PropMarket {
    OverUnder {
        line: f64,
        over_odds: Option<f64>,
        under_odds: Option<f64>,
    },
    Milestone {
        line: Option<f64>,
        odds: Option<f64>,
    },
}

impl PropMarket {
    pub fn line_value(&self) -> Option<f64> {
        match self {
            PropMarket::OverUnder { line, .. } => Some(*line),
            PropMarket::Milestone { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProp {
    pub player_id: String,
    pub game_id: String,
    pub vendor: String,
    pub prop_type: String,
    pub market: PropMarket,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
