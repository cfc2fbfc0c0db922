// League-wide percentile ranking of team metrics.
//
// Every metric declares its polarity explicitly. The ranker always orients
// its output so that a higher percentile means a weaker (more exploitable)
// owner of the metric, whichever direction the raw number runs.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::model::TeamSeasonStat;

/// Percentile assigned when a team's value is missing or the league sample
/// is too small to rank.
pub const NEUTRAL_PERCENTILE: f64 = 0.5;

/// Number of ranks used when a percentile is displayed as a league rank.
pub const LEAGUE_SIZE: u8 = 32;

// ---------------------------------------------------------------------------
// Polarity and metrics
// ---------------------------------------------------------------------------

/// What a larger raw value says about the team that owns the metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Polarity {
    /// Larger values mean a weaker team (e.g. yards allowed).
    HigherIsWeaker,
    /// Larger values mean a stronger team (e.g. sacks generated).
    HigherIsStronger,
}

/// Team metrics ranked across the league each season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamMetric {
    PassYardsAllowedPerGame,
    RushYardsAllowedPerGame,
    SacksGeneratedPerGame,
    RedZoneScoringAllowed,
    /// Offensive line: sacks the team's own passers took per game.
    SacksAllowedPerGame,
}

impl TeamMetric {
    pub const ALL: [TeamMetric; 5] = [
        TeamMetric::PassYardsAllowedPerGame,
        TeamMetric::RushYardsAllowedPerGame,
        TeamMetric::SacksGeneratedPerGame,
        TeamMetric::RedZoneScoringAllowed,
        TeamMetric::SacksAllowedPerGame,
    ];

    pub fn polarity(&self) -> Polarity {
        match self {
            TeamMetric::PassYardsAllowedPerGame => Polarity::HigherIsWeaker,
            TeamMetric::RushYardsAllowedPerGame => Polarity::HigherIsWeaker,
            TeamMetric::SacksGeneratedPerGame => Polarity::HigherIsStronger,
            TeamMetric::RedZoneScoringAllowed => Polarity::HigherIsWeaker,
            TeamMetric::SacksAllowedPerGame => Polarity::HigherIsWeaker,
        }
    }

    /// Raw value for one team, or `None` when the inputs are missing.
    pub fn extract(&self, stat: &TeamSeasonStat) -> Option<f64> {
        match self {
            TeamMetric::PassYardsAllowedPerGame => stat.per_game(stat.opp.passing_yards),
            TeamMetric::RushYardsAllowedPerGame => stat.per_game(stat.opp.rushing_yards),
            TeamMetric::SacksGeneratedPerGame => stat.per_game(stat.opp.sacks),
            TeamMetric::RedZoneScoringAllowed => {
                let attempts = stat.opp.red_zone_attempts?;
                let scores = stat.opp.red_zone_scores?;
                (attempts > 0.0).then(|| scores / attempts)
            }
            TeamMetric::SacksAllowedPerGame => stat.per_game(stat.own.sacks),
        }
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Rank teams on one metric into [0, 1], higher = weaker owner.
///
/// Each team's own value takes part in the ranking. A team's percentile is
/// the number of teams strictly stronger than it divided by `n - 1`, so tied
/// teams share a rank and the strongest team is 0.0. Teams with a missing or
/// non-finite value get [`NEUTRAL_PERCENTILE`], as does every team when
/// fewer than `min_teams` have valid values.
pub fn percentile_ranks<'a, I>(values: I, polarity: Polarity, min_teams: usize) -> HashMap<String, f64>
where
    I: IntoIterator<Item = (&'a str, Option<f64>)>,
{
    let mut out = HashMap::new();
    let mut valid: Vec<(&str, f64)> = Vec::new();

    for (team, value) in values {
        match value.filter(|v| v.is_finite()) {
            Some(v) => {
                // Orient so that ascending order runs strongest -> weakest.
                let weakness = match polarity {
                    Polarity::HigherIsWeaker => v,
                    Polarity::HigherIsStronger => -v,
                };
                valid.push((team, weakness));
            }
            None => {
                out.insert(team.to_string(), NEUTRAL_PERCENTILE);
            }
        }
    }

    if valid.len() < min_teams.max(2) {
        if !valid.is_empty() {
            warn!(
                "only {} teams with valid values (need {}); using neutral percentiles",
                valid.len(),
                min_teams.max(2)
            );
        }
        for (team, _) in valid {
            out.insert(team.to_string(), NEUTRAL_PERCENTILE);
        }
        return out;
    }

    valid.sort_by(|a, b| a.1.total_cmp(&b.1));
    let denom = (valid.len() - 1) as f64;

    let mut rank = 0usize;
    for (idx, &(team, weakness)) in valid.iter().enumerate() {
        if idx > 0 && weakness != valid[idx - 1].1 {
            rank = idx;
        }
        out.insert(team.to_string(), rank as f64 / denom);
    }

    out
}

/// Convert a weakness percentile to a 1..=32 league rank (#32 = weakest).
pub fn percentile_to_rank(percentile: f64) -> u8 {
    let rank = (1.0 + percentile.clamp(0.0, 1.0) * (LEAGUE_SIZE - 1) as f64).round();
    rank.clamp(1.0, LEAGUE_SIZE as f64) as u8
}

// ---------------------------------------------------------------------------
// League-wide table
// ---------------------------------------------------------------------------

/// Percentiles for every [`TeamMetric`] in one season.
#[derive(Debug, Clone, Default)]
pub struct LeagueRanks {
    ranks: HashMap<TeamMetric, HashMap<String, f64>>,
}

impl LeagueRanks {
    /// Rank every metric over all teams in `stats`. Metrics are independent,
    /// so each is computed on its own from the same read-only rows.
    pub fn compute(stats: &[TeamSeasonStat], min_teams: usize) -> Self {
        let ranks = TeamMetric::ALL
            .iter()
            .map(|metric| {
                let values = stats
                    .iter()
                    .map(|s| (s.team.as_str(), metric.extract(s)));
                (*metric, percentile_ranks(values, metric.polarity(), min_teams))
            })
            .collect();
        Self { ranks }
    }

    /// Weakness percentile for `team`; neutral when the team is unknown.
    pub fn get(&self, metric: TeamMetric, team: &str) -> f64 {
        self.ranks
            .get(&metric)
            .and_then(|m| m.get(team))
            .copied()
            .unwrap_or(NEUTRAL_PERCENTILE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
