// Eligibility filter: who gets scored at all.
//
// Exclusion is a filtering decision, never an error. Each dropped player is
// logged at debug with the reason.

use std::fmt;

use tracing::debug;

use crate::config::EligibilityConfig;
use crate::context::Candidate;
use crate::model::{Game, InjuryStatus, Player, PlayerProp, PlayerSeasonStat, PositionModel};

/// Why a candidate was left out of the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum Exclusion {
    /// The player's team has no game this week.
    NoGame,
    Injured(InjuryStatus),
    LowVolume { have: u32, need: u32 },
    /// Strict inclusion: no canonical prop quote for the game.
    NoProp,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::NoGame => write!(f, "no game this week"),
            Exclusion::Injured(status) => write!(f, "injury status {}", status.label()),
            Exclusion::LowVolume { have, need } => {
                write!(f, "season volume {have} below minimum {need}")
            }
            Exclusion::NoProp => write!(f, "no active prop quote"),
        }
    }
}

/// A candidate that passed every rule, with its game resolved.
#[derive(Debug, Clone, Copy)]
pub struct Eligible<'c> {
    pub player: &'c Player,
    pub model: PositionModel,
    pub game: &'c Game,
    pub opponent: &'c str,
    pub stats: &'c PlayerSeasonStat,
    pub prop: Option<&'c PlayerProp>,
}

#[derive(Debug, Clone)]
pub struct EligibilityRules {
    min_targets: u32,
    min_rush_attempts: u32,
    min_pass_attempts: u32,
    require_prop: bool,
}

impl From<&EligibilityConfig> for EligibilityRules {
    fn from(config: &EligibilityConfig) -> Self {
        Self {
            min_targets: config.min_targets,
            min_rush_attempts: config.min_rush_attempts,
            min_pass_attempts: config.min_pass_attempts,
            require_prop: config.require_prop,
        }
    }
}

impl EligibilityRules {
    /// Season volume the model is gated on, and its minimum.
    fn volume(&self, model: PositionModel, stats: Option<&PlayerSeasonStat>) -> (u32, u32) {
        let have = |f: fn(&PlayerSeasonStat) -> u32| stats.map(f).unwrap_or(0);
        match model {
            PositionModel::PassCatcher => (have(|s| s.targets), self.min_targets),
            PositionModel::Rusher => (have(|s| s.rush_attempts), self.min_rush_attempts),
            PositionModel::Passer => (have(|s| s.pass_attempts), self.min_pass_attempts),
        }
    }

    /// Apply every rule to one candidate. Zero volume always fails, even
    /// with a zero minimum.
    pub fn check<'c>(&self, candidate: &Candidate<'c>) -> Result<Eligible<'c>, Exclusion> {
        let Some(game) = candidate.game else {
            return Err(Exclusion::NoGame);
        };
        let Some(opponent) = game.opponent_of(&candidate.player.team) else {
            return Err(Exclusion::NoGame);
        };

        let status = &candidate.player.injury_status;
        if status.is_excluded() {
            return Err(Exclusion::Injured(status.clone()));
        }

        let (have, need) = self.volume(candidate.model, candidate.stats);
        let stats = match candidate.stats {
            Some(stats) if have > 0 && have >= need => stats,
            _ => return Err(Exclusion::LowVolume { have, need }),
        };

        if self.require_prop && candidate.prop.is_none() {
            return Err(Exclusion::NoProp);
        }

        Ok(Eligible {
            player: candidate.player,
            model: candidate.model,
            game,
            opponent,
            stats,
            prop: candidate.prop,
        })
    }

    pub fn filter<'c>(&self, candidates: &[Candidate<'c>]) -> Vec<Eligible<'c>> {
        let mut kept = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self.check(candidate) {
                Ok(eligible) => kept.push(eligible),
                Err(reason) => debug!(
                    player_id = %candidate.player.id,
                    model = candidate.model.label(),
                    "excluded: {reason}"
                ),
            }
        }
        kept
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
