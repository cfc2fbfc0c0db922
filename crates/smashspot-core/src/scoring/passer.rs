// Passer model (QB).

use crate::context::MatchupContext;
use crate::eligibility::Eligible;
use crate::factors::{FactorKind, FactorSpec, Ladder};
use crate::percentile::TeamMetric;

use super::{GAME_TOTAL_LADDER, PERCENTILE_LADDER};

pub const FACTORS: &[FactorSpec] = &[
    FactorSpec {
        kind: FactorKind::PocketProtection,
        weight: 15.0,
        ladder: Ladder::at_least(&[(0.75, 1.0), (0.6, 0.7), (0.45, 0.5), (0.3, 0.3)], 0.1),
    },
    FactorSpec {
        kind: FactorKind::ShootoutPotential,
        weight: 25.0,
        ladder: GAME_TOTAL_LADDER,
    },
    FactorSpec {
        kind: FactorKind::OpponentPassDefense,
        weight: 15.0,
        ladder: PERCENTILE_LADDER,
    },
    FactorSpec {
        kind: FactorKind::CompletionEfficiency,
        weight: 15.0,
        ladder: Ladder::at_least(
            &[(5.0, 1.0), (3.0, 0.8), (2.0, 0.6), (0.0, 0.4), (-2.0, 0.2)],
            0.0,
        ),
    },
    FactorSpec {
        kind: FactorKind::Aggressiveness,
        weight: 10.0,
        // Percent of attempts into tight windows.
        ladder: Ladder::at_least(&[(20.0, 1.0), (17.0, 0.7), (14.0, 0.4), (10.0, 0.2)], 0.0),
    },
    FactorSpec {
        kind: FactorKind::UnderdogScript,
        weight: 10.0,
        // Team-perspective spread; trailing teams throw more.
        ladder: Ladder::at_least(&[(7.0, 1.0), (3.5, 0.7), (1.0, 0.4)], 0.0),
    },
    FactorSpec {
        kind: FactorKind::RedZoneWeakness,
        weight: 10.0,
        ladder: PERCENTILE_LADDER,
    },
];

/// Mean of the passer's own line strength and the opponent's pass-rush
/// weakness, both in [0, 1].
pub fn pocket_protection(ctx: &MatchupContext<'_>, team: &str, opponent: &str) -> f64 {
    let ranks = ctx.ranks();
    let line_strength = 1.0 - ranks.get(TeamMetric::SacksAllowedPerGame, team);
    let rush_weakness = ranks.get(TeamMetric::SacksGeneratedPerGame, opponent);
    (line_strength + rush_weakness) / 2.0
}

pub fn input_for(kind: FactorKind, player: &Eligible<'_>, ctx: &MatchupContext<'_>) -> Option<f64> {
    let team = player.player.team.as_str();
    match kind {
        FactorKind::PocketProtection => Some(pocket_protection(ctx, team, player.opponent)),
        FactorKind::ShootoutPotential => ctx.game_context(player.game, team).total,
        FactorKind::OpponentPassDefense => Some(
            ctx.ranks()
                .get(TeamMetric::PassYardsAllowedPerGame, player.opponent),
        ),
        FactorKind::CompletionEfficiency => ctx
            .passing(&player.player.id)?
            .completion_pct_above_expectation,
        FactorKind::Aggressiveness => ctx.passing(&player.player.id)?.aggressiveness,
        FactorKind::UnderdogScript => ctx.game_context(player.game, team).spread,
        FactorKind::RedZoneWeakness => Some(
            ctx.ranks()
                .get(TeamMetric::RedZoneScoringAllowed, player.opponent),
        ),
        _ => None,
    }
}
