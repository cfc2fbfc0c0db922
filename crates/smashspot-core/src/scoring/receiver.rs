// Pass-catcher model (WR, TE).

use crate::context::MatchupContext;
use crate::eligibility::Eligible;
use crate::factors::{FactorKind, FactorSpec, Ladder};
use crate::percentile::TeamMetric;

use super::{GAME_TOTAL_LADDER, PERCENTILE_LADDER};

/// Points added to the game total when the receiver's team is the underdog.
pub const UNDERDOG_TOTAL_BONUS: f64 = 3.0;

pub const FACTORS: &[FactorSpec] = &[
    FactorSpec {
        kind: FactorKind::AirYardsShare,
        weight: 25.0,
        // Percent of team intended air yards.
        ladder: Ladder::at_least(
            &[(40.0, 1.0), (35.0, 0.8), (30.0, 0.6), (25.0, 0.4), (20.0, 0.2)],
            0.0,
        ),
    },
    FactorSpec {
        kind: FactorKind::DepthOfTarget,
        weight: 15.0,
        ladder: Ladder::at_least(
            &[(12.0, 1.0), (10.0, 0.8), (8.0, 0.6), (6.0, 0.4), (4.0, 0.2)],
            0.0,
        ),
    },
    FactorSpec {
        kind: FactorKind::Separation,
        weight: 10.0,
        ladder: Ladder::at_least(&[(3.5, 1.0), (3.0, 0.7), (2.5, 0.4)], 0.1),
    },
    FactorSpec {
        kind: FactorKind::OpponentPassDefense,
        weight: 15.0,
        ladder: PERCENTILE_LADDER,
    },
    FactorSpec {
        kind: FactorKind::QuarterbackEfficiency,
        weight: 10.0,
        // Primary passer's CPOE.
        ladder: Ladder::at_least(&[(3.0, 1.0), (2.0, 0.8), (0.0, 0.5), (-2.0, 0.2)], 0.0),
    },
    FactorSpec {
        kind: FactorKind::ReceiverGameScript,
        weight: 10.0,
        ladder: GAME_TOTAL_LADDER,
    },
    FactorSpec {
        kind: FactorKind::CatchRate,
        weight: 5.0,
        ladder: Ladder::at_least(&[(75.0, 1.0), (70.0, 0.8), (65.0, 0.6), (60.0, 0.4)], 0.2),
    },
    FactorSpec {
        kind: FactorKind::TargetVolume,
        weight: 10.0,
        // Targets per game.
        ladder: Ladder::at_least(
            &[(9.0, 1.0), (7.5, 0.8), (6.0, 0.6), (4.5, 0.4), (3.0, 0.2)],
            0.0,
        ),
    },
];

pub fn input_for(kind: FactorKind, player: &Eligible<'_>, ctx: &MatchupContext<'_>) -> Option<f64> {
    let adv = ctx.receiving(&player.player.id);
    let stats = player.stats;
    match kind {
        FactorKind::AirYardsShare => adv?.percent_share_of_intended_air_yards,
        FactorKind::DepthOfTarget => adv?.avg_intended_air_yards,
        FactorKind::Separation => adv?.avg_separation,
        FactorKind::OpponentPassDefense => Some(
            ctx.ranks()
                .get(TeamMetric::PassYardsAllowedPerGame, player.opponent),
        ),
        FactorKind::QuarterbackEfficiency => {
            let qb = ctx.primary_passer(&player.player.team)?;
            ctx.passing(qb)?.completion_pct_above_expectation
        }
        FactorKind::ReceiverGameScript => {
            let game = ctx.game_context(player.game, &player.player.team);
            let bonus = if game.is_underdog() {
                UNDERDOG_TOTAL_BONUS
            } else {
                0.0
            };
            game.total.map(|t| t + bonus)
        }
        FactorKind::CatchRate => adv
            .and_then(|a| a.catch_percentage)
            .or_else(|| {
                (stats.targets > 0)
                    .then(|| stats.receptions as f64 / stats.targets as f64 * 100.0)
            }),
        FactorKind::TargetVolume => stats.per_game(stats.targets as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::EligibilityRules;
    use crate::factors::total_weight;
    use crate::model::{PassingAdvanced, Position, PositionModel, ReceivingAdvanced};
    use crate::scoring::score_player;
    use crate::scoring::test_support::*;

    #[test]
    fn weights_sum_to_100() {
        assert_eq!(total_weight(FACTORS), 100.0);
    }

    fn fixture() -> crate::snapshot::Snapshot {
        let mut snap = snapshot();
        snap.players = vec![
            player("wr1", Position::WideReceiver, "LV"),
            player("qb1", Position::Quarterback, "LV"),
        ];
        let mut wr = season("wr1");
        wr.targets = 54;
        wr.receptions = 36;
        let mut qb = season("qb1");
        qb.pass_attempts = 210;
        snap.season_stats = vec![wr, qb];
        snap.receiving = vec![ReceivingAdvanced {
            player_id: "wr1".into(),
            season: 2025,
            week: 0,
            avg_separation: Some(3.1),
            avg_intended_air_yards: Some(13.2),
            percent_share_of_intended_air_yards: Some(41.0),
            catch_percentage: None,
            avg_cushion: None,
        }];
        snap.passing = vec![PassingAdvanced {
            player_id: "qb1".into(),
            season: 2025,
            week: 0,
            completion_pct_above_expectation: Some(2.4),
            ..Default::default()
        }];
        snap.team_stats = vec![team("KC", 1500.0, 600.0, 20.0), team("LV", 1200.0, 700.0, 12.0)];
        snap.games = vec![game("g1", "KC", "LV")];
        // LV is a 4-point underdog in a 47.5 total game.
        snap.lines = vec![line("g1", -4.0, 47.5)];
        snap
    }

    #[test]
    fn scores_each_factor_from_its_source() {
        let snap = fixture();
        let config = config();
        let ctx = MatchupContext::build(&snap, &config, as_of());
        let rules = EligibilityRules::from(&config.eligibility);
        let eligible = rules.filter(&ctx.candidates(PositionModel::PassCatcher));
        assert_eq!(eligible.len(), 1);

        let scores = score_player(&eligible[0], &ctx);
        let by_kind = |k: FactorKind| scores.iter().find(|s| s.factor == k).unwrap().score;

        assert_eq!(by_kind(FactorKind::AirYardsShare), 25.0);
        assert_eq!(by_kind(FactorKind::DepthOfTarget), 15.0);
        assert_eq!(by_kind(FactorKind::Separation), 7.0);
        // KC allows the most pass yards of the two teams.
        assert_eq!(by_kind(FactorKind::OpponentPassDefense), 15.0);
        assert_eq!(by_kind(FactorKind::QuarterbackEfficiency), 8.0);
        // 47.5 + 3 underdog bonus = 50.5.
        assert_eq!(by_kind(FactorKind::ReceiverGameScript), 8.0);
        // Catch rate falls back to receptions / targets = 66.7%.
        assert_eq!(by_kind(FactorKind::CatchRate), 3.0);
        // 9 targets per game.
        assert_eq!(by_kind(FactorKind::TargetVolume), 10.0);
    }

    #[test]
    fn missing_advanced_stats_contribute_zero() {
        let mut snap = fixture();
        snap.receiving.clear();
        snap.passing.clear();
        let config = config();
        let ctx = MatchupContext::build(&snap, &config, as_of());
        let rules = EligibilityRules::from(&config.eligibility);
        let eligible = rules.filter(&ctx.candidates(PositionModel::PassCatcher));
        assert_eq!(eligible.len(), 1, "missing optional inputs never exclude");

        let scores = score_player(&eligible[0], &ctx);
        for kind in [
            FactorKind::AirYardsShare,
            FactorKind::DepthOfTarget,
            FactorKind::Separation,
            FactorKind::QuarterbackEfficiency,
        ] {
            let s = scores.iter().find(|s| s.factor == kind).unwrap();
            assert_eq!(s.score, 0.0);
            assert_eq!(s.input, None);
        }
    }
}
