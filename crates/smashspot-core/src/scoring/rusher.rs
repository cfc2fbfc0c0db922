// Rusher model (RB).

use crate::context::MatchupContext;
use crate::eligibility::Eligible;
use crate::factors::{FactorKind, FactorSpec, Ladder};
use crate::percentile::TeamMetric;

use super::PERCENTILE_LADDER;

pub const FACTORS: &[FactorSpec] = &[
    FactorSpec {
        kind: FactorKind::OpponentRunDefense,
        weight: 20.0,
        ladder: PERCENTILE_LADDER,
    },
    FactorSpec {
        kind: FactorKind::OpponentTurnoverDifferential,
        weight: 15.0,
        // Giveaway-prone opponents hand the offense short fields.
        ladder: Ladder::at_most(&[(-5.0, 1.0), (-3.0, 0.8), (0.0, 0.5), (3.0, 0.2)], 0.0),
    },
    FactorSpec {
        kind: FactorKind::FavoriteStatus,
        weight: 15.0,
        // Team-perspective spread; negative = favored.
        ladder: Ladder::at_most(
            &[(-7.0, 1.0), (-3.5, 0.8), (-1.0, 0.6), (0.0, 0.4), (3.5, 0.2)],
            0.0,
        ),
    },
    FactorSpec {
        kind: FactorKind::RushingEfficiency,
        weight: 20.0,
        // Rush yards over expected per attempt.
        ladder: Ladder::at_least(
            &[(0.5, 1.0), (0.2, 0.8), (0.15, 0.6), (0.0, 0.4), (-0.3, 0.2)],
            0.0,
        ),
    },
    FactorSpec {
        kind: FactorKind::RushVolume,
        weight: 18.0,
        // Attempts per game.
        ladder: Ladder::at_least(
            &[(20.0, 1.0), (16.0, 0.8), (12.0, 0.6), (8.0, 0.4), (5.0, 0.2)],
            0.0,
        ),
    },
    FactorSpec {
        kind: FactorKind::BackfieldRole,
        weight: 4.0,
        ladder: Ladder::at_most(&[(1.0, 1.0), (2.0, 0.5)], 0.0),
    },
    FactorSpec {
        kind: FactorKind::ReceivingUpside,
        weight: 8.0,
        // Season targets.
        ladder: Ladder::at_least(&[(60.0, 1.0), (40.0, 0.75), (25.0, 0.5), (10.0, 0.25)], 0.0),
    },
];

pub fn input_for(kind: FactorKind, player: &Eligible<'_>, ctx: &MatchupContext<'_>) -> Option<f64> {
    let stats = player.stats;
    match kind {
        FactorKind::OpponentRunDefense => Some(
            ctx.ranks()
                .get(TeamMetric::RushYardsAllowedPerGame, player.opponent),
        ),
        FactorKind::OpponentTurnoverDifferential => {
            ctx.team_stats(player.opponent)?.turnover_differential()
        }
        FactorKind::FavoriteStatus => ctx.game_context(player.game, &player.player.team).spread,
        FactorKind::RushingEfficiency => ctx
            .rushing(&player.player.id)?
            .rush_yards_over_expected_per_att,
        FactorKind::RushVolume => stats.per_game(stats.rush_attempts as f64),
        FactorKind::BackfieldRole => ctx.backfield_role(&player.player.id).map(f64::from),
        FactorKind::ReceivingUpside => Some(stats.targets as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::EligibilityRules;
    use crate::factors::total_weight;
    use crate::model::{Position, PositionModel, RushingAdvanced};
    use crate::scoring::score_player;
    use crate::scoring::test_support::*;

    #[test]
    fn weights_sum_to_100() {
        assert_eq!(total_weight(FACTORS), 100.0);
    }

    #[test]
    fn favorite_against_weak_run_defense() {
        let mut snap = snapshot();
        snap.players = vec![
            player("rb1", Position::RunningBack, "KC"),
            player("rb2", Position::RunningBack, "KC"),
        ];
        let mut lead = season("rb1");
        lead.rush_attempts = 108;
        lead.targets = 41;
        let mut backup = season("rb2");
        backup.rush_attempts = 40;
        snap.season_stats = vec![lead, backup];
        snap.rushing = vec![RushingAdvanced {
            player_id: "rb1".into(),
            season: 2025,
            week: 0,
            rush_yards_over_expected_per_att: Some(0.22),
            ..Default::default()
        }];
        let mut lv = team("LV", 1300.0, 900.0, 14.0);
        // LV gave away 12, took away 6.
        lv.own.interceptions = Some(8.0);
        lv.own.fumbles_lost = Some(4.0);
        lv.opp.interceptions = Some(4.0);
        lv.opp.fumbles_lost = Some(2.0);
        snap.team_stats = vec![team("KC", 1300.0, 500.0, 14.0), lv];
        snap.games = vec![game("g1", "KC", "LV")];
        snap.lines = vec![line("g1", -7.5, 44.5)];

        let config = config();
        let ctx = MatchupContext::build(&snap, &config, as_of());
        let eligible =
            EligibilityRules::from(&config.eligibility).filter(&ctx.candidates(PositionModel::Rusher));
        assert_eq!(eligible.len(), 2);
        let lead = eligible.iter().find(|e| e.player.id == "rb1").unwrap();

        let scores = score_player(lead, &ctx);
        let by_kind = |k: FactorKind| scores.iter().find(|s| s.factor == k).unwrap().score;

        assert_eq!(by_kind(FactorKind::OpponentRunDefense), 20.0);
        // Differential -6.
        assert_eq!(by_kind(FactorKind::OpponentTurnoverDifferential), 15.0);
        assert_eq!(by_kind(FactorKind::FavoriteStatus), 15.0);
        assert_eq!(by_kind(FactorKind::RushingEfficiency), 16.0);
        // 18 attempts per game.
        assert_eq!(by_kind(FactorKind::RushVolume), 14.4);
        assert_eq!(by_kind(FactorKind::BackfieldRole), 4.0);
        assert_eq!(by_kind(FactorKind::ReceivingUpside), 6.0);
    }

    #[test]
    fn underdog_gets_no_favorite_credit() {
        let mut snap = snapshot();
        snap.players = vec![player("rb1", Position::RunningBack, "LV")];
        let mut s = season("rb1");
        s.rush_attempts = 90;
        snap.season_stats = vec![s];
        snap.games = vec![game("g1", "KC", "LV")];
        snap.lines = vec![line("g1", -7.5, 44.5)];

        let config = config();
        let ctx = MatchupContext::build(&snap, &config, as_of());
        let eligible =
            EligibilityRules::from(&config.eligibility).filter(&ctx.candidates(PositionModel::Rusher));
        let scores = score_player(&eligible[0], &ctx);
        let fav = scores
            .iter()
            .find(|s| s.factor == FactorKind::FavoriteStatus)
            .unwrap();
        assert_eq!(fav.input, Some(7.5));
        assert_eq!(fav.score, 0.0);
    }
}
