// Position models: one factor table per model, and the glue that feeds each
// factor its input.

pub mod passer;
pub mod receiver;
pub mod rusher;

use crate::context::MatchupContext;
use crate::eligibility::Eligible;
use crate::factors::{FactorKind, FactorScore, FactorSpec, Ladder};
use crate::model::PositionModel;

/// Shared ladder for opponent weakness percentiles (1.0 = most exploitable).
pub(crate) const PERCENTILE_LADDER: Ladder = Ladder::at_least(
    &[(0.9, 1.0), (0.75, 0.8), (0.6, 0.6), (0.4, 0.4), (0.2, 0.2)],
    0.0,
);

/// Shared ladder for game totals (over/under points).
pub(crate) const GAME_TOTAL_LADDER: Ladder = Ladder::at_least(
    &[(52.0, 1.0), (50.0, 0.8), (48.0, 0.6), (45.0, 0.4), (42.0, 0.2)],
    0.0,
);

pub fn factor_table(model: PositionModel) -> &'static [FactorSpec] {
    match model {
        PositionModel::PassCatcher => receiver::FACTORS,
        PositionModel::Rusher => rusher::FACTORS,
        PositionModel::Passer => passer::FACTORS,
    }
}

/// Raw input for one factor, or `None` when the data is missing.
pub fn factor_input(kind: FactorKind, player: &Eligible<'_>, ctx: &MatchupContext<'_>) -> Option<f64> {
    match player.model {
        PositionModel::PassCatcher => receiver::input_for(kind, player, ctx),
        PositionModel::Rusher => rusher::input_for(kind, player, ctx),
        PositionModel::Passer => passer::input_for(kind, player, ctx),
    }
}

/// Score every factor of the player's model, in table order.
pub fn score_player(player: &Eligible<'_>, ctx: &MatchupContext<'_>) -> Vec<FactorScore> {
    factor_table(player.model)
        .iter()
        .map(|spec| spec.score(factor_input(spec.kind, player, ctx)))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Small fixtures shared by the model tests.

    use crate::config::Config;
    use crate::model::{
        BettingLine, Game, InjuryStatus, Player, PlayerSeasonStat, Position, TeamSeasonStat,
        TeamSide,
    };
    use crate::snapshot::Snapshot;
    use chrono::{DateTime, TimeZone, Utc};

    pub fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 19, 12, 0, 0).unwrap()
    }

    pub fn config() -> Config {
        let mut config = Config::default();
        config.percentile.min_teams = 2;
        config.eligibility.require_prop = false;
        config
    }

    pub fn player(id: &str, position: Position, team: &str) -> Player {
        Player {
            id: id.into(),
            name: id.to_uppercase(),
            position,
            team: team.into(),
            injury_status: InjuryStatus::Active,
        }
    }

    pub fn season(id: &str) -> PlayerSeasonStat {
        PlayerSeasonStat {
            player_id: id.into(),
            season: 2025,
            games_played: 6,
            ..Default::default()
        }
    }

    /// Teams with pass/rush yards allowed and sacks generated over 6 games.
    pub fn team(name: &str, pass_allowed: f64, rush_allowed: f64, sacks: f64) -> TeamSeasonStat {
        TeamSeasonStat {
            team: name.into(),
            season: 2025,
            games_played: 6,
            own: TeamSide {
                sacks: Some(sacks),
                interceptions: Some(5.0),
                fumbles_lost: Some(3.0),
                ..Default::default()
            },
            opp: TeamSide {
                passing_yards: Some(pass_allowed),
                rushing_yards: Some(rush_allowed),
                sacks: Some(sacks),
                interceptions: Some(5.0),
                fumbles_lost: Some(3.0),
                red_zone_attempts: Some(20.0),
                red_zone_scores: Some(pass_allowed / 150.0),
                ..Default::default()
            },
        }
    }

    pub fn game(id: &str, home: &str, away: &str) -> Game {
        Game {
            id: id.into(),
            season: 2025,
            week: 7,
            home_team: home.into(),
            away_team: away.into(),
            kickoff: None,
        }
    }

    pub fn line(game_id: &str, spread: f64, total: f64) -> BettingLine {
        BettingLine {
            game_id: game_id.into(),
            vendor: "draftkings".into(),
            spread: Some(spread),
            total: Some(total),
            home_moneyline: None,
            away_moneyline: None,
            updated_at: as_of(),
        }
    }

    pub fn snapshot() -> Snapshot {
        Snapshot {
            season: 2025,
            week: 7,
            ..Default::default()
        }
    }
}
