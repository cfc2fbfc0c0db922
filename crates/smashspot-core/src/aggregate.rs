// Composite aggregation and matchup flags.
//
// The composite is the rounded sum of the already-rounded sub-scores. Flags
// describe the strongest sub-scores and never feed back into scoring.

use serde::Serialize;

use crate::context::MatchupContext;
use crate::eligibility::Eligible;
use crate::factors::{round1, FactorKind, FactorScore};
use crate::model::{PlayerSeasonStat, Position, PositionModel};
use crate::percentile::{percentile_to_rank, TeamMetric};

/// Raw context shown next to the scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MatchupInputs {
    /// Opponent's 1..=32 rank on the model's headline defensive metric
    /// (#32 = most exploitable).
    pub opponent_rank: u8,
    pub opponent_yards_allowed_per_game: Option<f64>,
    pub game_total: Option<f64>,
    /// Team perspective: negative = favored.
    pub spread: Option<f64>,
    pub win_probability: Option<f64>,
    pub games_played: u32,
}

/// One scored (player, game) row. Built fresh on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupScore {
    pub game_id: String,
    pub season: i32,
    pub week: u32,
    pub player_id: String,
    pub player_name: String,
    pub position: Position,
    pub model: PositionModel,
    pub team: String,
    pub opponent: String,
    pub factors: Vec<FactorScore>,
    pub composite_score: f64,
    pub flags: Vec<String>,
    pub prop_type: Option<String>,
    pub prop_vendor: Option<String>,
    pub prop_line: Option<f64>,
    pub inputs: MatchupInputs,
}

/// Composite = sum of sub-scores, rounded to one decimal.
pub fn composite(factors: &[FactorScore]) -> f64 {
    round1(factors.iter().map(|f| f.score).sum())
}

/// Headline defensive metric for a model: the one the opponent rank and
/// yards-allowed figures refer to.
fn headline_metric(model: PositionModel) -> TeamMetric {
    match model {
        PositionModel::Rusher => TeamMetric::RushYardsAllowedPerGame,
        PositionModel::PassCatcher | PositionModel::Passer => TeamMetric::PassYardsAllowedPerGame,
    }
}

fn matchup_inputs(player: &Eligible<'_>, ctx: &MatchupContext<'_>) -> MatchupInputs {
    let metric = headline_metric(player.model);
    let opponent_yards_allowed_per_game = ctx.team_stats(player.opponent).and_then(|t| {
        let allowed = match player.model {
            PositionModel::Rusher => t.opp.rushing_yards,
            _ => t.opp.passing_yards,
        };
        t.per_game(allowed)
    });
    let game = ctx.game_context(player.game, &player.player.team);
    MatchupInputs {
        opponent_rank: percentile_to_rank(ctx.ranks().get(metric, player.opponent)),
        opponent_yards_allowed_per_game,
        game_total: game.total,
        spread: game.spread,
        win_probability: game.win_probability,
        games_played: player.stats.games_played,
    }
}

/// Assemble the output row for one scored player.
pub fn aggregate(
    player: &Eligible<'_>,
    factors: Vec<FactorScore>,
    ctx: &MatchupContext<'_>,
    flags_per_player: usize,
) -> MatchupScore {
    let inputs = matchup_inputs(player, ctx);
    let fallbacks = stat_flags(player.model, player.stats);
    let flags = top_flags(&factors, &inputs, &fallbacks, flags_per_player);
    MatchupScore {
        game_id: player.game.id.clone(),
        season: ctx.season,
        week: ctx.week,
        player_id: player.player.id.clone(),
        player_name: player.player.name.clone(),
        position: player.player.position,
        model: player.model,
        team: player.player.team.clone(),
        opponent: player.opponent.to_string(),
        composite_score: composite(&factors),
        factors,
        flags,
        prop_type: player.prop.map(|p| p.prop_type.clone()),
        prop_vendor: player.prop.map(|p| p.vendor.clone()),
        prop_line: player.prop.and_then(|p| p.market.line_value()),
        inputs,
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// A season-stat line used to pad flags when too few sub-scores are non-zero.
/// `covers` names the factor whose flag already says the same thing.
#[derive(Debug, Clone, PartialEq)]
pub struct StatFlag {
    pub covers: Option<FactorKind>,
    pub text: String,
}

/// Season-volume fallback flags for a model, in preference order. Stats
/// that are zero or missing produce nothing.
pub fn stat_flags(model: PositionModel, stats: &PlayerSeasonStat) -> Vec<StatFlag> {
    let per_game = |total: u32| stats.per_game(total as f64).filter(|v| *v > 0.0);
    let ratio = |num: f64, den: u32| (den > 0 && num > 0.0).then(|| num / den as f64);

    let candidates = match model {
        PositionModel::PassCatcher => vec![
            (
                Some(FactorKind::TargetVolume),
                per_game(stats.targets).map(|v| format!("Averages {v:.1} targets per game")),
            ),
            (
                Some(FactorKind::CatchRate),
                ratio(stats.receptions as f64 * 100.0, stats.targets)
                    .map(|v| format!("Reliable hands with {v:.0}% catch rate")),
            ),
        ],
        PositionModel::Rusher => vec![
            (
                Some(FactorKind::RushVolume),
                per_game(stats.rush_attempts).map(|v| format!("Sees {v:.1} carries per game")),
            ),
            (
                None,
                ratio(stats.rush_yards, stats.rush_attempts)
                    .map(|v| format!("Averages {v:.1} yards per carry")),
            ),
        ],
        PositionModel::Passer => vec![
            (
                None,
                per_game(stats.pass_attempts).map(|v| format!("Throws {v:.1} passes per game")),
            ),
            (
                None,
                stats
                    .qb_rating
                    .filter(|r| *r > 0.0)
                    .map(|r| format!("QB rating of {r:.1} this season")),
            ),
        ],
    };

    candidates
        .into_iter()
        .filter_map(|(covers, text)| text.map(|text| StatFlag { covers, text }))
        .collect()
}

/// Render the `n` highest non-zero sub-scores, ties kept in table order,
/// then pad from `fallbacks` until `n` flags exist or fallbacks run out.
pub fn top_flags(
    factors: &[FactorScore],
    inputs: &MatchupInputs,
    fallbacks: &[StatFlag],
    n: usize,
) -> Vec<String> {
    let mut ranked: Vec<&FactorScore> = factors.iter().filter(|f| f.score > 0.0).collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut flagged: Vec<FactorKind> = Vec::new();
    let mut flags: Vec<String> = Vec::new();
    for f in ranked {
        if flags.len() >= n {
            break;
        }
        if let Some(text) = render_flag(f, inputs) {
            flagged.push(f.factor);
            flags.push(text);
        }
    }

    for fallback in fallbacks {
        if flags.len() >= n {
            break;
        }
        if fallback.covers.is_some_and(|k| flagged.contains(&k)) || flags.contains(&fallback.text) {
            continue;
        }
        flags.push(fallback.text.clone());
    }
    flags
}

/// English ordinal suffix: 1st, 2nd, 3rd, 4th, 11th, 21st, 52nd.
fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn render_flag(f: &FactorScore, inputs: &MatchupInputs) -> Option<String> {
    let v = f.input?;
    let rank = percentile_to_rank(v);
    let allowed = inputs
        .opponent_yards_allowed_per_game
        .map(|y| format!(" (allows {y:.0} YPG)"))
        .unwrap_or_default();

    let text = match f.factor {
        FactorKind::AirYardsShare => format!("Commands {v:.0}% of team air yards"),
        FactorKind::DepthOfTarget => format!("Average depth of target {v:.1} yards downfield"),
        FactorKind::Separation => format!("Creates {v:.1} yards of separation"),
        FactorKind::OpponentPassDefense => format!("Facing #{rank} ranked pass defense{allowed}"),
        FactorKind::QuarterbackEfficiency => format!("QB completing {v:+.1}% over expected"),
        FactorKind::ReceiverGameScript => {
            // The input carries the underdog bonus; show the market total.
            let total = inputs.game_total.unwrap_or(v);
            match inputs.spread {
                Some(s) if s > 0.0 => {
                    format!("High-scoring environment ({total:.1} O/U) + trailing script")
                }
                _ => format!("High-scoring environment ({total:.1} O/U)"),
            }
        }
        FactorKind::CatchRate => format!("Reliable hands with {v:.0}% catch rate"),
        FactorKind::TargetVolume => format!("Averages {v:.1} targets per game"),
        FactorKind::OpponentRunDefense => format!("Facing #{rank} ranked run defense{allowed}"),
        FactorKind::OpponentTurnoverDifferential if v <= -3.0 => {
            format!("Giveaway-prone opponent ({v:+.0} turnover differential)")
        }
        FactorKind::OpponentTurnoverDifferential if v <= 0.0 => {
            format!("Opponent turnover differential of {v:+.0}")
        }
        FactorKind::OpponentTurnoverDifferential => {
            format!("Opponent protects the ball ({v:+.0} turnover differential)")
        }
        FactorKind::FavoriteStatus if v <= -1.0 => format!("Favored by {:.1} points", v.abs()),
        FactorKind::FavoriteStatus if v < 1.0 => format!("Near pick'em game script ({v:+.1})"),
        FactorKind::FavoriteStatus => format!("{v:.1}-point underdog"),
        FactorKind::RushingEfficiency => format!("{v:+.2} rush yards over expected per carry"),
        FactorKind::RushVolume => format!("Sees {v:.1} carries per game"),
        FactorKind::BackfieldRole if v <= 1.0 => "Lead back in the rotation".to_string(),
        FactorKind::BackfieldRole => format!("#{v:.0} back in the rotation"),
        FactorKind::ReceivingUpside => format!("Pass-catching upside with {v:.0} targets"),
        FactorKind::PocketProtection => {
            let pct = (v.clamp(0.0, 1.0) * 100.0).round() as u32;
            format!("Clean pocket outlook ({} percentile protection)", ordinal(pct))
        }
        FactorKind::ShootoutPotential => format!("Shootout potential with {v:.1} O/U"),
        FactorKind::CompletionEfficiency => format!("{v:+.1} completion % above expectation"),
        FactorKind::Aggressiveness => format!("Attacks tight windows on {v:.1}% of throws"),
        FactorKind::UnderdogScript => format!("{v:.1}-point underdog (pass-heavy trailing script)"),
        FactorKind::RedZoneWeakness => format!("Opponent red zone defense ranked #{rank}"),
    };
    Some(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
