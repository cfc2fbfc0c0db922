// Betting market helpers: value coercion, spread normalization, implied
// probabilities, and canonical selection of one quote per game / per player.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::model::{BettingLine, Game, PlayerProp};

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Parse a spread or total. "PK"/"PICK"/"PICKEM" mean a zero spread; signed
/// numbers parse; anything else is absent.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    match s.to_uppercase().as_str() {
        "PK" | "PICK" | "PICKEM" | "PICK'EM" => return Some(0.0),
        _ => {}
    }
    let v: f64 = s.trim_start_matches('+').parse().ok()?;
    v.is_finite().then_some(v)
}

/// Parse an American moneyline. "EVEN"/"EV" are +100.
pub fn coerce_moneyline(raw: &str) -> Option<f64> {
    let s = raw.trim();
    match s.to_uppercase().as_str() {
        "EVEN" | "EV" => Some(100.0),
        _ => s
            .trim_start_matches('+')
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite()),
    }
}

// ---------------------------------------------------------------------------
// Spread and probability
// ---------------------------------------------------------------------------

/// Flip a home-perspective spread whose sign disagrees with the moneylines.
///
/// If the home moneyline is the shorter price the home team is the favorite,
/// so the spread must not be positive (and vice versa). Without both
/// moneylines the spread is returned unchanged.
pub fn normalize_spread(
    spread: Option<f64>,
    home_moneyline: Option<f64>,
    away_moneyline: Option<f64>,
) -> Option<f64> {
    let spread = spread?;
    let (Some(home), Some(away)) = (home_moneyline, away_moneyline) else {
        return Some(spread);
    };
    if home == away {
        return Some(spread);
    }
    let home_favored = home < away;
    if home_favored && spread > 0.0 {
        return Some(-spread.abs());
    }
    if !home_favored && spread < 0.0 {
        return Some(spread.abs());
    }
    Some(spread)
}

/// Raw implied probability of an American moneyline (includes the vig).
pub fn implied_probability(moneyline: f64) -> f64 {
    if moneyline == 0.0 {
        0.5
    } else if moneyline < 0.0 {
        moneyline.abs() / (moneyline.abs() + 100.0)
    } else {
        100.0 / (moneyline + 100.0)
    }
}

/// No-vig win probability for the home team, clamped to [0.01, 0.99].
pub fn no_vig_home_probability(home_moneyline: Option<f64>, away_moneyline: Option<f64>) -> Option<f64> {
    let home = implied_probability(home_moneyline?);
    let away = implied_probability(away_moneyline?);
    let total = home + away;
    if total <= 0.0 {
        return None;
    }
    Some((home / total).clamp(0.01, 0.99))
}

// ---------------------------------------------------------------------------
// Canonical selection
// ---------------------------------------------------------------------------

/// Pick one line per game: newest `updated_at`, ties broken by vendor name.
/// Quotes are never averaged. The returned line has its spread normalized.
pub fn canonical_lines(lines: &[BettingLine]) -> HashMap<String, BettingLine> {
    let mut best: HashMap<String, &BettingLine> = HashMap::new();
    for line in lines {
        match best.get(line.game_id.as_str()) {
            Some(current) if !line_is_newer(line, current) => {}
            _ => {
                best.insert(line.game_id.clone(), line);
            }
        }
    }
    best.into_iter()
        .map(|(game_id, line)| {
            let mut line = line.clone();
            line.spread = normalize_spread(line.spread, line.home_moneyline, line.away_moneyline);
            (game_id, line)
        })
        .collect()
}

fn line_is_newer(candidate: &BettingLine, current: &BettingLine) -> bool {
    candidate
        .updated_at
        .cmp(&current.updated_at)
        .then_with(|| current.vendor.cmp(&candidate.vendor))
        .is_gt()
}

/// Key for canonical prop lookups: (player_id, game_id).
pub type PropKey = (String, String);

/// Pick one prop quote per (player, game).
///
/// Quotes of `preferred_type(player_id)` win over other markets when any
/// exist. Among the remaining candidates the newest `updated_at` wins, then
/// vendor name, then prop type (both ascending). When `max_age` is given,
/// quotes older than `as_of - max_age` are dropped first, so a stale quote
/// behaves exactly like a missing one.
pub fn canonical_props<F>(
    props: &[PlayerProp],
    preferred_type: F,
    as_of: DateTime<Utc>,
    max_age: Option<Duration>,
) -> HashMap<PropKey, PlayerProp>
where
    F: Fn(&str) -> Option<&'static str>,
{
    let cutoff = max_age.map(|age| as_of - age);
    let mut best: HashMap<PropKey, &PlayerProp> = HashMap::new();

    for prop in props {
        if let Some(cutoff) = cutoff {
            if prop.updated_at < cutoff {
                debug!(
                    player_id = %prop.player_id,
                    game_id = %prop.game_id,
                    vendor = %prop.vendor,
                    "dropping stale prop quote"
                );
                continue;
            }
        }
        let preferred = preferred_type(&prop.player_id);
        let key = (prop.player_id.clone(), prop.game_id.clone());
        match best.get(&key) {
            Some(current) if !prop_is_better(prop, current, preferred) => {}
            _ => {
                best.insert(key, prop);
            }
        }
    }

    best.into_iter().map(|(k, p)| (k, p.clone())).collect()
}

fn prop_is_better(candidate: &PlayerProp, current: &PlayerProp, preferred: Option<&str>) -> bool {
    let is_preferred = |p: &PlayerProp| preferred.is_some_and(|t| p.prop_type == t);
    is_preferred(candidate)
        .cmp(&is_preferred(current))
        .then_with(|| candidate.updated_at.cmp(&current.updated_at))
        .then_with(|| current.vendor.cmp(&candidate.vendor))
        .then_with(|| current.prop_type.cmp(&candidate.prop_type))
        .is_gt()
}

// ---------------------------------------------------------------------------
// Per-team game context
// ---------------------------------------------------------------------------

/// Market-implied context for one team in one game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GameContext {
    pub total: Option<f64>,
    /// Team perspective: negative = favored, positive = underdog.
    pub spread: Option<f64>,
    pub win_probability: Option<f64>,
}

impl GameContext {
    /// Build the context for `team` from the game's canonical line.
    pub fn for_team(game: &Game, team: &str, line: Option<&BettingLine>) -> Self {
        let Some(line) = line else {
            return GameContext::default();
        };
        let home = game.is_home(team);
        let spread = line.spread.map(|s| if home { s } else { -s });
        let win_probability = no_vig_home_probability(line.home_moneyline, line.away_moneyline)
            .map(|p| if home { p } else { 1.0 - p });
        GameContext {
            total: line.total,
            spread,
            win_probability,
        }
    }

    pub fn is_favorite(&self) -> bool {
        self.spread.is_some_and(|s| s < 0.0)
    }

    pub fn is_underdog(&self) -> bool {
        self.spread.is_some_and(|s| s > 0.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropMarket;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 19, hour, 0, 0).unwrap()
    }

    fn line(game: &str, vendor: &str, spread: f64, total: f64, hour: u32) -> BettingLine {
        BettingLine {
            game_id: game.into(),
            vendor: vendor.into(),
            spread: Some(spread),
            total: Some(total),
            home_moneyline: None,
            away_moneyline: None,
            updated_at: ts(hour),
        }
    }

    fn prop(player: &str, vendor: &str, prop_type: &str, line: f64, hour: u32) -> PlayerProp {
        PlayerProp {
            player_id: player.into(),
            game_id: "g1".into(),
            vendor: vendor.into(),
            prop_type: prop_type.into(),
            market: PropMarket::OverUnder {
                line,
                over_odds: Some(-110.0),
                under_odds: Some(-110.0),
            },
            updated_at: ts(hour),
        }
    }

    #[test]
    fn coerce_handles_pickem_and_signs() {
        assert_eq!(coerce_number("PK"), Some(0.0));
        assert_eq!(coerce_number("pick"), Some(0.0));
        assert_eq!(coerce_number("+3.5"), Some(3.5));
        assert_eq!(coerce_number("-7"), Some(-7.0));
        assert_eq!(coerce_number(" 47.5 "), Some(47.5));
        assert_eq!(coerce_number("n/a"), None);
        assert_eq!(coerce_number(""), None);
        assert_eq!(coerce_number("inf"), None);
    }

    #[test]
    fn coerce_moneyline_even() {
        assert_eq!(coerce_moneyline("EVEN"), Some(100.0));
        assert_eq!(coerce_moneyline("-150"), Some(-150.0));
        assert_eq!(coerce_moneyline("+130"), Some(130.0));
        assert_eq!(coerce_moneyline("off"), None);
    }

    #[test]
    fn spread_flipped_when_moneylines_disagree() {
        // Home is favored by moneyline but spread says +3.5.
        assert_eq!(normalize_spread(Some(3.5), Some(-180.0), Some(150.0)), Some(-3.5));
        // Away favored, spread says -6.
        assert_eq!(normalize_spread(Some(-6.0), Some(200.0), Some(-240.0)), Some(6.0));
        // Consistent spread untouched.
        assert_eq!(normalize_spread(Some(-3.0), Some(-150.0), Some(130.0)), Some(-3.0));
        // No moneylines: untouched.
        assert_eq!(normalize_spread(Some(4.0), None, None), Some(4.0));
        assert_eq!(normalize_spread(None, Some(-150.0), Some(130.0)), None);
    }

    #[test]
    fn implied_probability_formulae() {
        assert!((implied_probability(-150.0) - 0.6).abs() < 1e-9);
        assert!((implied_probability(150.0) - 0.4).abs() < 1e-9);
        assert!((implied_probability(0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn no_vig_probability_sums_to_one() {
        let home = no_vig_home_probability(Some(-150.0), Some(130.0)).unwrap();
        let raw_home = 0.6;
        let raw_away = 100.0 / 230.0;
        assert!((home - raw_home / (raw_home + raw_away)).abs() < 1e-9);
        assert_eq!(no_vig_home_probability(None, Some(130.0)), None);
    }

    #[test]
    fn canonical_line_is_most_recent() {
        let lines = vec![
            line("g1", "draftkings", -3.0, 47.5, 10),
            line("g1", "fanduel", -3.5, 48.5, 12),
            line("g1", "caesars", -2.5, 46.5, 11),
        ];
        let canon = canonical_lines(&lines);
        let chosen = &canon["g1"];
        assert_eq!(chosen.vendor, "fanduel");
        assert_eq!(chosen.total, Some(48.5));
    }

    #[test]
    fn canonical_line_tie_breaks_by_vendor() {
        let lines = vec![
            line("g1", "fanduel", -3.5, 48.5, 12),
            line("g1", "betmgm", -3.0, 47.0, 12),
        ];
        let canon = canonical_lines(&lines);
        assert_eq!(canon["g1"].vendor, "betmgm");
        // Input order does not matter.
        let reversed: Vec<_> = lines.into_iter().rev().collect();
        assert_eq!(canonical_lines(&reversed)["g1"].vendor, "betmgm");
    }

    #[test]
    fn canonical_prop_prefers_primary_market_then_recency() {
        let props = vec![
            prop("p1", "draftkings", "receptions", 5.5, 14),
            prop("p1", "draftkings", "receiving_yards", 64.5, 10),
            prop("p1", "fanduel", "receiving_yards", 66.5, 12),
        ];
        let canon = canonical_props(&props, |_| Some("receiving_yards"), ts(20), None);
        let chosen = &canon[&("p1".to_string(), "g1".to_string())];
        assert_eq!(chosen.vendor, "fanduel");
        assert_eq!(chosen.market.line_value(), Some(66.5));
    }

    #[test]
    fn canonical_prop_falls_back_to_any_market() {
        let props = vec![prop("p1", "draftkings", "receptions", 5.5, 14)];
        let canon = canonical_props(&props, |_| Some("receiving_yards"), ts(20), None);
        assert_eq!(canon.len(), 1);
    }

    #[test]
    fn stale_props_are_absent() {
        let props = vec![prop("p1", "draftkings", "receiving_yards", 64.5, 1)];
        let canon = canonical_props(
            &props,
            |_| Some("receiving_yards"),
            ts(20),
            Some(Duration::hours(6)),
        );
        assert!(canon.is_empty());
        let canon = canonical_props(&props, |_| Some("receiving_yards"), ts(20), None);
        assert_eq!(canon.len(), 1);
    }

    #[test]
    fn game_context_flips_for_away_team() {
        let game = Game {
            id: "g1".into(),
            season: 2025,
            week: 7,
            home_team: "KC".into(),
            away_team: "LV".into(),
            kickoff: None,
        };
        let mut l = line("g1", "dk", -7.5, 44.5, 10);
        l.home_moneyline = Some(-350.0);
        l.away_moneyline = Some(280.0);

        let home = GameContext::for_team(&game, "KC", Some(&l));
        let away = GameContext::for_team(&game, "LV", Some(&l));
        assert_eq!(home.spread, Some(-7.5));
        assert_eq!(away.spread, Some(7.5));
        assert!(home.is_favorite() && !home.is_underdog());
        assert!(away.is_underdog());
        let p = home.win_probability.unwrap() + away.win_probability.unwrap();
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn game_context_without_line_is_empty() {
        let game = Game {
            id: "g1".into(),
            season: 2025,
            week: 7,
            home_team: "KC".into(),
            away_team: "LV".into(),
            kickoff: None,
        };
        let ctx = GameContext::for_team(&game, "KC", None);
        assert_eq!(ctx, GameContext::default());
        assert!(!ctx.is_favorite() && !ctx.is_underdog());
    }
}
