// Declarative factor scoring: each factor is an ordered threshold ladder held
// as data, scaled to that factor's weight cap.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Ladders
// ---------------------------------------------------------------------------

/// How a ladder threshold is compared with the input value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Row matches when `value >= threshold`.
    AtLeast,
    /// Row matches when `value <= threshold`.
    AtMost,
}

/// Ordered `(threshold, fraction)` rows evaluated top-down, first match wins.
/// Values matching no row get `floor`.
#[derive(Debug, Clone, Copy)]
pub struct Ladder {
    pub comparison: Comparison,
    pub steps: &'static [(f64, f64)],
    pub floor: f64,
}

impl Ladder {
    pub const fn at_least(steps: &'static [(f64, f64)], floor: f64) -> Self {
        Self {
            comparison: Comparison::AtLeast,
            steps,
            floor,
        }
    }

    pub const fn at_most(steps: &'static [(f64, f64)], floor: f64) -> Self {
        Self {
            comparison: Comparison::AtMost,
            steps,
            floor,
        }
    }

    /// Fraction of the weight cap earned by `value`, in [0, 1].
    pub fn fraction(&self, value: f64) -> f64 {
        let hit = self.steps.iter().find(|(threshold, _)| match self.comparison {
            Comparison::AtLeast => value >= *threshold,
            Comparison::AtMost => value <= *threshold,
        });
        hit.map(|(_, f)| *f).unwrap_or(self.floor).clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Factor kinds
// ---------------------------------------------------------------------------

/// Every signal a position model can score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    // Pass-catcher
    AirYardsShare,
    DepthOfTarget,
    Separation,
    QuarterbackEfficiency,
    ReceiverGameScript,
    CatchRate,
    TargetVolume,
    // Rusher
    OpponentRunDefense,
    OpponentTurnoverDifferential,
    FavoriteStatus,
    RushingEfficiency,
    RushVolume,
    BackfieldRole,
    ReceivingUpside,
    // Passer
    PocketProtection,
    ShootoutPotential,
    CompletionEfficiency,
    Aggressiveness,
    UnderdogScript,
    RedZoneWeakness,
    // Shared
    OpponentPassDefense,
}

impl FactorKind {
    pub fn label(&self) -> &'static str {
        match self {
            FactorKind::AirYardsShare => "air yards share",
            FactorKind::DepthOfTarget => "depth of target",
            FactorKind::Separation => "separation",
            FactorKind::QuarterbackEfficiency => "quarterback efficiency",
            FactorKind::ReceiverGameScript => "game script",
            FactorKind::CatchRate => "catch rate",
            FactorKind::TargetVolume => "target volume",
            FactorKind::OpponentRunDefense => "opponent run defense",
            FactorKind::OpponentTurnoverDifferential => "opponent turnover differential",
            FactorKind::FavoriteStatus => "favorite status",
            FactorKind::RushingEfficiency => "rushing efficiency",
            FactorKind::RushVolume => "rushing volume",
            FactorKind::BackfieldRole => "backfield role",
            FactorKind::ReceivingUpside => "receiving upside",
            FactorKind::PocketProtection => "pocket protection",
            FactorKind::ShootoutPotential => "shootout potential",
            FactorKind::CompletionEfficiency => "completion efficiency",
            FactorKind::Aggressiveness => "aggressiveness",
            FactorKind::UnderdogScript => "underdog script",
            FactorKind::RedZoneWeakness => "opponent red zone weakness",
            FactorKind::OpponentPassDefense => "opponent pass defense",
        }
    }
}

// ---------------------------------------------------------------------------
// Factor specs and scores
// ---------------------------------------------------------------------------

/// One row of a position model's factor table.
#[derive(Debug, Clone, Copy)]
pub struct FactorSpec {
    pub kind: FactorKind,
    pub weight: f64,
    pub ladder: Ladder,
}

impl FactorSpec {
    /// Score an input against this factor. A missing input contributes 0.
    pub fn score(&self, input: Option<f64>) -> FactorScore {
        let score = match input.filter(|v| v.is_finite()) {
            Some(v) => round1(self.weight * self.ladder.fraction(v)).min(self.weight),
            None => 0.0,
        };
        FactorScore {
            factor: self.kind,
            input,
            score,
            max: self.weight,
        }
    }
}

/// A realized sub-score, with the raw input that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorScore {
    pub factor: FactorKind,
    pub input: Option<f64>,
    pub score: f64,
    pub max: f64,
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Sum of weight caps in a table.
pub fn total_weight(table: &[FactorSpec]) -> f64 {
    table.iter().map(|f| f.weight).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const UP: Ladder = Ladder::at_least(&[(10.0, 1.0), (5.0, 0.5)], 0.1);
    const DOWN: Ladder = Ladder::at_most(&[(-5.0, 1.0), (0.0, 0.4)], 0.0);

    #[test]
    fn at_least_first_match_wins() {
        assert_eq!(UP.fraction(12.0), 1.0);
        assert_eq!(UP.fraction(10.0), 1.0);
        assert_eq!(UP.fraction(7.0), 0.5);
        assert_eq!(UP.fraction(1.0), 0.1);
    }

    #[test]
    fn at_most_first_match_wins() {
        assert_eq!(DOWN.fraction(-8.0), 1.0);
        assert_eq!(DOWN.fraction(-1.0), 0.4);
        assert_eq!(DOWN.fraction(3.0), 0.0);
    }

    #[test]
    fn score_scales_to_weight_and_rounds() {
        let spec = FactorSpec {
            kind: FactorKind::Separation,
            weight: 15.0,
            ladder: Ladder::at_least(&[(3.0, 0.7)], 0.0),
        };
        let s = spec.score(Some(3.2));
        assert_eq!(s.score, 10.5);
        assert_eq!(s.max, 15.0);
        assert_eq!(s.factor, FactorKind::Separation);
    }

    #[test]
    fn missing_or_non_finite_input_scores_zero() {
        let spec = FactorSpec {
            kind: FactorKind::CatchRate,
            weight: 5.0,
            ladder: UP,
        };
        assert_eq!(spec.score(None).score, 0.0);
        assert_eq!(spec.score(Some(f64::NAN)).score, 0.0);
        // Floor applies to present values only.
        assert_eq!(spec.score(Some(0.0)).score, 0.5);
    }

    #[test]
    fn round1_behaviour() {
        assert_eq!(round1(12.34), 12.3);
        assert_eq!(round1(12.36), 12.4);
        assert_eq!(round1(0.0), 0.0);
    }
}
