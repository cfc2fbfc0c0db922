// Feed assembly: run the three position pipelines for a (season, week),
// union, sort, truncate, and attach display metadata.

use std::cmp::Ordering;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::aggregate::{aggregate, MatchupScore};
use crate::config::Config;
use crate::context::MatchupContext;
use crate::eligibility::EligibilityRules;
use crate::model::PositionModel;
use crate::scoring::score_player;
use crate::snapshot::{DisplayMetadata, Snapshot, SnapshotSource, TeamColors};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedRequest {
    pub season: i32,
    pub week: u32,
    pub limit: usize,
    /// Reference time for prop staleness.
    pub as_of: DateTime<Utc>,
}

/// A scored row plus display metadata. Metadata never alters the score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    #[serde(flatten)]
    pub score: MatchupScore,
    pub photo_url: Option<String>,
    pub team_colors: Option<TeamColors>,
}

/// Feed order: composite descending, then player name, then player id.
pub fn feed_order(a: &MatchupScore, b: &MatchupScore) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| a.player_name.cmp(&b.player_name))
        .then_with(|| a.player_id.cmp(&b.player_id))
}

/// Run one position pipeline: candidates -> eligibility -> scoring ->
/// aggregation.
pub fn score_model(
    ctx: &MatchupContext<'_>,
    rules: &EligibilityRules,
    model: PositionModel,
    flags_per_player: usize,
) -> Vec<MatchupScore> {
    let candidates = ctx.candidates(model);
    let eligible = rules.filter(&candidates);
    info!(
        model = model.label(),
        candidates = candidates.len(),
        eligible = eligible.len(),
        "scored position model"
    );
    eligible
        .iter()
        .map(|player| {
            let factors = score_player(player, ctx);
            aggregate(player, factors, ctx, flags_per_player)
        })
        .collect()
}

/// Score every eligible player in the snapshot, in feed order. The three
/// models share nothing but the read-only context, so they run on scoped
/// threads.
pub fn score_week(snapshot: &Snapshot, config: &Config, as_of: DateTime<Utc>) -> Vec<MatchupScore> {
    let ctx = MatchupContext::build(snapshot, config, as_of);
    let rules = EligibilityRules::from(&config.eligibility);
    let flags = config.feed.flags_per_player;

    let mut rows: Vec<MatchupScore> = std::thread::scope(|scope| {
        let handles: Vec<_> = PositionModel::ALL
            .iter()
            .map(|&model| {
                let (ctx, rules) = (&ctx, &rules);
                scope.spawn(move || score_model(ctx, rules, model, flags))
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(rows) => rows,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    rows.sort_by(feed_order);
    rows
}

/// Load the snapshot, score it, and return the top `request.limit` rows
/// with display metadata attached. An empty week yields an empty feed.
pub fn build_feed<S>(source: &S, config: &Config, request: &FeedRequest) -> anyhow::Result<Vec<FeedEntry>>
where
    S: SnapshotSource + DisplayMetadata + ?Sized,
{
    let snapshot = source
        .load_snapshot(request.season, request.week)
        .with_context(|| {
            format!(
                "failed to load snapshot for season {} week {}",
                request.season, request.week
            )
        })?;

    let mut rows = score_week(&snapshot, config, request.as_of);
    let scored = rows.len();
    rows.truncate(request.limit);

    let entries: Vec<FeedEntry> = rows
        .into_iter()
        .map(|score| FeedEntry {
            photo_url: source.photo_url(&score.player_id),
            team_colors: source.team_colors(&score.team),
            score,
        })
        .collect();

    info!(
        season = request.season,
        week = request.week,
        scored,
        returned = entries.len(),
        "assembled feed"
    );
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::MatchupInputs;
    use crate::model::Position;

    fn row(id: &str, name: &str, composite: f64) -> MatchupScore {
        MatchupScore {
            game_id: "g1".into(),
            season: 2025,
            week: 7,
            player_id: id.into(),
            player_name: name.into(),
            position: Position::WideReceiver,
            model: PositionModel::PassCatcher,
            team: "KC".into(),
            opponent: "LV".into(),
            factors: vec![],
            composite_score: composite,
            flags: vec![],
            prop_type: None,
            prop_vendor: None,
            prop_line: None,
            inputs: MatchupInputs::default(),
        }
    }

    #[test]
    fn order_is_score_then_name_then_id() {
        let mut rows = vec![
            row("p3", "Bravo", 60.0),
            row("p2", "Alpha", 60.0),
            row("p1", "Alpha", 60.0),
            row("p4", "Zulu", 75.5),
        ];
        rows.sort_by(feed_order);
        let ids: Vec<_> = rows.iter().map(|r| r.player_id.as_str()).collect();
        assert_eq!(ids, vec!["p4", "p1", "p2", "p3"]);
    }

    #[test]
    fn empty_week_is_empty_feed() {
        let snap = Snapshot {
            season: 2025,
            week: 7,
            ..Default::default()
        };
        let request = FeedRequest {
            season: 2025,
            week: 7,
            limit: 25,
            as_of: Utc::now(),
        };
        let entries = build_feed(&snap, &Config::default(), &request).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn entry_serializes_flat() {
        let entry = FeedEntry {
            score: row("p1", "Alpha", 61.5),
            photo_url: Some("https://img.example/p1.png".into()),
            team_colors: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["player_id"], "p1");
        assert_eq!(json["composite_score"], 61.5);
        assert_eq!(json["position"], "WR");
        assert_eq!(json["model"], "pass_catcher");
        assert_eq!(json["photo_url"], "https://img.example/p1.png");
        assert!(json["team_colors"].is_null());
    }
}
