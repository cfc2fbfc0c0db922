// Per-request derived state: indexes over one snapshot, canonical market
// quotes, league percentile ranks, and teammate-derived inputs.
//
// Built once per scoring pass and only read afterwards, so the three
// position pipelines can share it across threads.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::Config;
use crate::market::{canonical_lines, canonical_props, GameContext, PropKey};
use crate::model::{
    BettingLine, Game, PassingAdvanced, Player, PlayerProp, PlayerSeasonStat, Position,
    PositionModel, ReceivingAdvanced, RushingAdvanced, TeamSeasonStat,
};
use crate::percentile::LeagueRanks;
use crate::snapshot::Snapshot;

/// First week number that belongs to the postseason.
pub const FIRST_POSTSEASON_WEEK: u32 = 19;

/// A player paired with everything the eligibility filter looks at.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'c> {
    pub player: &'c Player,
    pub model: PositionModel,
    pub game: Option<&'c Game>,
    pub stats: Option<&'c PlayerSeasonStat>,
    pub prop: Option<&'c PlayerProp>,
}

pub struct MatchupContext<'a> {
    pub season: i32,
    pub week: u32,
    players: &'a [Player],
    season_totals: HashMap<&'a str, PlayerSeasonStat>,
    passing: HashMap<&'a str, &'a PassingAdvanced>,
    rushing: HashMap<&'a str, &'a RushingAdvanced>,
    receiving: HashMap<&'a str, &'a ReceivingAdvanced>,
    team_stats: HashMap<&'a str, &'a TeamSeasonStat>,
    games_by_team: HashMap<&'a str, &'a Game>,
    lines: HashMap<String, BettingLine>,
    props: HashMap<PropKey, PlayerProp>,
    ranks: LeagueRanks,
    primary_passers: HashMap<&'a str, &'a str>,
    backfield_roles: HashMap<&'a str, u32>,
}

impl<'a> MatchupContext<'a> {
    pub fn build(snapshot: &'a Snapshot, config: &Config, as_of: DateTime<Utc>) -> Self {
        let season = snapshot.season;
        let week = snapshot.week;

        let season_totals = merge_season_totals(&snapshot.season_stats, season, week);

        let passing = snapshot
            .passing
            .iter()
            .filter(|r| r.season == season && r.week == 0)
            .map(|r| (r.player_id.as_str(), r))
            .collect();
        let rushing = snapshot
            .rushing
            .iter()
            .filter(|r| r.season == season && r.week == 0)
            .map(|r| (r.player_id.as_str(), r))
            .collect();
        let receiving = snapshot
            .receiving
            .iter()
            .filter(|r| r.season == season && r.week == 0)
            .map(|r| (r.player_id.as_str(), r))
            .collect();

        let season_team_stats: Vec<TeamSeasonStat> = snapshot
            .team_stats
            .iter()
            .filter(|t| t.season == season)
            .cloned()
            .collect();
        let ranks = LeagueRanks::compute(&season_team_stats, config.percentile.min_teams);
        let team_stats = snapshot
            .team_stats
            .iter()
            .filter(|t| t.season == season)
            .map(|t| (t.team.as_str(), t))
            .collect();

        let mut games_by_team: HashMap<&str, &Game> = HashMap::new();
        for game in snapshot
            .games
            .iter()
            .filter(|g| g.season == season && g.week == week)
        {
            games_by_team.insert(game.home_team.as_str(), game);
            games_by_team.insert(game.away_team.as_str(), game);
        }

        let lines = canonical_lines(&snapshot.lines);

        let models: HashMap<&str, PositionModel> = snapshot
            .players
            .iter()
            .filter_map(|p| p.position.model().map(|m| (p.id.as_str(), m)))
            .collect();
        let max_age = config
            .props
            .max_quote_age_hours
            .map(|h| Duration::hours(h as i64));
        let props = canonical_props(
            &snapshot.props,
            |player_id| models.get(player_id).map(|m| m.primary_prop_type()),
            as_of,
            max_age,
        );

        let primary_passers = primary_passers(&snapshot.players, &season_totals);
        let backfield_roles = backfield_roles(&snapshot.players, &season_totals);

        debug!(
            season,
            week,
            players = snapshot.players.len(),
            games = games_by_team.len() / 2,
            lines = lines.len(),
            props = props.len(),
            "built matchup context"
        );

        Self {
            season,
            week,
            players: &snapshot.players,
            season_totals,
            passing,
            rushing,
            receiving,
            team_stats,
            games_by_team,
            lines,
            props,
            ranks,
            primary_passers,
            backfield_roles,
        }
    }

    /// All players scored by `model`, in player-id order.
    pub fn candidates(&self, model: PositionModel) -> Vec<Candidate<'_>> {
        let mut out: Vec<Candidate<'_>> = self
            .players
            .iter()
            .filter(|p| p.position.model() == Some(model))
            .map(|player| {
                let game = self.games_by_team.get(player.team.as_str()).copied();
                let prop = game.and_then(|g| self.prop_for(&player.id, &g.id));
                Candidate {
                    player,
                    model,
                    game,
                    stats: self.season_totals.get(player.id.as_str()),
                    prop,
                }
            })
            .collect();
        out.sort_by(|a, b| a.player.id.cmp(&b.player.id));
        out
    }

    pub fn prop_for(&self, player_id: &str, game_id: &str) -> Option<&PlayerProp> {
        self.props.get(&(player_id.to_string(), game_id.to_string()))
    }

    pub fn line_for(&self, game_id: &str) -> Option<&BettingLine> {
        self.lines.get(game_id)
    }

    pub fn game_context(&self, game: &Game, team: &str) -> GameContext {
        GameContext::for_team(game, team, self.line_for(&game.id))
    }

    pub fn ranks(&self) -> &LeagueRanks {
        &self.ranks
    }

    pub fn season_totals(&self, player_id: &str) -> Option<&PlayerSeasonStat> {
        self.season_totals.get(player_id)
    }

    pub fn passing(&self, player_id: &str) -> Option<&PassingAdvanced> {
        self.passing.get(player_id).copied()
    }

    pub fn rushing(&self, player_id: &str) -> Option<&RushingAdvanced> {
        self.rushing.get(player_id).copied()
    }

    pub fn receiving(&self, player_id: &str) -> Option<&ReceivingAdvanced> {
        self.receiving.get(player_id).copied()
    }

    pub fn team_stats(&self, team: &str) -> Option<&TeamSeasonStat> {
        self.team_stats.get(team).copied()
    }

    /// The team's quarterback with the most season pass attempts.
    pub fn primary_passer(&self, team: &str) -> Option<&str> {
        self.primary_passers.get(team).copied()
    }

    /// 1-based rank of a back's rush attempts among same-team backs.
    pub fn backfield_role(&self, player_id: &str) -> Option<u32> {
        self.backfield_roles.get(player_id).copied()
    }
}

/// One stat row per player for the season. Postseason rows are folded in
/// only when scoring a postseason week.
fn merge_season_totals(
    rows: &[PlayerSeasonStat],
    season: i32,
    week: u32,
) -> HashMap<&str, PlayerSeasonStat> {
    let include_post = week >= FIRST_POSTSEASON_WEEK;
    let mut totals: HashMap<&str, PlayerSeasonStat> = HashMap::new();

    // Regular season first so the merged row keeps its qb_rating.
    let mut ordered: Vec<&PlayerSeasonStat> = rows
        .iter()
        .filter(|r| r.season == season && (include_post || !r.postseason))
        .collect();
    ordered.sort_by_key(|r| r.postseason);

    for row in ordered {
        match totals.get_mut(row.player_id.as_str()) {
            Some(existing) => existing.absorb(row),
            None => {
                totals.insert(row.player_id.as_str(), row.clone());
            }
        }
    }
    totals
}

fn primary_passers<'a>(
    players: &'a [Player],
    totals: &HashMap<&str, PlayerSeasonStat>,
) -> HashMap<&'a str, &'a str> {
    let mut best: HashMap<&str, (&str, u32)> = HashMap::new();
    for player in players.iter().filter(|p| p.position == Position::Quarterback) {
        let attempts = totals
            .get(player.id.as_str())
            .map(|s| s.pass_attempts)
            .unwrap_or(0);
        if attempts == 0 {
            continue;
        }
        let replace = match best.get(player.team.as_str()) {
            None => true,
            Some(&(id, att)) => attempts > att || (attempts == att && player.id.as_str() < id),
        };
        if replace {
            best.insert(player.team.as_str(), (player.id.as_str(), attempts));
        }
    }
    best.into_iter().map(|(team, (id, _))| (team, id)).collect()
}

fn backfield_roles<'a>(
    players: &'a [Player],
    totals: &HashMap<&str, PlayerSeasonStat>,
) -> HashMap<&'a str, u32> {
    let mut by_team: HashMap<&str, Vec<(&str, u32)>> = HashMap::new();
    for player in players.iter().filter(|p| p.position == Position::RunningBack) {
        let attempts = totals
            .get(player.id.as_str())
            .map(|s| s.rush_attempts)
            .unwrap_or(0);
        by_team
            .entry(player.team.as_str())
            .or_default()
            .push((player.id.as_str(), attempts));
    }

    let mut roles = HashMap::new();
    for backs in by_team.values() {
        for &(id, attempts) in backs {
            let ahead = backs.iter().filter(|(_, a)| *a > attempts).count() as u32;
            roles.insert(id, ahead + 1);
        }
    }
    roles
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
