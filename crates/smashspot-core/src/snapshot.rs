// The read-only input snapshot for one (season, week), and the collaborator
// traits that supply it.

use serde::Serialize;

use crate::model::{
    BettingLine, Game, PassingAdvanced, Player, PlayerProp, PlayerSeasonStat, ReceivingAdvanced,
    RushingAdvanced, TeamSeasonStat,
};

/// Every provider row the engine needs to score one week.
///
/// Advanced stats are the season aggregates (week 0). Season stats include
/// postseason rows; the context decides whether they count.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub season: i32,
    pub week: u32,
    pub players: Vec<Player>,
    pub games: Vec<Game>,
    pub season_stats: Vec<PlayerSeasonStat>,
    pub passing: Vec<PassingAdvanced>,
    pub rushing: Vec<RushingAdvanced>,
    pub receiving: Vec<ReceivingAdvanced>,
    pub team_stats: Vec<TeamSeasonStat>,
    pub lines: Vec<BettingLine>,
    pub props: Vec<PlayerProp>,
}

/// Source of input snapshots. Implemented by the SQLite store; tests build
/// snapshots in memory.
pub trait SnapshotSource {
    fn load_snapshot(&self, season: i32, week: u32) -> anyhow::Result<Snapshot>;
}

impl SnapshotSource for Snapshot {
    fn load_snapshot(&self, season: i32, week: u32) -> anyhow::Result<Snapshot> {
        if self.season == season && self.week == week {
            Ok(self.clone())
        } else {
            Ok(Snapshot {
                season,
                week,
                ..Default::default()
            })
        }
    }
}

/// Primary/secondary team colors as hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamColors {
    pub primary: String,
    pub secondary: Option<String>,
}

/// Static display data attached to feed entries. Never consulted by scoring.
pub trait DisplayMetadata {
    fn photo_url(&self, player_id: &str) -> Option<String>;
    fn team_colors(&self, team: &str) -> Option<TeamColors>;
}

impl DisplayMetadata for Snapshot {
    fn photo_url(&self, _player_id: &str) -> Option<String> {
        None
    }

    fn team_colors(&self, _team: &str) -> Option<TeamColors> {
        None
    }
}
