use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Wei};

/// Per-player totals as tracked by the escrow contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub total_games: u64,
    pub total_wins: u64,
    pub total_losses: u64,
    pub total_earnings: Wei,
}

/// Acknowledgement of a mined escrow transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

/// Record kept by the leaderboard store, one per account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub address: Address,
    pub total_games: u64,
    pub wins: u64,
    pub losses: u64,
    pub total_earnings: Wei,
    pub last_updated: DateTime<Utc>,
}

impl LeaderboardEntry {
    pub fn from_stats(address: Address, stats: &PlayerStats, last_updated: DateTime<Utc>) -> Self {
        Self {
            address,
            total_games: stats.total_games,
            wins: stats.total_wins,
            losses: stats.total_losses,
            total_earnings: stats.total_earnings,
            last_updated,
        }
    }

    /// Share of won games in percent, `0.0` for a player with no games.
    pub fn win_rate(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            self.wins as f64 / self.total_games as f64 * 100.0
        }
    }
}
