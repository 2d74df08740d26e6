use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;
use std::rc::Rc;

use crate::*;

pub type LeaderboardResult<T> = core::result::Result<T, LeaderboardError>;

/// Sending half handed to the session machine; entries are written by
/// [`LeaderboardSync::run`] without holding up the game.
pub type LeaderboardQueue = UnboundedSender<LeaderboardEntry>;

/// Remote key-value store keyed by account address.
#[allow(async_fn_in_trait)]
pub trait LeaderboardStore {
    async fn get_leaderboard(&self) -> LeaderboardResult<Vec<LeaderboardEntry>>;

    /// Replaces the record stored for `entry.address`.
    async fn update_player_stats(&self, entry: &LeaderboardEntry) -> LeaderboardResult<()>;
}

impl<T: LeaderboardStore> LeaderboardStore for Rc<T> {
    async fn get_leaderboard(&self) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        (**self).get_leaderboard().await
    }

    async fn update_player_stats(&self, entry: &LeaderboardEntry) -> LeaderboardResult<()> {
        (**self).update_player_stats(entry).await
    }
}

pub fn leaderboard_queue() -> (LeaderboardQueue, UnboundedReceiver<LeaderboardEntry>) {
    mpsc::unbounded()
}

pub struct LeaderboardSync<L: LeaderboardStore> {
    store: L,
}

impl<L: LeaderboardStore> LeaderboardSync<L> {
    pub fn new(store: L) -> Self {
        Self { store }
    }

    /// Best-effort write, failures are only logged.
    pub async fn push(&self, entry: &LeaderboardEntry) {
        match self.store.update_player_stats(entry).await {
            Ok(()) => log::debug!("Leaderboard updated for {}", entry.address),
            Err(err) => log::warn!("Failed to update leaderboard for {}: {}", entry.address, err),
        }
    }

    /// Entries ordered by total earnings, highest first. Ties keep the order
    /// the store returned them in.
    pub async fn read(&self) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        let mut entries = self.store.get_leaderboard().await?;
        entries.sort_by(|a, b| b.total_earnings.cmp(&a.total_earnings));
        Ok(entries)
    }

    /// Drains queued entries until every sender is gone.
    pub async fn run(&self, mut entries: UnboundedReceiver<LeaderboardEntry>) {
        while let Some(entry) = entries.next().await {
            self.push(&entry).await;
        }
        log::debug!("Leaderboard queue closed");
    }
}
