//! Game core for the mine-reveal betting game.
//!
//! The escrow contract owns stakes, payouts and balances. This crate keeps a
//! local board in step with it: [`SessionMachine`] validates player actions,
//! issues escrow calls one at a time and only commits local state once the
//! escrow has confirmed.

pub use board::*;
pub use collaborators::*;
pub use config::*;
pub use context::*;
pub use difficulty::*;
pub use earnings::*;
pub use error::*;
pub use generator::*;
pub use leaderboard::*;
pub use session::*;
pub use types::*;
pub use wallet::*;

pub use lemon_miner_protocol as protocol;
pub use lemon_miner_protocol::{Address, LeaderboardEntry, PlayerStats, TxReceipt, Wei};

mod board;
mod collaborators;
mod config;
mod context;
mod difficulty;
mod earnings;
mod error;
mod generator;
mod leaderboard;
mod session;
mod types;
mod wallet;

#[cfg(test)]
mod testing;
