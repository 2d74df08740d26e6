use core::fmt;
use thiserror::Error;

use crate::Wei;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Board size must be at least 1")]
    InvalidSize,
    #[error("Too many hazards, {hazards} requested but the board has {cells} cells")]
    TooManyHazards { hazards: u16, cells: u16 },
    #[error("Invalid cell index")]
    InvalidIndex,
    #[error("Board shape does not match declared size")]
    InvalidBoardShape,
}

pub type Result<T> = core::result::Result<T, GameError>;

/// Escrow contract entry points, used to label failures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EscrowCall {
    StartGame,
    CompleteGame,
    Withdraw,
    PlayerStats,
    PlayerBalance,
    PlayerDeposit,
}

impl fmt::Display for EscrowCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use EscrowCall::*;
        f.write_str(match self {
            StartGame => "startGame",
            CompleteGame => "completeGame",
            Withdraw => "withdraw",
            PlayerStats => "getPlayerStats",
            PlayerBalance => "getPlayerBalance",
            PlayerDeposit => "getPlayerDeposit",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Transaction rejected by the wallet")]
    Rejected,
    #[error("Contract reverted: {0}")]
    Reverted(String),
    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No wallet provider available")]
    Unavailable,
    #[error("Request rejected by the user")]
    Rejected,
    #[error("Wallet error: {0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardError {
    #[error("Leaderboard store unavailable: {0}")]
    Unavailable(String),
    #[error("Leaderboard record could not be decoded: {0}")]
    Decode(String),
}

/// Errors surfaced to the player by session actions.
///
/// Re-clicking a revealed cell or revealing while no session is live are not
/// errors; those come back as [`crate::RevealOutcome::NoChange`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No wallet account connected")]
    NotConnected,
    #[error("A game session is already in progress")]
    SessionInProgress,
    #[error("There is no active game session")]
    NoActiveSession,
    #[error("There is nothing to withdraw")]
    NothingToWithdraw,
    #[error("Insufficient balance, {required} CBTC required but only {available} CBTC available")]
    InsufficientBalance { required: Wei, available: Wei },
    #[error("Another action is still pending")]
    Busy,
    #[error("Account changed while the request was pending")]
    Detached,
    #[error("Escrow {call} call failed: {source}")]
    Escrow {
        call: EscrowCall,
        #[source]
        source: EscrowError,
    },
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Game(#[from] GameError),
}

impl SessionError {
    /// Rejected before any external call was made.
    pub const fn is_preflight(&self) -> bool {
        use SessionError::*;
        matches!(
            self,
            NotConnected
                | SessionInProgress
                | NoActiveSession
                | NothingToWithdraw
                | InsufficientBalance { .. }
                | Busy
        )
    }
}

pub type SessionResult<T> = core::result::Result<T, SessionError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type EscrowResult<T> = core::result::Result<T, EscrowError>;
