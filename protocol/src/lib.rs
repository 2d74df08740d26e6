//! Data shapes shared between the game core and its external collaborators:
//! the escrow contract and the leaderboard store.

pub use address::*;
pub use amount::*;
pub use error::*;
pub use records::*;

mod address;
mod amount;
mod error;
mod records;
