use core::fmt;
use serde::{Deserialize, Serialize};

use crate::*;

/// Payout multiplier advertised for a tier, in percent (`120` is 1.2x).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PayoutMultiplier(u32);

impl PayoutMultiplier {
    pub const fn from_percent(percent: u32) -> Self {
        Self(percent)
    }

    pub const fn as_percent(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PayoutMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let fraction = self.0 % 100;
        if fraction == 0 {
            write!(f, "{whole}.0x")
        } else if fraction % 10 == 0 {
            write!(f, "{whole}.{}x", fraction / 10)
        } else {
            write!(f, "{whole}.{fraction:02}x")
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difficulty {
    pub stake: Wei,
    pub hazards: CellCount,
    pub payout_multiplier: PayoutMultiplier,
}

const fn tier(stake_wei: u128, hazards: CellCount, multiplier_pct: u32) -> Difficulty {
    Difficulty {
        stake: Wei::from_wei(stake_wei),
        hazards,
        payout_multiplier: PayoutMultiplier::from_percent(multiplier_pct),
    }
}

const MILLI: u128 = 1_000_000_000_000_000;

/// Allowed stakes in ascending order. The lowest entry doubles as the
/// fallback for stakes that are not in the table.
const TIERS: [Difficulty; 6] = [
    tier(5 * MILLI, 3, 120),
    tier(10 * MILLI, 4, 150),
    tier(50 * MILLI, 5, 180),
    tier(100 * MILLI, 6, 200),
    tier(500 * MILLI, 7, 250),
    tier(1000 * MILLI, 8, 300),
];

pub fn difficulty_tiers() -> &'static [Difficulty] {
    &TIERS
}

pub fn is_allowed_stake(stake: Wei) -> bool {
    TIERS.iter().any(|tier| tier.stake == stake)
}

/// Looks up the hazard count and multiplier for `stake`.
///
/// Stakes outside the table get the lowest tier's parameters so the board can
/// always be rendered, for instance when a deposit recovered from the escrow
/// does not match any tier.
pub fn resolve_difficulty(stake: Wei) -> Difficulty {
    match TIERS.iter().find(|tier| tier.stake == stake) {
        Some(tier) => *tier,
        None => {
            log::debug!("Stake {} CBTC is not a known tier, using lowest tier", stake);
            TIERS[0]
        }
    }
}
