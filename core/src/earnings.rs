//! The one profit formula shared with the escrow ledger.
//!
//! The contract settles with integer arithmetic on wei:
//! `stake * (100 + revealed * 20) / 100 - stake`. Any local estimate shown to
//! the player goes through [`running_profit`] so it rounds exactly like the
//! ledger does.

use crate::*;

pub const BASE_PERCENT: u128 = 100;
pub const STEP_PERCENT: u128 = 20;

pub fn running_profit(stake: Wei, revealed_safe: CellCount) -> Wei {
    let stake = stake.as_wei();
    let factor = BASE_PERCENT + u128::from(revealed_safe) * STEP_PERCENT;
    let gross = stake.saturating_mul(factor) / BASE_PERCENT;
    Wei::from_wei(gross.saturating_sub(stake))
}
