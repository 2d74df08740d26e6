use chrono::{DateTime, Utc};
use std::rc::Rc;

use crate::*;

/// Call surface of the escrow contract, signed by the connected account.
///
/// The escrow holds at most one open position per account; a non-zero
/// deposit means a game is in progress.
#[allow(async_fn_in_trait)]
pub trait Escrow {
    async fn start_game(&self, stake: Wei) -> EscrowResult<TxReceipt>;

    async fn complete_game(&self, won: bool, earnings: Wei) -> EscrowResult<TxReceipt>;

    async fn withdraw(&self) -> EscrowResult<TxReceipt>;

    async fn player_stats(&self, player: &Address) -> EscrowResult<PlayerStats>;

    async fn player_balance(&self, player: &Address) -> EscrowResult<Wei>;

    async fn player_deposit(&self, player: &Address) -> EscrowResult<Wei>;
}

impl<T: Escrow> Escrow for Rc<T> {
    async fn start_game(&self, stake: Wei) -> EscrowResult<TxReceipt> {
        (**self).start_game(stake).await
    }

    async fn complete_game(&self, won: bool, earnings: Wei) -> EscrowResult<TxReceipt> {
        (**self).complete_game(won, earnings).await
    }

    async fn withdraw(&self) -> EscrowResult<TxReceipt> {
        (**self).withdraw().await
    }

    async fn player_stats(&self, player: &Address) -> EscrowResult<PlayerStats> {
        (**self).player_stats(player).await
    }

    async fn player_balance(&self, player: &Address) -> EscrowResult<Wei> {
        (**self).player_balance(player).await
    }

    async fn player_deposit(&self, player: &Address) -> EscrowResult<Wei> {
        (**self).player_deposit(player).await
    }
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock that also works on `wasm32-unknown-unknown`.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or_default();
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
    }
}
