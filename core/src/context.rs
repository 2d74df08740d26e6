use futures_channel::mpsc::UnboundedReceiver;
use futures_util::{FutureExt, StreamExt};
use std::cell::RefCell;

use crate::*;

/// Everything one browser tab needs: the wallet binding, the session machine
/// and the leaderboard writer. Built once by the host and passed around
/// explicitly.
pub struct GameContext<W: Wallet, E: Escrow, L: LeaderboardStore> {
    config: AppConfig,
    wallet: WalletSession<W>,
    machine: SessionMachine<E>,
    leaderboard: LeaderboardSync<L>,
    queued: RefCell<Option<UnboundedReceiver<LeaderboardEntry>>>,
}

impl<W: Wallet, E: Escrow, L: LeaderboardStore> GameContext<W, E, L> {
    pub fn new(config: AppConfig, wallet: W, escrow: E, store: L, seed: u64) -> Self {
        let (queue, queued) = leaderboard_queue();
        let machine =
            SessionMachine::new(escrow, config.game.board_size, seed).with_leaderboard(queue);
        Self {
            config,
            wallet: WalletSession::new(wallet),
            machine,
            leaderboard: LeaderboardSync::new(store),
            queued: RefCell::new(Some(queued)),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.machine = self.machine.with_clock(clock);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn wallet(&self) -> &WalletSession<W> {
        &self.wallet
    }

    pub fn machine(&self) -> &SessionMachine<E> {
        &self.machine
    }

    pub fn leaderboard(&self) -> &LeaderboardSync<L> {
        &self.leaderboard
    }

    /// Connects the wallet and picks up any game left open by this account.
    pub async fn connect(&self) -> SessionResult<Phase> {
        let account = self.wallet.connect().await?;
        self.machine.on_account_changed(Some(account));
        self.machine.reconcile().await
    }

    pub async fn disconnect(&self) {
        self.machine.disconnect();
        if let Err(err) = self.wallet.disconnect().await {
            log::warn!("Wallet disconnect failed: {}", err);
        }
    }

    /// Applies an account switch reported by the provider.
    pub async fn account_changed(&self, account: Option<Address>) -> SessionResult<Phase> {
        self.wallet.note_account(account.clone());
        if !self.machine.on_account_changed(account) {
            return Ok(self.machine.phase());
        }
        if self.machine.account().is_some() {
            self.machine.reconcile().await
        } else {
            Ok(Phase::Disconnected)
        }
    }

    /// Starts a session after checking the wallet can cover `stake`.
    pub async fn start_session(&self, stake: Wei) -> SessionResult<()> {
        if self.machine.phase() == Phase::Idle {
            let available = self.wallet.balance().await?;
            if available < stake {
                return Err(SessionError::InsufficientBalance {
                    required: stake,
                    available,
                });
            }
        }
        self.machine.start_session(stake).await
    }

    /// Follows account switches until the provider closes the stream.
    pub async fn watch_accounts(&self) {
        let mut changes = self.wallet.account_changes();
        while let Some(account) = changes.next().await {
            if let Err(err) = self.account_changed(account).await {
                log::warn!("Could not reconcile after account change: {}", err);
            }
        }
        log::debug!("Account subscription closed");
    }

    /// Writes queued leaderboard entries for as long as the context lives.
    /// Only the first caller gets the queue.
    pub async fn run_leaderboard_sync(&self) {
        let Some(entries) = self.queued.borrow_mut().take() else {
            log::warn!("Leaderboard sync is already running");
            return;
        };
        self.leaderboard.run(entries).await;
    }

    /// Writes whatever is queued right now, for hosts without a background
    /// task. Does nothing once [`Self::run_leaderboard_sync`] took the queue.
    pub async fn flush_leaderboard(&self) -> usize {
        let pending = {
            let mut queued = self.queued.borrow_mut();
            let Some(entries) = queued.as_mut() else {
                return 0;
            };
            let mut pending = Vec::new();
            while let Some(Some(entry)) = entries.next().now_or_never() {
                pending.push(entry);
            }
            pending
        };
        for entry in &pending {
            self.leaderboard.push(entry).await;
        }
        pending.len()
    }
}
