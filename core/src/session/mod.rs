use core::future::Future;
use rand::prelude::*;
use std::cell::{Cell, RefCell};

use crate::*;
pub use state::*;

mod state;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    NoChange,
    Revealed { profit: Wei },
    HitHazard,
    Cleared { earnings: Wei },
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        use RevealOutcome::*;
        match self {
            NoChange => false,
            Revealed { .. } => true,
            HitHazard => true,
            Cleared { .. } => true,
        }
    }
}

/// Marks a state-changing action as pending. Only the guard from the
/// current epoch may clear the flag, so a call detached by an account change
/// cannot release the guard of whatever runs after the reset.
struct InFlight<'a> {
    busy: &'a Cell<bool>,
    epoch: &'a Cell<u64>,
    started: u64,
}

impl InFlight<'_> {
    fn is_current(&self) -> bool {
        self.epoch.get() == self.started
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.is_current() {
            self.busy.set(false);
        }
    }
}

/// Keeps the local game in step with the escrow position of one account.
///
/// Every method takes `&self`, the machine is meant to be shared between UI
/// callbacks running on a single thread. Interior state is never borrowed
/// across an await, and at most one state-changing action runs at a time.
pub struct SessionMachine<E: Escrow> {
    escrow: E,
    board_size: Coord,
    seeds: RefCell<SmallRng>,
    clock: Box<dyn Clock>,
    leaderboard: Option<LeaderboardQueue>,
    account: RefCell<Option<Address>>,
    state: RefCell<SessionState>,
    stats: RefCell<Option<PlayerStats>>,
    escrow_balance: Cell<Option<Wei>>,
    busy: Cell<bool>,
    epoch: Cell<u64>,
    refreshes_issued: Cell<u64>,
    refresh_applied: Cell<u64>,
}

impl<E: Escrow> SessionMachine<E> {
    pub fn new(escrow: E, board_size: Coord, seed: u64) -> Self {
        Self {
            escrow,
            board_size,
            seeds: RefCell::new(SmallRng::seed_from_u64(seed)),
            clock: Box::new(SystemClock),
            leaderboard: None,
            account: RefCell::new(None),
            state: RefCell::new(SessionState::default()),
            stats: RefCell::new(None),
            escrow_balance: Cell::new(None),
            busy: Cell::new(false),
            epoch: Cell::new(0),
            refreshes_issued: Cell::new(0),
            refresh_applied: Cell::new(0),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Queue that receives one entry per confirmed game outcome.
    pub fn with_leaderboard(mut self, queue: LeaderboardQueue) -> Self {
        self.leaderboard = Some(queue);
        self
    }

    pub fn escrow(&self) -> &E {
        &self.escrow
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    pub fn account(&self) -> Option<Address> {
        self.account.borrow().clone()
    }

    /// Last stats fetched from the escrow, never adjusted locally.
    pub fn stats(&self) -> Option<PlayerStats> {
        self.stats.borrow().clone()
    }

    pub fn escrow_balance(&self) -> Option<Wei> {
        self.escrow_balance.get()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Binds the machine to `account`, dropping any local session of the
    /// previous one. Pending escrow calls are left to settle on their own and
    /// their results are discarded. Returns whether the account changed.
    pub fn on_account_changed(&self, account: Option<Address>) -> bool {
        if *self.account.borrow() == account {
            return false;
        }
        if self.busy.get() {
            log::warn!("Account changed with an escrow call pending, detaching it");
        }
        let phase = if account.is_some() {
            Phase::Idle
        } else {
            Phase::Disconnected
        };
        self.account.replace(account);
        self.reset(phase);
        true
    }

    pub fn disconnect(&self) {
        self.on_account_changed(None);
    }

    pub async fn start_session(&self, stake: Wei) -> SessionResult<()> {
        let account = self.require_account()?;
        let guard = self.begin()?;
        match self.phase() {
            Phase::Idle => {}
            Phase::Disconnected => return Err(SessionError::NotConnected),
            _ => return Err(SessionError::SessionInProgress),
        }
        self.state.borrow_mut().set_phase(Phase::Starting);

        let result = self.open_position(&guard, &account, stake).await;
        match &result {
            Ok(()) | Err(SessionError::Detached) => {}
            Err(err) => {
                log::warn!("Could not start session: {}", err);
                self.state.replace(SessionState::with_phase(Phase::Idle));
            }
        }
        drop(guard);

        if !matches!(result, Err(SessionError::Detached)) {
            self.refresh_stats().await;
        }
        result
    }

    pub async fn reveal_cell(&self, index: CellIndex) -> SessionResult<RevealOutcome> {
        let Ok(guard) = self.begin() else {
            log::trace!("Ignoring reveal of {} while another action is pending", index);
            return Ok(RevealOutcome::NoChange);
        };

        let outcome = {
            let mut state = self.state.borrow_mut();
            if !state.is_active() {
                return Ok(RevealOutcome::NoChange);
            }
            let Some(session) = state.session_mut() else {
                return Ok(RevealOutcome::NoChange);
            };
            let index = session.board().validate_index(index)?;
            if !session.revealed_mut().reveal(index) {
                return Ok(RevealOutcome::NoChange);
            }

            if session.board()[index] {
                state.set_phase(Phase::Resolving);
                RevealOutcome::HitHazard
            } else if session.is_cleared() {
                let earnings = session.running_profit();
                state.set_phase(Phase::Resolving);
                RevealOutcome::Cleared { earnings }
            } else {
                RevealOutcome::Revealed {
                    profit: session.running_profit(),
                }
            }
        };
        log::trace!("Reveal {} -> {:?}", index, outcome);

        match outcome {
            RevealOutcome::HitHazard => self.settle(guard, false, Wei::ZERO).await?,
            RevealOutcome::Cleared { earnings } => self.settle(guard, true, earnings).await?,
            RevealOutcome::Revealed { .. } | RevealOutcome::NoChange => {}
        }
        Ok(outcome)
    }

    /// Cashes out: confirms the win with the current profit, then withdraws.
    ///
    /// When the win is already confirmed but the withdrawal failed, only the
    /// withdrawal is retried so earnings are never counted twice.
    pub async fn withdraw(&self) -> SessionResult<TxReceipt> {
        self.require_account()?;
        let guard = self.begin()?;
        let (phase, profit) = {
            let state = self.state.borrow();
            (state.phase(), state.running_profit())
        };

        let (earnings, needs_finalize) = match phase {
            Phase::Active => (profit, true),
            Phase::Unresolved {
                won: true,
                earnings,
            } => (earnings, true),
            Phase::PendingWithdrawal { earnings } => (earnings, false),
            Phase::Disconnected => return Err(SessionError::NotConnected),
            _ => return Err(SessionError::NothingToWithdraw),
        };

        if needs_finalize {
            self.state.borrow_mut().set_phase(Phase::Resolving);
            let finalized = self
                .call(
                    &guard,
                    EscrowCall::CompleteGame,
                    self.escrow.complete_game(true, earnings),
                )
                .await;
            match finalized {
                Ok(receipt) => {
                    log::info!("Win of {} CBTC confirmed (tx {})", earnings, receipt.hash);
                    self.state.replace(SessionState::with_phase(Phase::PendingWithdrawal {
                        earnings,
                    }));
                }
                Err(SessionError::Detached) => return Err(SessionError::Detached),
                Err(err) => {
                    self.state.borrow_mut().set_phase(phase);
                    return Err(err);
                }
            }
        }

        let result = self
            .call(&guard, EscrowCall::Withdraw, self.escrow.withdraw())
            .await;
        match &result {
            Ok(receipt) => {
                log::info!("Withdrawal confirmed (tx {})", receipt.hash);
                self.state.replace(SessionState::with_phase(Phase::Idle));
            }
            Err(SessionError::Detached) => return result,
            Err(err) => log::warn!("Withdrawal failed, it can be retried: {}", err),
        }
        drop(guard);

        if needs_finalize {
            self.publish_outcome().await;
        } else {
            self.refresh_stats().await;
        }
        result
    }

    /// Re-issues the terminal escrow call that failed earlier.
    pub async fn finalize(&self) -> SessionResult<()> {
        self.require_account()?;
        let guard = self.begin()?;
        let Phase::Unresolved { won, earnings } = self.phase() else {
            return Err(SessionError::NoActiveSession);
        };
        self.state.borrow_mut().set_phase(Phase::Resolving);
        self.settle(guard, won, earnings).await
    }

    /// Rebuilds the local phase from the escrow deposit of the bound account.
    ///
    /// The escrow only remembers the stake, so a recovered session gets a
    /// fresh board and reveal progress starts over. A session that is
    /// already live for the same stake is kept as is. A pending payout is
    /// kept only while the escrow still holds a balance for it.
    pub async fn reconcile(&self) -> SessionResult<Phase> {
        let account = self.require_account()?;
        let guard = self.begin()?;
        let deposit = self
            .call(
                &guard,
                EscrowCall::PlayerDeposit,
                self.escrow.player_deposit(&account),
            )
            .await?;

        let phase = self.phase();
        if deposit.is_zero() {
            match phase {
                Phase::Idle => {}
                Phase::PendingWithdrawal { earnings } => {
                    let balance = self
                        .call(
                            &guard,
                            EscrowCall::PlayerBalance,
                            self.escrow.player_balance(&account),
                        )
                        .await?;
                    if balance.is_zero() {
                        log::info!(
                            "Payout of {} CBTC for {} already withdrawn, resetting local session",
                            earnings,
                            account
                        );
                        self.state.replace(SessionState::with_phase(Phase::Idle));
                    }
                }
                _ => {
                    log::info!("No open position for {}, resetting local session", account);
                    self.state.replace(SessionState::with_phase(Phase::Idle));
                }
            }
        } else {
            let live = matches!(phase, Phase::Active | Phase::Unresolved { .. })
                && self.state.borrow().stake() == Some(deposit);
            if !live {
                let difficulty = resolve_difficulty(deposit);
                let board = self.fresh_board(difficulty.hazards)?;
                log::info!(
                    "Recovered open position of {} CBTC for {} on a fresh board",
                    deposit,
                    account
                );
                self.state
                    .replace(SessionState::active(GameSession::new(board, deposit, difficulty)));
            }
        }
        drop(guard);

        self.refresh_stats().await;
        Ok(self.phase())
    }

    /// Refetches stats and escrow balance. Failures are logged and leave the
    /// previous values in place. A refresh that settles after a later one
    /// was applied is dropped. Returns whether stats were updated.
    pub async fn refresh_stats(&self) -> bool {
        let Some(account) = self.account() else {
            return false;
        };
        let epoch = self.epoch.get();
        let sequence = self.refreshes_issued.get() + 1;
        self.refreshes_issued.set(sequence);
        let stats = self.escrow.player_stats(&account).await;
        let balance = self.escrow.player_balance(&account).await;
        if self.epoch.get() != epoch {
            log::debug!("Account changed during stats refresh, dropping result");
            return false;
        }
        if sequence < self.refresh_applied.get() {
            log::debug!("Stats refresh {} superseded, dropping result", sequence);
            return false;
        }
        self.refresh_applied.set(sequence);

        match balance {
            Ok(balance) => self.escrow_balance.set(Some(balance)),
            Err(err) => log::warn!("Failed to refresh escrow balance: {}", err),
        }
        match stats {
            Ok(stats) => {
                self.stats.replace(Some(stats));
                true
            }
            Err(err) => {
                log::warn!("Failed to refresh player stats: {}", err);
                false
            }
        }
    }

    async fn open_position(
        &self,
        guard: &InFlight<'_>,
        account: &Address,
        stake: Wei,
    ) -> SessionResult<()> {
        let deposit = self
            .call(
                guard,
                EscrowCall::PlayerDeposit,
                self.escrow.player_deposit(account),
            )
            .await?;
        if !deposit.is_zero() {
            log::warn!(
                "Stale deposit of {} CBTC found for {}, withdrawing it first",
                deposit,
                account
            );
            self.call(guard, EscrowCall::Withdraw, self.escrow.withdraw())
                .await?;
        }

        let difficulty = resolve_difficulty(stake);
        let board = self.fresh_board(difficulty.hazards)?;
        let receipt = self
            .call(guard, EscrowCall::StartGame, self.escrow.start_game(stake))
            .await?;
        log::info!(
            "Session started with {} CBTC at {} hazards (tx {})",
            stake,
            difficulty.hazards,
            receipt.hash
        );
        self.state
            .replace(SessionState::active(GameSession::new(board, stake, difficulty)));
        Ok(())
    }

    async fn settle(&self, guard: InFlight<'_>, won: bool, earnings: Wei) -> SessionResult<()> {
        let result = self
            .call(
                &guard,
                EscrowCall::CompleteGame,
                self.escrow.complete_game(won, earnings),
            )
            .await;
        match result {
            Ok(receipt) => {
                log::info!(
                    "Session {} with {} CBTC earnings (tx {})",
                    if won { "won" } else { "lost" },
                    earnings,
                    receipt.hash
                );
                self.state.replace(SessionState::with_phase(Phase::Idle));
                drop(guard);
                self.publish_outcome().await;
                Ok(())
            }
            Err(SessionError::Detached) => Err(SessionError::Detached),
            Err(err) => {
                log::warn!("Outcome not confirmed, finalize again to settle: {}", err);
                self.state
                    .borrow_mut()
                    .set_phase(Phase::Unresolved { won, earnings });
                Err(err)
            }
        }
    }

    async fn publish_outcome(&self) {
        let refreshed = self.refresh_stats().await;
        let Some(queue) = &self.leaderboard else {
            return;
        };
        let (true, Some(account), Some(stats)) = (refreshed, self.account(), self.stats()) else {
            log::warn!("Skipping leaderboard update, player stats unavailable");
            return;
        };
        let entry = LeaderboardEntry::from_stats(account, &stats, self.clock.now());
        if let Err(err) = queue.unbounded_send(entry) {
            log::warn!("Leaderboard queue closed: {}", err);
        }
    }

    async fn call<T>(
        &self,
        guard: &InFlight<'_>,
        call: EscrowCall,
        request: impl Future<Output = EscrowResult<T>>,
    ) -> SessionResult<T> {
        let result = request.await;
        if !guard.is_current() {
            log::warn!("Escrow {} settled after a reset, discarding its result", call);
            return Err(SessionError::Detached);
        }
        result.map_err(|source| SessionError::Escrow { call, source })
    }

    fn begin(&self) -> SessionResult<InFlight<'_>> {
        if self.busy.replace(true) {
            return Err(SessionError::Busy);
        }
        Ok(InFlight {
            busy: &self.busy,
            epoch: &self.epoch,
            started: self.epoch.get(),
        })
    }

    fn require_account(&self) -> SessionResult<Address> {
        self.account().ok_or(SessionError::NotConnected)
    }

    fn fresh_board(&self, hazards: CellCount) -> Result<Board> {
        let seed: u64 = self.seeds.borrow_mut().random();
        RandomBoardGenerator::new(seed).generate(BoardConfig::new(self.board_size, hazards))
    }

    fn reset(&self, phase: Phase) {
        self.epoch.set(self.epoch.get().wrapping_add(1));
        self.busy.set(false);
        self.state.replace(SessionState::with_phase(phase));
        self.stats.replace(None);
        self.escrow_balance.set(None);
    }
}
