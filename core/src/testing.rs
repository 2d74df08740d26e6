//! In-memory collaborators used by the unit tests.

use chrono::{DateTime, Utc};
use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures_channel::oneshot;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::*;

pub(crate) fn alice() -> Address {
    Address::parse("0x00000000000000000000000000000000000a11ce").unwrap()
}

pub(crate) fn bob() -> Address {
    Address::parse("0x0000000000000000000000000000000000000b0b").unwrap()
}

pub(crate) fn carol() -> Address {
    Address::parse("0x00000000000000000000000000000000000ca201").unwrap()
}

pub(crate) fn cbtc(raw: &str) -> Wei {
    Wei::parse_units(raw).unwrap()
}

pub(crate) fn app_config() -> AppConfig {
    AppConfig {
        contract_address: Address::parse("0x5fbdb2315678afecb367f032d93f642f64180aa3").unwrap(),
        wallet_connect_project_id: "test-project".to_string(),
        firebase: FirebaseConfig {
            api_key: "key".to_string(),
            auth_domain: "lemon-miner.firebaseapp.com".to_string(),
            project_id: "lemon-miner".to_string(),
            database_url: "https://lemon-miner.firebaseio.com".to_string(),
            storage_bucket: "lemon-miner.appspot.com".to_string(),
            messaging_sender_id: "1".to_string(),
            app_id: "1:1:web:1".to_string(),
        },
        game: GameSettings::default(),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Recorded {
    StartGame(Wei),
    CompleteGame { won: bool, earnings: Wei },
    Withdraw,
}

#[derive(Clone, Debug, Default)]
struct Ledger {
    deposit: Wei,
    balance: Wei,
    stats: PlayerStats,
}

/// Escrow double with one ledger per account. Calls act for the account set
/// with [`FakeEscrow::sign_as`] at the moment they are issued.
#[derive(Default)]
pub(crate) struct FakeEscrow {
    signer: RefCell<Option<Address>>,
    ledgers: RefCell<HashMap<Address, Ledger>>,
    calls: RefCell<Vec<(Address, Recorded)>>,
    failures: RefCell<HashMap<EscrowCall, VecDeque<EscrowError>>>,
    gates: RefCell<HashMap<EscrowCall, oneshot::Receiver<()>>>,
    tx_count: Cell<u64>,
}

impl FakeEscrow {
    pub(crate) fn new(signer: Address) -> Rc<Self> {
        let escrow = Self::default();
        escrow.sign_as(signer);
        Rc::new(escrow)
    }

    pub(crate) fn sign_as(&self, signer: Address) {
        self.signer.replace(Some(signer));
    }

    pub(crate) fn set_deposit(&self, account: &Address, deposit: Wei) {
        self.ledgers
            .borrow_mut()
            .entry(account.clone())
            .or_default()
            .deposit = deposit;
    }

    pub(crate) fn set_balance(&self, account: &Address, balance: Wei) {
        self.ledgers
            .borrow_mut()
            .entry(account.clone())
            .or_default()
            .balance = balance;
    }

    pub(crate) fn deposit_of(&self, account: &Address) -> Wei {
        self.ledger(account).deposit
    }

    pub(crate) fn balance_of(&self, account: &Address) -> Wei {
        self.ledger(account).balance
    }

    pub(crate) fn stats_of(&self, account: &Address) -> PlayerStats {
        self.ledger(account).stats
    }

    /// Makes the next `call` fail with `error`.
    pub(crate) fn fail_next(&self, call: EscrowCall, error: EscrowError) {
        self.failures
            .borrow_mut()
            .entry(call)
            .or_default()
            .push_back(error);
    }

    /// Parks the next `call` until the returned sender fires or is dropped.
    pub(crate) fn hold_next(&self, call: EscrowCall) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.gates.borrow_mut().insert(call, gate);
        release
    }

    pub(crate) fn calls(&self) -> Vec<Recorded> {
        self.calls.borrow().iter().map(|(_, call)| *call).collect()
    }

    pub(crate) fn calls_by(&self, account: &Address) -> Vec<Recorded> {
        self.calls
            .borrow()
            .iter()
            .filter(|(signer, _)| signer == account)
            .map(|(_, call)| *call)
            .collect()
    }

    pub(crate) fn completions(&self) -> Vec<Recorded> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Recorded::CompleteGame { .. }))
            .collect()
    }

    fn ledger(&self, account: &Address) -> Ledger {
        self.ledgers
            .borrow()
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    async fn enter(&self, call: EscrowCall) -> EscrowResult<Address> {
        let signer = self
            .signer
            .borrow()
            .clone()
            .ok_or_else(|| EscrowError::Reverted("no signer".to_string()))?;
        let gate = self.gates.borrow_mut().remove(&call);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let failure = self
            .failures
            .borrow_mut()
            .get_mut(&call)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(error) => Err(error),
            None => Ok(signer),
        }
    }

    fn record(&self, signer: &Address, call: Recorded) {
        self.calls.borrow_mut().push((signer.clone(), call));
    }

    fn receipt(&self) -> TxReceipt {
        let count = self.tx_count.get() + 1;
        self.tx_count.set(count);
        TxReceipt {
            hash: format!("0x{count:064x}"),
            block_number: Some(count),
        }
    }
}

impl Escrow for FakeEscrow {
    async fn start_game(&self, stake: Wei) -> EscrowResult<TxReceipt> {
        let signer = self.enter(EscrowCall::StartGame).await?;
        self.record(&signer, Recorded::StartGame(stake));
        let mut ledgers = self.ledgers.borrow_mut();
        let ledger = ledgers.entry(signer).or_default();
        if !ledger.deposit.is_zero() {
            return Err(EscrowError::Reverted("game already active".to_string()));
        }
        ledger.deposit = stake;
        ledger.stats.total_games += 1;
        drop(ledgers);
        Ok(self.receipt())
    }

    async fn complete_game(&self, won: bool, earnings: Wei) -> EscrowResult<TxReceipt> {
        let signer = self.enter(EscrowCall::CompleteGame).await?;
        self.record(&signer, Recorded::CompleteGame { won, earnings });
        let mut ledgers = self.ledgers.borrow_mut();
        let ledger = ledgers.entry(signer).or_default();
        if ledger.deposit.is_zero() {
            return Err(EscrowError::Reverted("no active game".to_string()));
        }
        if won {
            ledger.balance =
                Wei::from_wei(ledger.balance.as_wei() + ledger.deposit.as_wei() + earnings.as_wei());
            ledger.stats.total_wins += 1;
            ledger.stats.total_earnings =
                Wei::from_wei(ledger.stats.total_earnings.as_wei() + earnings.as_wei());
        } else {
            ledger.stats.total_losses += 1;
        }
        ledger.deposit = Wei::ZERO;
        drop(ledgers);
        Ok(self.receipt())
    }

    async fn withdraw(&self) -> EscrowResult<TxReceipt> {
        let signer = self.enter(EscrowCall::Withdraw).await?;
        self.record(&signer, Recorded::Withdraw);
        let mut ledgers = self.ledgers.borrow_mut();
        let ledger = ledgers.entry(signer).or_default();
        if ledger.balance.is_zero() && ledger.deposit.is_zero() {
            return Err(EscrowError::Reverted("nothing to withdraw".to_string()));
        }
        ledger.balance = Wei::ZERO;
        ledger.deposit = Wei::ZERO;
        drop(ledgers);
        Ok(self.receipt())
    }

    // Reads answer from the ledger as it was when the call was issued.
    async fn player_stats(&self, player: &Address) -> EscrowResult<PlayerStats> {
        let stats = self.ledger(player).stats;
        self.enter(EscrowCall::PlayerStats).await?;
        Ok(stats)
    }

    async fn player_balance(&self, player: &Address) -> EscrowResult<Wei> {
        let balance = self.ledger(player).balance;
        self.enter(EscrowCall::PlayerBalance).await?;
        Ok(balance)
    }

    async fn player_deposit(&self, player: &Address) -> EscrowResult<Wei> {
        let deposit = self.ledger(player).deposit;
        self.enter(EscrowCall::PlayerDeposit).await?;
        Ok(deposit)
    }
}

pub(crate) struct FakeWallet {
    account: RefCell<Address>,
    balances: RefCell<HashMap<Address, Wei>>,
    reject: Cell<bool>,
    disconnects: Cell<u32>,
    subscribers: RefCell<Vec<UnboundedSender<Option<Address>>>>,
}

impl FakeWallet {
    pub(crate) fn new(account: Address, balance: Wei) -> Self {
        Self {
            balances: RefCell::new(HashMap::from([(account.clone(), balance)])),
            account: RefCell::new(account),
            reject: Cell::new(false),
            disconnects: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn reject_connect(&self) {
        self.reject.set(true);
    }

    pub(crate) fn set_balance(&self, account: &Address, balance: Wei) {
        self.balances.borrow_mut().insert(account.clone(), balance);
    }

    pub(crate) fn disconnects(&self) -> u32 {
        self.disconnects.get()
    }

    /// Simulates the provider switching accounts.
    pub(crate) fn emit(&self, account: Option<Address>) {
        if let Some(account) = &account {
            self.account.replace(account.clone());
        }
        for subscriber in self.subscribers.borrow().iter() {
            let _ = subscriber.unbounded_send(account.clone());
        }
    }

    pub(crate) fn close_subscriptions(&self) {
        self.subscribers.borrow_mut().clear();
    }
}

impl Wallet for FakeWallet {
    async fn connect(&self) -> WalletResult<Address> {
        if self.reject.get() {
            return Err(WalletError::Rejected);
        }
        Ok(self.account.borrow().clone())
    }

    async fn disconnect(&self) -> WalletResult<()> {
        self.disconnects.set(self.disconnects.get() + 1);
        Ok(())
    }

    async fn balance(&self, account: &Address) -> WalletResult<Wei> {
        Ok(self
            .balances
            .borrow()
            .get(account)
            .copied()
            .unwrap_or_default())
    }

    fn subscribe_accounts(&self) -> UnboundedReceiver<Option<Address>> {
        let (sender, receiver) = mpsc::unbounded();
        self.subscribers.borrow_mut().push(sender);
        receiver
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    entries: RefCell<Vec<LeaderboardEntry>>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub(crate) fn seed(&self, entries: Vec<LeaderboardEntry>) {
        self.entries.replace(entries);
    }

    pub(crate) fn entries(&self) -> Vec<LeaderboardEntry> {
        self.entries.borrow().clone()
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl LeaderboardStore for MemoryStore {
    async fn get_leaderboard(&self) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        Ok(self.entries())
    }

    async fn update_player_stats(&self, entry: &LeaderboardEntry) -> LeaderboardResult<()> {
        if self.fail_writes.get() {
            return Err(LeaderboardError::Unavailable("offline".to_string()));
        }
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|stored| stored.address == entry.address) {
            Some(stored) => *stored = entry.clone(),
            None => entries.push(entry.clone()),
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(DateTime::from_timestamp(1_704_067_200, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
