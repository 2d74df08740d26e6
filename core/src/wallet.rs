use futures_channel::mpsc::UnboundedReceiver;
use std::cell::RefCell;
use std::rc::Rc;

use crate::*;

pub type WalletResult<T> = core::result::Result<T, WalletError>;

/// Browser wallet provider (extension or WalletConnect).
#[allow(async_fn_in_trait)]
pub trait Wallet {
    /// Requests account access and returns the selected account.
    async fn connect(&self) -> WalletResult<Address>;

    async fn disconnect(&self) -> WalletResult<()>;

    /// Native balance held by `account` in the wallet, outside the escrow.
    async fn balance(&self, account: &Address) -> WalletResult<Wei>;

    /// Stream of account switches; `None` means the wallet dropped all accounts.
    fn subscribe_accounts(&self) -> UnboundedReceiver<Option<Address>>;
}

impl<T: Wallet> Wallet for Rc<T> {
    async fn connect(&self) -> WalletResult<Address> {
        (**self).connect().await
    }

    async fn disconnect(&self) -> WalletResult<()> {
        (**self).disconnect().await
    }

    async fn balance(&self, account: &Address) -> WalletResult<Wei> {
        (**self).balance(account).await
    }

    fn subscribe_accounts(&self) -> UnboundedReceiver<Option<Address>> {
        (**self).subscribe_accounts()
    }
}

/// Tracks which account the wallet currently exposes.
pub struct WalletSession<W: Wallet> {
    wallet: W,
    account: RefCell<Option<Address>>,
}

impl<W: Wallet> WalletSession<W> {
    pub fn new(wallet: W) -> Self {
        Self {
            wallet,
            account: RefCell::new(None),
        }
    }

    pub fn account(&self) -> Option<Address> {
        self.account.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.account.borrow().is_some()
    }

    pub async fn connect(&self) -> WalletResult<Address> {
        let account = self.wallet.connect().await?;
        log::info!("Wallet connected as {}", account);
        self.account.replace(Some(account.clone()));
        Ok(account)
    }

    /// Forgets the account locally first, then asks the provider to let go.
    pub async fn disconnect(&self) -> WalletResult<()> {
        if let Some(account) = self.account.take() {
            log::info!("Wallet {} disconnected", account);
        }
        self.wallet.disconnect().await
    }

    /// Records an account switch reported by the provider. Returns whether
    /// the account actually changed.
    pub fn note_account(&self, account: Option<Address>) -> bool {
        let previous = self.account.replace(account.clone());
        if previous != account {
            log::info!(
                "Wallet account changed from {:?} to {:?}",
                previous.as_ref().map(Address::as_str),
                account.as_ref().map(Address::as_str)
            );
            true
        } else {
            false
        }
    }

    pub async fn balance(&self) -> SessionResult<Wei> {
        let account = self.account().ok_or(SessionError::NotConnected)?;
        Ok(self.wallet.balance(&account).await?)
    }

    pub fn account_changes(&self) -> UnboundedReceiver<Option<Address>> {
        self.wallet.subscribe_accounts()
    }
}
