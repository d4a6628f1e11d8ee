//! Wallet lookup
//!
//! Wallets belong to the host application; the quote engine only needs the native SOL
//! wallet for the fee affordability check.

use parking_lot::RwLock;

use crate::common::types::Wallet;

pub trait WalletsRepository: Send + Sync {
    fn native_wallet(&self) -> Option<Wallet>;
}

/// Fixed wallet list, replaceable as balances change
#[derive(Debug, Default)]
pub struct StaticWalletsRepository {
    wallets: RwLock<Vec<Wallet>>,
}

impl StaticWalletsRepository {
    pub fn new(wallets: Vec<Wallet>) -> Self {
        Self { wallets: RwLock::new(wallets) }
    }

    pub fn replace(&self, wallets: Vec<Wallet>) {
        *self.wallets.write() = wallets;
    }
}

impl WalletsRepository for StaticWalletsRepository {
    fn native_wallet(&self) -> Option<Wallet> {
        self.wallets.read().iter().find(|wallet| wallet.is_native()).cloned()
    }
}
