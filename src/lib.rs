//! Ankpool - Numbers Betting Platform Core
//!
//! Users stake on numbers 1 to 12 inside fixed 30-minute game windows. A
//! settlement engine picks winners, splits pools between winners, agents and
//! the platform, and drives every balance change through a single wallet
//! ledger that never double-spends or loses money under concurrent bids,
//! admin overrides and scheduled settlement.
//!
//! The HTTP surface, auth and content management live outside this crate;
//! the types here are its operational core.

pub mod common;
pub mod config;
pub mod errors;
pub mod games;
pub mod ledger;
pub mod policy;
pub mod users;
pub mod wallets;
pub mod withdrawals;

pub use common::types::{Amount, Role, TransactionKind, UserId, WalletKind};
pub use config::PlatformConfig;
pub use errors::{PlatformError, PlatformResult};
pub use games::{
    BidBook, CommissionVault, GameScheduler, GameStore, SettlementEngine,
};
pub use ledger::Ledger;
pub use users::UserRegistry;
pub use wallets::WalletDesk;
pub use withdrawals::WithdrawalDesk;

use std::sync::Arc;

/// Fully wired platform core: stores, ledger, engines and desks sharing one
/// set of collections.
pub struct Platform {
    pub config: PlatformConfig,
    pub users: Arc<UserRegistry>,
    pub ledger: Arc<Ledger>,
    pub games: Arc<GameStore>,
    pub commission: Arc<CommissionVault>,
    pub bids: BidBook,
    pub settlement: Arc<SettlementEngine>,
    pub wallets: WalletDesk,
    pub withdrawals: WithdrawalDesk,
}

impl Platform {
    pub fn new(config: PlatformConfig) -> Self {
        let users = Arc::new(UserRegistry::new());
        let ledger = Arc::new(Ledger::new());
        let games = Arc::new(GameStore::new());
        let commission = Arc::new(CommissionVault::new());

        let bids = BidBook::new(
            Arc::clone(&games),
            Arc::clone(&ledger),
            Arc::clone(&users),
            config.games.clone(),
        );
        let settlement = Arc::new(SettlementEngine::new(
            Arc::clone(&games),
            Arc::clone(&ledger),
            Arc::clone(&users),
            Arc::clone(&commission),
            config.games.clone(),
        ));
        let wallets = WalletDesk::new(
            Arc::clone(&ledger),
            Arc::clone(&users),
            config.wallets.clone(),
        );
        let withdrawals = WithdrawalDesk::new(Arc::clone(&ledger), Arc::clone(&users));

        Self {
            config,
            users,
            ledger,
            games,
            commission,
            bids,
            settlement,
            wallets,
            withdrawals,
        }
    }

    /// Build the timer-driven scheduler over this platform's stores
    pub fn scheduler(&self) -> Arc<GameScheduler> {
        Arc::new(GameScheduler::new(
            Arc::clone(&self.games),
            Arc::clone(&self.settlement),
            self.config.games.clone(),
            self.config.scheduler.clone(),
        ))
    }
}
