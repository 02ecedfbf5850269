//! Bid placement.
//!
//! The wallet debit, bid record and pool increment form one logical unit:
//! the game entry guard is held across all three, the debit itself is an
//! atomic check-and-update, and any rejection leaves no partial state.

use crate::common::types::{Amount, GameId, Role, TransactionKind, UserId, WalletKind};
use crate::config::GameConfig;
use crate::errors::{PlatformError, PlatformResult};
use crate::games::store::GameStore;
use crate::games::types::{valid_bid_number, Bid};
use crate::ledger::Ledger;
use crate::policy::Capabilities;
use crate::users::UserRegistry;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct BidBook {
    store: Arc<GameStore>,
    ledger: Arc<Ledger>,
    users: Arc<UserRegistry>,
    config: GameConfig,
}

impl BidBook {
    pub fn new(
        store: Arc<GameStore>,
        ledger: Arc<Ledger>,
        users: Arc<UserRegistry>,
        config: GameConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            users,
            config,
        }
    }

    /// Stake `amount` from the user's main balance on `number` in an open game
    pub fn place_bid(
        &self,
        user_id: UserId,
        game_id: GameId,
        number: u8,
        amount: Amount,
    ) -> PlatformResult<Bid> {
        let user = self.users.require(user_id)?;
        Capabilities::for_actor(&user).require_place_bid()?;

        if !valid_bid_number(number) {
            return Err(PlatformError::Validation(format!(
                "bid number {} is out of range",
                number
            )));
        }
        if amount == 0 {
            return Err(PlatformError::Validation(
                "bid amount must be positive".into(),
            ));
        }

        let store = Arc::clone(&self.store);
        let ledger = Arc::clone(&self.ledger);
        let cutoff = self.config.bid_cutoff_minutes;

        self.store.with_game_mut(game_id, move |game| {
            if !game.is_open() {
                return Err(PlatformError::Precondition(
                    "game is not open for bids".into(),
                ));
            }
            if let Some(cutoff_minutes) = cutoff {
                let closes_at = game.time_window + Duration::minutes(cutoff_minutes as i64);
                if Utc::now() >= closes_at {
                    return Err(PlatformError::Precondition(
                        "betting window has closed".into(),
                    ));
                }
            }

            ledger.debit(
                user_id,
                WalletKind::Main,
                amount,
                TransactionKind::Debit,
                Some(user_id),
                Role::User,
                Some(format!("Bid on number {} in game {}", number, game.id)),
            )?;

            let new_pool = match game.total_pool.checked_add(amount) {
                Some(pool) => pool,
                None => {
                    // Compensate the debit so the wallet and pool stay consistent
                    ledger.credit(
                        user_id,
                        WalletKind::Main,
                        amount,
                        TransactionKind::Refund,
                        None,
                        Role::Admin,
                        Some(format!("Bid reversal for game {}", game.id)),
                    )?;
                    return Err(PlatformError::Validation(
                        "bid amount overflows game pool".into(),
                    ));
                }
            };

            let bid = Bid {
                id: Uuid::new_v4(),
                user: user_id,
                game: game.id,
                number,
                amount,
                sequence: store.next_bid_sequence(),
                created_at: Utc::now(),
            };
            store.insert_bid(bid.clone());
            game.total_pool = new_pool;

            info!(
                game = %game.id,
                user = %user_id,
                number,
                amount,
                pool = game.total_pool,
                "bid placed"
            );
            Ok(bid)
        })
    }
}
