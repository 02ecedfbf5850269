//! Game settlement.
//!
//! Two distinct payout paths share one atomic claim: a game's transition
//! from open to result happens under that game's exclusive entry guard, so
//! the timer-driven sweep and an admin declaration can never both process
//! the same game. Whichever claims first wins; the loser observes the
//! result status and backs off without side effects.
//!
//! The sweep path pays a flat doubled stake with no commission split. The
//! admin declaration path divides the pool through the commission policy.
//! The asymmetry is deliberate and the two paths stay separate.

use crate::common::types::{Amount, GameId, Role, TransactionKind, UserId, WalletKind};
use crate::config::GameConfig;
use crate::errors::{PlatformError, PlatformResult};
use crate::games::commission::{self, CommissionSplit, CommissionVault};
use crate::games::store::GameStore;
use crate::games::types::{
    valid_bid_number, Game, GameStatus, ManualOverride, DEFAULT_PAYOUT_MULTIPLIER,
};
use crate::ledger::Ledger;
use crate::policy::Capabilities;
use crate::users::UserRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// One winner credit performed during settlement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    pub user: UserId,
    pub amount: Amount,
}

/// How the sweep resolved one game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SettlementOutcome {
    /// A recorded override fixed the winning number
    OverrideApplied {
        game: GameId,
        winner_number: u8,
        payouts: Vec<Payout>,
    },
    /// The ascending unique-bid rule selected a winner
    AutoWinner {
        game: GameId,
        winner_number: u8,
        payout: Payout,
    },
    /// No number qualified; the pool is retained
    NoWinner { game: GameId },
}

/// Per-winner line in a declaration breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerPayout {
    pub user: UserId,
    pub bid_amount: Amount,
    pub payout: Amount,
}

/// Per-agent commission line in a declaration breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCommission {
    pub agent: UserId,
    pub amount: Amount,
}

/// Full breakdown returned by an admin winner declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub game: Game,
    pub commission: CommissionSplit,
    pub winner_count: usize,
    pub payout_per_winner: Amount,
    /// Integer-division remainder of the winner pool. Reported only, never
    /// credited anywhere.
    pub remainder: Amount,
    pub winners: Vec<WinnerPayout>,
    pub agent_commissions: Vec<AgentCommission>,
}

pub struct SettlementEngine {
    store: Arc<GameStore>,
    ledger: Arc<Ledger>,
    users: Arc<UserRegistry>,
    commission: Arc<CommissionVault>,
    config: GameConfig,
}

impl SettlementEngine {
    pub fn new(
        store: Arc<GameStore>,
        ledger: Arc<Ledger>,
        users: Arc<UserRegistry>,
        commission: Arc<CommissionVault>,
        config: GameConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            users,
            commission,
            config,
        }
    }

    /// Settle every open game past the settlement delay. Games already
    /// claimed by a concurrent declaration are skipped silently.
    pub fn settle_due(&self, now: DateTime<Utc>) -> Vec<SettlementOutcome> {
        let due = self
            .store
            .due_for_settlement(now, self.config.settlement_delay_minutes);
        let mut outcomes = Vec::with_capacity(due.len());
        for game_id in due {
            match self.settle_game(game_id) {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => warn!(game = %game_id, error = %e, "settlement failed"),
            }
        }
        outcomes
    }

    /// Settle one game. Returns None when the game was already settled,
    /// which makes repeated sweeps over the same game a no-op.
    pub fn settle_game(&self, game_id: GameId) -> PlatformResult<Option<SettlementOutcome>> {
        let store = Arc::clone(&self.store);
        let ledger = Arc::clone(&self.ledger);

        self.store.with_game_mut(game_id, move |game| {
            if !game.is_open() {
                return Ok(None);
            }

            if let Some(decision) = store.first_override(game.id) {
                let outcome = Self::apply_override(&store, &ledger, game, &decision);
                return Ok(Some(outcome));
            }

            Ok(Some(Self::apply_auto_rule(&store, &ledger, game)))
        })
    }

    /// Honor a recorded override: the listed winners with a matching bid are
    /// paid their stake times the recorded multiplier, no commission split.
    fn apply_override(
        store: &GameStore,
        ledger: &Ledger,
        game: &mut Game,
        decision: &ManualOverride,
    ) -> SettlementOutcome {
        game.result_number = Some(decision.winner_number);
        game.status = GameStatus::Result;

        let mut payouts = Vec::new();
        for &winner in &decision.manual_winners {
            let Some(bid) = store.bid_for(game.id, winner, decision.winner_number) else {
                warn!(
                    game = %game.id,
                    user = %winner,
                    number = decision.winner_number,
                    "override winner has no matching bid, skipped"
                );
                continue;
            };
            let Some(amount) = bid.amount.checked_mul(decision.payout_multiplier) else {
                warn!(game = %game.id, user = %winner, "override payout overflows, skipped");
                continue;
            };
            if Self::pay_winner(ledger, winner, amount, game.id) {
                payouts.push(Payout {
                    user: winner,
                    amount,
                });
            }
        }

        info!(
            game = %game.id,
            winner_number = decision.winner_number,
            winners = payouts.len(),
            "manual override applied"
        );
        SettlementOutcome::OverrideApplied {
            game: game.id,
            winner_number: decision.winner_number,
            payouts,
        }
    }

    /// Automatic rule: scan numbers ascending and pick the first with
    /// exactly one bid whose doubled stake the pool can cover. The sole
    /// winner is paid double their stake.
    fn apply_auto_rule(store: &GameStore, ledger: &Ledger, game: &mut Game) -> SettlementOutcome {
        let by_number = store.aggregate_by_number(game.id);

        for (number, bids) in &by_number {
            if bids.len() != 1 {
                continue;
            }
            let bid = &bids[0];
            let Some(payout) = bid.amount.checked_mul(DEFAULT_PAYOUT_MULTIPLIER) else {
                continue;
            };
            if payout > game.total_pool {
                continue;
            }

            game.result_number = Some(*number);
            game.status = GameStatus::Result;
            Self::pay_winner(ledger, bid.user, payout, game.id);
            info!(
                game = %game.id,
                winner_number = number,
                user = %bid.user,
                payout,
                "auto result settled"
            );
            return SettlementOutcome::AutoWinner {
                game: game.id,
                winner_number: *number,
                payout: Payout {
                    user: bid.user,
                    amount: payout,
                },
            };
        }

        game.status = GameStatus::Result;
        info!(game = %game.id, pool = game.total_pool, "settled with no winner");
        SettlementOutcome::NoWinner { game: game.id }
    }

    fn pay_winner(ledger: &Ledger, user: UserId, amount: Amount, game: GameId) -> bool {
        match ledger.credit(
            user,
            WalletKind::Main,
            amount,
            TransactionKind::Bonus,
            None,
            Role::Admin,
            Some(format!("Game win payout for game {}", game)),
        ) {
            Ok(_) => true,
            Err(e) => {
                warn!(game = %game, user = %user, error = %e, "winner payout failed");
                false
            }
        }
    }

    /// Admin-invoked declaration with the full commission split. Requires
    /// current commission settings and an open game; the claim happens
    /// under the same per-game guard as the sweep.
    pub fn declare_winner(
        &self,
        actor_id: UserId,
        game_id: GameId,
        winner_number: u8,
    ) -> PlatformResult<SettlementReport> {
        let actor = self.users.require(actor_id)?;
        Capabilities::for_actor(&actor).require_declare_winner()?;

        if !valid_bid_number(winner_number) {
            return Err(PlatformError::Validation(format!(
                "winner number {} is out of range",
                winner_number
            )));
        }
        let settings = self.commission.current().ok_or_else(|| {
            PlatformError::Precondition("commission settings not configured".into())
        })?;

        let store = Arc::clone(&self.store);
        let ledger = Arc::clone(&self.ledger);
        let users = Arc::clone(&self.users);

        self.store.with_game_mut(game_id, move |game| {
            if !game.is_open() {
                return Err(PlatformError::Precondition(
                    "winner can only be declared for an open game".into(),
                ));
            }

            let split = commission::split(game.total_pool, &settings);
            let winning_bids = store.bids_on_number(game.id, winner_number);
            let winner_count = winning_bids.len();
            let payout_per_winner = if winner_count > 0 {
                split.winner_payout / winner_count as u64
            } else {
                0
            };
            let remainder = if winner_count > 0 {
                split.winner_payout % winner_count as u64
            } else {
                split.winner_payout
            };

            let mut winners = Vec::with_capacity(winner_count);
            let mut agent_totals: HashMap<UserId, Amount> = HashMap::new();
            for bid in &winning_bids {
                if payout_per_winner > 0 {
                    ledger.credit(
                        bid.user,
                        WalletKind::Main,
                        payout_per_winner,
                        TransactionKind::Bonus,
                        Some(actor_id),
                        Role::Admin,
                        Some(format!("Winner payout for game {}", game.id)),
                    )?;
                }
                winners.push(WinnerPayout {
                    user: bid.user,
                    bid_amount: bid.amount,
                    payout: payout_per_winner,
                });

                if let Some(agent) = users.get(bid.user).and_then(|u| u.assigned_agent) {
                    let share = commission::percentage_of(payout_per_winner, settings.agent_pct);
                    *agent_totals.entry(agent).or_insert(0) += share;
                }
            }

            let mut agent_commissions = Vec::with_capacity(agent_totals.len());
            for (agent, amount) in agent_totals {
                if amount == 0 {
                    continue;
                }
                ledger.credit(
                    agent,
                    WalletKind::Main,
                    amount,
                    TransactionKind::Bonus,
                    Some(actor_id),
                    Role::Admin,
                    Some(format!("Agent commission for game {}", game.id)),
                )?;
                agent_commissions.push(AgentCommission { agent, amount });
            }

            game.result_number = Some(winner_number);
            game.status = GameStatus::Result;

            store.record_override(ManualOverride {
                id: Uuid::new_v4(),
                game: game.id,
                winner_number,
                manual_winners: vec![],
                payout_multiplier: 1,
                note: Some(format!(
                    "Winner declared by admin. {} winners, {} each, agent commission {} total.",
                    winner_count,
                    payout_per_winner,
                    split.agent_commission
                )),
                created_at: Utc::now(),
            });

            info!(
                game = %game.id,
                winner_number,
                winner_count,
                payout_per_winner,
                pool = split.total_pool,
                "winner declared"
            );
            Ok(SettlementReport {
                game: game.clone(),
                commission: split,
                winner_count,
                payout_per_winner,
                remainder,
                winners,
                agent_commissions,
            })
        })
    }

    /// Record an admin override decision for later application by the sweep
    pub fn record_override(
        &self,
        actor_id: UserId,
        game_id: GameId,
        winner_number: u8,
        manual_winners: Vec<UserId>,
        note: Option<String>,
        payout_multiplier: Option<u64>,
    ) -> PlatformResult<ManualOverride> {
        let actor = self.users.require(actor_id)?;
        Capabilities::for_actor(&actor).require_override_result()?;

        if !valid_bid_number(winner_number) {
            return Err(PlatformError::Validation(format!(
                "winner number {} is out of range",
                winner_number
            )));
        }
        let multiplier = payout_multiplier.unwrap_or(DEFAULT_PAYOUT_MULTIPLIER);
        if multiplier == 0 {
            return Err(PlatformError::Validation(
                "payout multiplier must be positive".into(),
            ));
        }

        let game = self.store.require_game(game_id)?;
        if !game.is_open() {
            // Tolerated as a recovery record; it will not be applied by the
            // sweep since the game is already settled.
            warn!(game = %game_id, "override recorded for an already settled game");
        }

        let decision = self.store.record_override(ManualOverride {
            id: Uuid::new_v4(),
            game: game_id,
            winner_number,
            manual_winners,
            payout_multiplier: multiplier,
            note,
            created_at: Utc::now(),
        });
        info!(
            game = %game_id,
            winner_number,
            multiplier,
            winners = decision.manual_winners.len(),
            "manual override recorded"
        );
        Ok(decision)
    }
}
