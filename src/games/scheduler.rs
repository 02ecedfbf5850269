//! Time-driven game automation.
//!
//! Two independent triggers: the window opener keeps a game materialized for
//! the current betting window, and the settlement sweeper drives the engine
//! over games past the settlement delay. Both triggers are idempotent, so a
//! tick that fires twice or late does no harm.

use crate::config::{GameConfig, SchedulerConfig};
use crate::games::settlement::{SettlementEngine, SettlementOutcome};
use crate::games::store::GameStore;
use crate::games::types::{window_start, Game};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct GameScheduler {
    store: Arc<GameStore>,
    engine: Arc<SettlementEngine>,
    games: GameConfig,
    timers: SchedulerConfig,
}

impl GameScheduler {
    pub fn new(
        store: Arc<GameStore>,
        engine: Arc<SettlementEngine>,
        games: GameConfig,
        timers: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            engine,
            games,
            timers,
        }
    }

    /// Window opener tick: create the game for the current window if it does
    /// not exist yet. Duplicate ticks are no-ops.
    pub fn on_window_boundary(&self) -> Game {
        let window = window_start(Utc::now(), self.games.window_minutes);
        let (game, created) = self.store.ensure_game(window);
        if !created {
            debug!(game = %game.id, window = %window, "window already has a game");
        }
        game
    }

    /// Sweeper tick: settle every open game past the settlement delay
    pub fn on_sweep_interval(&self) -> Vec<SettlementOutcome> {
        let outcomes = self.engine.settle_due(Utc::now());
        if !outcomes.is_empty() {
            info!(settled = outcomes.len(), "settlement sweep completed");
        }
        outcomes
    }

    /// Spawn both timer loops onto the runtime
    pub fn spawn(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let opener = Arc::clone(self);
        let opener_handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(opener.timers.opener_interval_secs));
            loop {
                ticker.tick().await;
                opener.on_window_boundary();
            }
        });

        let sweeper = Arc::clone(self);
        let sweeper_handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(sweeper.timers.sweep_interval_secs));
            loop {
                ticker.tick().await;
                sweeper.on_sweep_interval();
            }
        });

        info!(
            opener_secs = self.timers.opener_interval_secs,
            sweep_secs = self.timers.sweep_interval_secs,
            "game automation started"
        );
        vec![opener_handle, sweeper_handle]
    }
}
