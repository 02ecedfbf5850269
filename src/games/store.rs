//! In-memory game and bid collections.
//!
//! Concurrent map per record type with a per-entry exclusive guard for game
//! mutation, so a game's open to result transition and pool updates are
//! serialized without a global lock. The bid sequence is a process-wide
//! atomic counter.

use crate::common::types::{BidId, GameId, UserId};
use crate::errors::{PlatformError, PlatformResult};
use crate::games::types::{Bid, Game, GameStatus, ManualOverride};
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Default)]
pub struct GameStore {
    games: DashMap<GameId, Game>,
    /// Window start (unix seconds) to game id, one game per window
    window_index: DashMap<i64, GameId>,
    bids: DashMap<BidId, Bid>,
    game_bids: DashMap<GameId, Vec<BidId>>,
    overrides: DashMap<GameId, Vec<ManualOverride>>,
    bid_sequence: AtomicU64,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the game for a window. Fails if the window already has one.
    pub fn create_game(&self, time_window: DateTime<Utc>) -> PlatformResult<Game> {
        match self.window_index.entry(time_window.timestamp()) {
            Entry::Occupied(_) => Err(PlatformError::Conflict(format!(
                "game already exists for window {}",
                time_window
            ))),
            Entry::Vacant(slot) => {
                let game = Game::new(time_window);
                self.games.insert(game.id, game.clone());
                slot.insert(game.id);
                info!(game = %game.id, window = %time_window, "game created");
                Ok(game)
            }
        }
    }

    /// Create the game for a window if absent. Returns the game and whether
    /// this call created it.
    pub fn ensure_game(&self, time_window: DateTime<Utc>) -> (Game, bool) {
        match self.window_index.entry(time_window.timestamp()) {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                drop(existing);
                match self.games.get(&id) {
                    Some(game) => (game.clone(), false),
                    // Index entry without a game record cannot happen through
                    // this store's API; recreate rather than panic.
                    None => {
                        let game = Game::new(time_window);
                        self.games.insert(game.id, game.clone());
                        self.window_index.insert(time_window.timestamp(), game.id);
                        (game, true)
                    }
                }
            }
            Entry::Vacant(slot) => {
                let game = Game::new(time_window);
                self.games.insert(game.id, game.clone());
                slot.insert(game.id);
                info!(game = %game.id, window = %time_window, "game created");
                (game, true)
            }
        }
    }

    pub fn game(&self, id: GameId) -> Option<Game> {
        self.games.get(&id).map(|g| g.clone())
    }

    pub fn require_game(&self, id: GameId) -> PlatformResult<Game> {
        self.game(id)
            .ok_or_else(|| PlatformError::not_found("game", id))
    }

    pub fn game_for_window(&self, time_window: DateTime<Utc>) -> Option<Game> {
        let id = *self.window_index.get(&time_window.timestamp())?;
        self.game(id)
    }

    /// Run `f` with exclusive access to one game. Concurrent callers against
    /// the same game serialize here, which is what makes the open to result
    /// transition a single atomic claim.
    pub fn with_game_mut<T>(
        &self,
        id: GameId,
        f: impl FnOnce(&mut Game) -> PlatformResult<T>,
    ) -> PlatformResult<T> {
        let mut entry = self
            .games
            .get_mut(&id)
            .ok_or_else(|| PlatformError::not_found("game", id))?;
        f(entry.value_mut())
    }

    /// Games listed newest first, optionally filtered by status
    pub fn games_by_status(&self, status: Option<GameStatus>, limit: usize) -> Vec<Game> {
        let mut games: Vec<Game> = self
            .games
            .iter()
            .filter(|g| status.map_or(true, |s| g.status == s))
            .map(|g| g.clone())
            .collect();
        games.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        games.truncate(limit);
        games
    }

    /// Open games created at or before `now` minus the settlement delay
    pub fn due_for_settlement(&self, now: DateTime<Utc>, delay_minutes: u64) -> Vec<GameId> {
        let cutoff = now - Duration::minutes(delay_minutes as i64);
        self.games
            .iter()
            .filter(|g| g.status == GameStatus::Open && g.created_at <= cutoff)
            .map(|g| g.id)
            .collect()
    }

    /// Next value of the global bid sequence
    pub fn next_bid_sequence(&self) -> u64 {
        self.bid_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn insert_bid(&self, bid: Bid) {
        self.game_bids.entry(bid.game).or_default().push(bid.id);
        self.bids.insert(bid.id, bid);
    }

    pub fn bids_for_game(&self, game: GameId) -> Vec<Bid> {
        let Some(ids) = self.game_bids.get(&game) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.bids.get(id).map(|b| b.clone()))
            .collect()
    }

    pub fn bids_for_user(&self, user: UserId, limit: usize) -> Vec<Bid> {
        let mut bids: Vec<Bid> = self
            .bids
            .iter()
            .filter(|b| b.user == user)
            .map(|b| b.clone())
            .collect();
        bids.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bids.truncate(limit);
        bids
    }

    /// Bids for a game staked on one number
    pub fn bids_on_number(&self, game: GameId, number: u8) -> Vec<Bid> {
        self.bids_for_game(game)
            .into_iter()
            .filter(|b| b.number == number)
            .collect()
    }

    /// One user's bid on a specific number in a game, if any
    pub fn bid_for(&self, game: GameId, user: UserId, number: u8) -> Option<Bid> {
        self.bids_for_game(game)
            .into_iter()
            .find(|b| b.user == user && b.number == number)
    }

    /// Per-number bid lists for a game, keyed 1 to 12 in ascending order.
    /// Numbers that received no bids are absent.
    pub fn aggregate_by_number(&self, game: GameId) -> BTreeMap<u8, Vec<Bid>> {
        let mut by_number: BTreeMap<u8, Vec<Bid>> = BTreeMap::new();
        for bid in self.bids_for_game(game) {
            by_number.entry(bid.number).or_default().push(bid);
        }
        by_number
    }

    pub fn record_override(&self, decision: ManualOverride) -> ManualOverride {
        self.overrides
            .entry(decision.game)
            .or_default()
            .push(decision.clone());
        decision
    }

    /// The override honored by settlement: the first one recorded
    pub fn first_override(&self, game: GameId) -> Option<ManualOverride> {
        self.overrides
            .get(&game)
            .and_then(|list| list.first().cloned())
    }

    pub fn overrides_for(&self, game: GameId) -> Vec<ManualOverride> {
        self.overrides
            .get(&game)
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::window_start;
    use uuid::Uuid;

    #[test]
    fn test_create_game_rejects_duplicate_window() {
        let store = GameStore::new();
        let window = window_start(Utc::now(), 30);
        store.create_game(window).unwrap();

        let err = store.create_game(window).unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn test_ensure_game_is_idempotent() {
        let store = GameStore::new();
        let window = window_start(Utc::now(), 30);

        let (first, created) = store.ensure_game(window);
        assert!(created);
        let (second, created_again) = store.ensure_game(window);
        assert!(!created_again);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_bid_sequence_is_monotonic() {
        let store = GameStore::new();
        let a = store.next_bid_sequence();
        let b = store.next_bid_sequence();
        let c = store.next_bid_sequence();
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[test]
    fn test_aggregate_by_number_orders_ascending() {
        let store = GameStore::new();
        let game = store.create_game(window_start(Utc::now(), 30)).unwrap();

        for (user, number, amount) in [
            (Uuid::new_v4(), 7, 50),
            (Uuid::new_v4(), 2, 30),
            (Uuid::new_v4(), 7, 20),
        ] {
            store.insert_bid(Bid {
                id: Uuid::new_v4(),
                user,
                game: game.id,
                number,
                amount,
                sequence: store.next_bid_sequence(),
                created_at: Utc::now(),
            });
        }

        let by_number = store.aggregate_by_number(game.id);
        let numbers: Vec<u8> = by_number.keys().copied().collect();
        assert_eq!(numbers, vec![2, 7]);
        assert_eq!(by_number[&7].len(), 2);
        assert_eq!(by_number[&2].len(), 1);
    }

    #[test]
    fn test_first_override_wins() {
        let store = GameStore::new();
        let game = store.create_game(window_start(Utc::now(), 30)).unwrap();

        for number in [5, 9] {
            store.record_override(ManualOverride {
                id: Uuid::new_v4(),
                game: game.id,
                winner_number: number,
                manual_winners: vec![],
                payout_multiplier: 2,
                note: None,
                created_at: Utc::now(),
            });
        }

        assert_eq!(store.first_override(game.id).unwrap().winner_number, 5);
        assert_eq!(store.overrides_for(game.id).len(), 2);
    }

    #[test]
    fn test_due_for_settlement_filters_on_age_and_status() {
        let store = GameStore::new();
        let now = Utc::now();
        let game = store.create_game(window_start(now, 30)).unwrap();

        assert!(store.due_for_settlement(now, 25).is_empty());
        let later = now + Duration::minutes(26);
        assert_eq!(store.due_for_settlement(later, 25), vec![game.id]);

        store
            .with_game_mut(game.id, |g| {
                g.status = GameStatus::Result;
                Ok(())
            })
            .unwrap();
        assert!(store.due_for_settlement(later, 25).is_empty());
    }
}
