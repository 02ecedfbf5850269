use crate::common::types::{Amount, BidId, GameId, OverrideId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Smallest number a bid may be placed on
pub const MIN_BID_NUMBER: u8 = 1;
/// Largest number a bid may be placed on
pub const MAX_BID_NUMBER: u8 = 12;

/// Multiplier applied to override payouts when none is recorded
pub const DEFAULT_PAYOUT_MULTIPLIER: u64 = 2;

/// Game lifecycle. A game accepts bids while Open and is finalized exactly
/// once into Result; there is no materialized intermediate state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Open,
    Result,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Open => write!(f, "open"),
            GameStatus::Result => write!(f, "result"),
        }
    }
}

/// One betting window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    /// Canonical start timestamp of the window
    pub time_window: DateTime<Utc>,
    pub status: GameStatus,
    /// Sum of all accepted bid amounts for this window
    pub total_pool: Amount,
    /// Winning number once settled. None after a no-winner settlement.
    pub result_number: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl Game {
    pub fn new(time_window: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            time_window,
            status: GameStatus::Open,
            total_pool: 0,
            result_number: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == GameStatus::Open
    }
}

/// A user's stake on one number in one game. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub user: UserId,
    pub game: GameId,
    /// Chosen number, 1 to 12
    pub number: u8,
    pub amount: Amount,
    /// Global display/audit sequence, monotonically increasing
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

/// Admin decision fixing a game's winning number ahead of settlement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualOverride {
    pub id: OverrideId,
    pub game: GameId,
    pub winner_number: u8,
    /// Users paid under the override; each still needs a matching bid
    pub manual_winners: Vec<UserId>,
    pub payout_multiplier: u64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Floor a timestamp to the start of its betting window
pub fn window_start(at: DateTime<Utc>, window_minutes: u64) -> DateTime<Utc> {
    let window_secs = (window_minutes * 60) as i64;
    let rem = at.timestamp().rem_euclid(window_secs);
    let on_boundary = at - Duration::seconds(rem);
    on_boundary - Duration::nanoseconds(i64::from(on_boundary.timestamp_subsec_nanos()))
}

/// True if `number` is within the playable range
pub fn valid_bid_number(number: u8) -> bool {
    (MIN_BID_NUMBER..=MAX_BID_NUMBER).contains(&number)
}
