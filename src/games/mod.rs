pub mod bids;
pub mod commission;
pub mod scheduler;
pub mod settlement;
pub mod store;
pub mod types;

pub use bids::BidBook;
pub use commission::{CommissionSettings, CommissionSplit, CommissionVault};
pub use scheduler::GameScheduler;
pub use settlement::{SettlementEngine, SettlementOutcome, SettlementReport};
pub use store::GameStore;
pub use types::{Bid, Game, GameStatus, ManualOverride};
