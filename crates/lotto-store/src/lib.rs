//! `lotto-store`: SQLite persistence for lottery types, recommendations
//! and official draw results.

pub mod db;
pub mod draw_results;
pub mod error;
pub mod lottery_types;
pub mod recommendations;
pub mod store;

pub use draw_results::{DrawResultFilter, UpsertOutcome};
pub use error::{Result, StoreError};
pub use lottery_types::LotteryTypeUpdate;
pub use recommendations::RecommendationFilter;
pub use store::LotteryStore;
