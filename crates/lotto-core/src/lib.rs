//! `lotto-core`: shared configuration, error type, data model, lottery
//! format registry and schedule descriptor parsing.

pub mod config;
pub mod error;
pub mod format;
pub mod schedule;
pub mod types;

pub use error::{LottoError, Result};
pub use format::{GroupRule, LotteryFormat, TierRule};
pub use schedule::ScheduleSpec;
pub use types::{
    DrawInfo, DrawInfoSource, DrawResult, FetchedDraw, LotteryType, NewRecommendation, PrizeTier,
    Recommendation, TierPrize,
};
