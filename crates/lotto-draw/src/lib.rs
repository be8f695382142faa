//! `lotto-draw`: the draw lifecycle: resolving the upcoming draw and its
//! period, fetching official results and scoring recommendations against
//! them.

pub mod analyzer;
pub mod envelope;
pub mod error;
pub mod fetcher;
mod lenient;
pub mod period;
pub mod prize;
pub mod resolver;

pub use analyzer::{analyze, AnalysisSummary, WinAnalyzer};
pub use error::{DrawError, Result};
pub use fetcher::{FetchSummary, JisuResultSource, ResultFetcher, ResultSource};
pub use resolver::DrawInfoResolver;
