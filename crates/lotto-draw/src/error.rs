use lotto_core::LottoError;
use lotto_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrawError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("API returned HTTP {status}")]
    Api { status: u16 },

    /// The provider answered but reported a failure in its envelope.
    #[error("provider error {code}: {message}")]
    Provider { code: String, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown lottery: {0}")]
    UnknownLottery(String),

    #[error("lottery {0} has no results API id configured")]
    NotConfigured(String),

    #[error("no draw result for lottery {lottery_type_id} period {period}")]
    NoDrawResult { lottery_type_id: i64, period: String },

    #[error(transparent)]
    Schedule(#[from] LottoError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, DrawError>;
