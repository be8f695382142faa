use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lotto_core::config::ResultsApiConfig;
use lotto_core::{DrawResult, FetchedDraw, LotteryType, TierPrize};
use lotto_store::{LotteryStore, UpsertOutcome};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::analyzer::WinAnalyzer;
use crate::envelope::parse_date;
use crate::error::{DrawError, Result};
use crate::lenient::{f64_from_any, opt_string_from_any, string_from_any, u32_from_any};
use crate::prize;

/// Somewhere official results come from.
#[async_trait]
pub trait ResultSource: Send + Sync {
    fn name(&self) -> &str;

    /// Most recent official draw for a lottery.
    async fn fetch_latest(&self, lottery: &LotteryType) -> Result<FetchedDraw>;
}

/// Client for the jisuapi lottery query endpoint.
pub struct JisuResultSource {
    client: reqwest::Client,
    base_url: String,
    app_key: String,
}

impl JisuResultSource {
    pub fn new(base_url: impl Into<String>, app_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build results HTTP client; using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            base_url: base_url.into(),
            app_key: app_key.into(),
        }
    }

    pub fn from_config(cfg: &ResultsApiConfig) -> Self {
        Self::new(
            cfg.base_url.clone(),
            cfg.app_key.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }
}

#[async_trait]
impl ResultSource for JisuResultSource {
    fn name(&self) -> &str {
        "jisu"
    }

    async fn fetch_latest(&self, lottery: &LotteryType) -> Result<FetchedDraw> {
        let caipiao_id = lottery
            .results_api_id
            .ok_or_else(|| DrawError::NotConfigured(lottery.code.clone()))?;

        debug!(code = %lottery.code, caipiao_id, "querying results provider");
        let resp = self
            .client
            .post(&self.base_url)
            .query(&[("appkey", self.app_key.clone()), ("caipiaoid", caipiao_id.to_string())])
            .header("content-type", "application/x-www-form-urlencoded")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DrawError::Api {
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await?;
        parse_jisu_response(lottery, &body)
    }
}

// ---------------------------------------------------------------------------
// Provider wire format
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct JisuEnvelope {
    #[serde(deserialize_with = "string_from_any")]
    status: String,
    #[serde(default)]
    msg: Option<String>,
    result: Option<JisuResult>,
}

#[derive(Deserialize)]
struct JisuResult {
    #[serde(deserialize_with = "string_from_any")]
    issueno: String,
    number: String,
    #[serde(default, deserialize_with = "string_from_any")]
    refernumber: String,
    opendate: String,
    #[serde(default, deserialize_with = "opt_string_from_any")]
    officialopendate: Option<String>,
    #[serde(default, deserialize_with = "opt_string_from_any")]
    deadline: Option<String>,
    #[serde(default, deserialize_with = "f64_from_any")]
    saleamount: f64,
    #[serde(default, deserialize_with = "f64_from_any")]
    totalmoney: f64,
    #[serde(default)]
    prize: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct JisuPrize {
    prizename: String,
    #[serde(default, deserialize_with = "u32_from_any")]
    num: u32,
    #[serde(default, deserialize_with = "f64_from_any")]
    singlebonus: f64,
}

/// Turn a provider response body into a canonical draw for `lottery`.
pub fn parse_jisu_response(lottery: &LotteryType, body: &[u8]) -> Result<FetchedDraw> {
    let env: JisuEnvelope =
        serde_json::from_slice(body).map_err(|e| DrawError::Parse(e.to_string()))?;
    if env.status.trim() != "0" {
        return Err(DrawError::Provider {
            code: env.status,
            message: env.msg.unwrap_or_default(),
        });
    }
    let result = env
        .result
        .ok_or_else(|| DrawError::Parse("missing result".to_string()))?;

    let period = result.issueno.trim().to_string();
    if period.is_empty() {
        return Err(DrawError::Parse("missing issueno".to_string()));
    }
    // Some games report the special numbers after a '+' in `number`.
    let (main_raw, special_raw) = match result.number.split_once('+') {
        Some((main, special)) if result.refernumber.trim().is_empty() => (main, special),
        _ => (result.number.as_str(), result.refernumber.as_str()),
    };
    let main_numbers = normalize_numbers(main_raw)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DrawError::Parse(format!("bad numbers '{}'", result.number)))?;
    let special_numbers = normalize_numbers(special_raw).unwrap_or_default();

    let (prize_info, breakdown) = match result.prize {
        Some(raw @ serde_json::Value::Array(_)) => {
            let breakdown = breakdown_from(&raw, &lottery.code);
            (raw.to_string(), breakdown)
        }
        _ => {
            warn!(code = %lottery.code, %period, "provider returned no prize list");
            ("[]".to_string(), Vec::new())
        }
    };

    Ok(FetchedDraw {
        lottery_type_id: lottery.id,
        results_api_id: lottery.results_api_id,
        period,
        main_numbers,
        special_numbers,
        draw_date: parse_date(&result.opendate)?,
        sale_amount: result.saleamount,
        pool_amount: result.totalmoney,
        official_open_date: result.officialopendate,
        deadline: result.deadline,
        prize_info,
        breakdown,
    })
}

fn breakdown_from(raw: &serde_json::Value, code: &str) -> Vec<TierPrize> {
    let prizes: Vec<JisuPrize> = match serde_json::from_value(raw.clone()) {
        Ok(p) => p,
        Err(e) => {
            warn!(code, error = %e, "unparsable prize list; storing empty breakdown");
            return Vec::new();
        }
    };
    prizes
        .into_iter()
        .filter_map(|p| match prize::classify(&p.prizename) {
            Some((level, add_on)) => Some(TierPrize {
                level,
                add_on,
                amount: p.singlebonus,
                winners: p.num,
            }),
            None => {
                debug!(name = %p.prizename, "dropping unrecognized prize tier");
                None
            }
        })
        .collect()
}

/// `"3,5 18"` → `"03 05 18"`. `None` when any token is not a number.
fn normalize_numbers(raw: &str) -> Option<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<u8>().ok().map(|n| format!("{n:02}")))
        .collect::<Option<Vec<_>>>()
        .map(|v| v.join(" "))
}

// ---------------------------------------------------------------------------
// Fetch orchestration
// ---------------------------------------------------------------------------

/// Outcome counts of a fetch-all pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub fetched: usize,
    /// Active lotteries without a results id.
    pub skipped: usize,
    pub failed: usize,
}

/// Pulls official results into the store and scores the affected period.
pub struct ResultFetcher {
    store: Arc<LotteryStore>,
    source: Arc<dyn ResultSource>,
    analyzer: Arc<WinAnalyzer>,
}

impl ResultFetcher {
    pub fn new(
        store: Arc<LotteryStore>,
        source: Arc<dyn ResultSource>,
        analyzer: Arc<WinAnalyzer>,
    ) -> Self {
        Self {
            store,
            source,
            analyzer,
        }
    }

    /// Fetch and store the latest draw of one lottery.
    ///
    /// Re-fetching a known period overwrites it in place.
    #[instrument(skip(self, lottery), fields(code = %lottery.code, source = self.source.name()))]
    pub async fn fetch_latest(&self, lottery: &LotteryType) -> Result<(DrawResult, UpsertOutcome)> {
        if lottery.results_api_id.is_none() {
            return Err(DrawError::NotConfigured(lottery.code.clone()));
        }
        let fetched = self.source.fetch_latest(lottery).await?;
        let (draw, outcome) = self.store.upsert_draw_result(&fetched)?;
        info!(period = %draw.period, ?outcome, "draw result stored");
        Ok((draw, outcome))
    }

    /// Fetch one lottery by id and score its period.
    pub async fn fetch_one(&self, lottery_type_id: i64) -> Result<DrawResult> {
        let lottery = self
            .store
            .get_lottery_type(lottery_type_id)?
            .ok_or_else(|| DrawError::UnknownLottery(lottery_type_id.to_string()))?;
        let (draw, _) = self.fetch_latest(&lottery).await?;
        self.analyzer.reanalyze_period(&draw)?;
        Ok(draw)
    }

    /// Fetch every active lottery. One lottery failing does not stop the
    /// others.
    #[instrument(skip(self))]
    pub async fn fetch_all_active(&self) -> Result<FetchSummary> {
        let lotteries = self.store.list_active_lottery_types()?;
        let mut summary = FetchSummary::default();

        for lottery in &lotteries {
            if lottery.results_api_id.is_none() {
                debug!(code = %lottery.code, "no results id; skipping");
                summary.skipped += 1;
                continue;
            }
            let stored = match self.fetch_latest(lottery).await {
                Ok((draw, _)) => draw,
                Err(e) => {
                    error!(code = %lottery.code, error = %e, "result fetch failed");
                    summary.failed += 1;
                    continue;
                }
            };
            if let Err(e) = self.analyzer.reanalyze_period(&stored) {
                error!(code = %lottery.code, error = %e, "analysis after fetch failed");
            }
            summary.fetched += 1;
        }

        info!(
            fetched = summary.fetched,
            skipped = summary.skipped,
            failed = summary.failed,
            "fetch pass complete"
        );
        Ok(summary)
    }
}
