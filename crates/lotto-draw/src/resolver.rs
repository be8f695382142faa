use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use lotto_core::config::DrawConfig;
use lotto_core::{format, DrawInfo, DrawInfoSource, LotteryType, ScheduleSpec};
use lotto_store::LotteryStore;
use tracing::{debug, instrument, warn};

use crate::envelope::{self, ApiDraw, DrawPosition};
use crate::error::{DrawError, Result};
use crate::period::{next_draw_date, next_period, synthesize_period};

/// Works out the current and upcoming draw of a lottery.
///
/// A configured per-lottery endpoint is tried first; any failure there is
/// logged and the draw is computed from the schedule and the latest stored
/// result instead.
pub struct DrawInfoResolver {
    client: reqwest::Client,
    store: Arc<LotteryStore>,
    draw_hour: u32,
    tz: FixedOffset,
}

impl DrawInfoResolver {
    pub fn new(store: Arc<LotteryStore>, cfg: &DrawConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.info_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build draw-info HTTP client; using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            store,
            draw_hour: cfg.draw_hour.min(23),
            tz: cfg.offset(),
        }
    }

    pub async fn resolve(&self, lottery: &LotteryType) -> Result<DrawInfo> {
        self.resolve_at(lottery, Utc::now().with_timezone(&self.tz)).await
    }

    /// Resolve as seen at `now`.
    #[instrument(skip(self, lottery), fields(code = %lottery.code))]
    pub async fn resolve_at(
        &self,
        lottery: &LotteryType,
        now: DateTime<FixedOffset>,
    ) -> Result<DrawInfo> {
        let schedule = ScheduleSpec::parse(&lottery.schedule_cron)?;
        let local = now.with_timezone(&self.tz);
        let today = local.date_naive();
        let computed_date = next_draw_date(&schedule, today, local.hour(), self.draw_hour);

        if let Some(api) = self.try_endpoint(lottery).await {
            let (current, next_date, next) = match api.position {
                DrawPosition::Upcoming => (None, api.draw_date, api.period),
                DrawPosition::Last => {
                    let next = self.advance(lottery, &schedule, &api.period, computed_date);
                    (Some((api.draw_date, api.period)), computed_date, next)
                }
            };
            let (current_draw_date, current_period) = current.unzip();
            return self.build(
                lottery,
                today,
                next_date,
                next,
                current_draw_date,
                current_period,
                DrawInfoSource::Api,
            );
        }

        let latest = self.store.latest_draw_result(lottery.id)?;
        let next = match &latest {
            Some(draw) if draw.draw_date == computed_date => draw.period.clone(),
            Some(draw) => self.advance(lottery, &schedule, &draw.period, computed_date),
            None => synthesize_period(format::lookup(&lottery.code), &schedule, computed_date),
        };
        let (current_draw_date, current_period) =
            latest.map(|d| (d.draw_date, d.period)).unzip();
        self.build(
            lottery,
            today,
            computed_date,
            next,
            current_draw_date,
            current_period,
            DrawInfoSource::Computed,
        )
    }

    fn advance(
        &self,
        lottery: &LotteryType,
        schedule: &ScheduleSpec,
        prior: &str,
        target: NaiveDate,
    ) -> String {
        next_period(prior, target).unwrap_or_else(|| {
            debug!(prior, "prior period unusable; synthesizing");
            synthesize_period(format::lookup(&lottery.code), schedule, target)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        lottery: &LotteryType,
        today: NaiveDate,
        next_date: NaiveDate,
        period: String,
        current_draw_date: Option<NaiveDate>,
        current_period: Option<String>,
        source: DrawInfoSource,
    ) -> Result<DrawInfo> {
        let time = NaiveTime::from_hms_opt(self.draw_hour, 0, 0).unwrap_or(NaiveTime::MIN);
        let next_draw_at = next_date
            .and_time(time)
            .and_local_timezone(self.tz)
            .single()
            .ok_or_else(|| DrawError::Parse(format!("no local instant for {next_date}")))?;
        let is_draw_today = next_date == today;
        // A draw still to be held today is both the current and the next one.
        let (current_draw_date, current_period) = if is_draw_today {
            (Some(today), Some(period.clone()))
        } else {
            (current_draw_date, current_period)
        };
        debug!(period = %period, %next_draw_at, ?source, "draw resolved");
        Ok(DrawInfo {
            code: lottery.code.clone(),
            current_draw_date,
            current_period,
            next_draw_at,
            next_period: period,
            is_draw_today,
            source,
        })
    }

    /// Query the lottery's own endpoint, if it has one with a known envelope.
    async fn try_endpoint(&self, lottery: &LotteryType) -> Option<ApiDraw> {
        let url = lottery.draw_info_endpoint.as_deref().filter(|u| !u.trim().is_empty())?;
        let Some(parser) = envelope::parser_for(&lottery.code) else {
            warn!(code = %lottery.code, "no envelope parser registered; computing draw");
            return None;
        };
        match self.fetch_endpoint(url, parser).await {
            Ok(draw) => Some(draw),
            Err(e) => {
                warn!(code = %lottery.code, error = %e, "draw-info endpoint failed; computing draw");
                None
            }
        }
    }

    async fn fetch_endpoint(
        &self,
        url: &str,
        parser: envelope::EnvelopeParser,
    ) -> Result<ApiDraw> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DrawError::Api {
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await?;
        parser(&body)
    }
}
