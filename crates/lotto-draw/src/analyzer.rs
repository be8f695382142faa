//! Scoring recommendations against official draws.

use std::collections::HashSet;
use std::sync::Arc;

use lotto_core::{format, DrawResult, PrizeTier, Recommendation};
use lotto_store::LotteryStore;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{DrawError, Result};

/// Tier and reference amount of one combination against one draw.
///
/// Unknown formats and malformed inputs yield [`PrizeTier::Unknown`], which
/// leaves the recommendation eligible for a later pass.
pub fn analyze(code: &str, numbers: &str, draw: &DrawResult) -> (PrizeTier, f64) {
    let Some(format) = format::lookup(code) else {
        return (PrizeTier::Unknown, 0.0);
    };
    let Some((main, secondary)) = numbers.split_once('+') else {
        return (PrizeTier::Unknown, 0.0);
    };
    let (Some(main), Some(secondary), Some(win_main), Some(win_secondary)) = (
        tokens(main),
        tokens(secondary),
        tokens(&draw.main_numbers),
        tokens(&draw.special_numbers),
    ) else {
        return (PrizeTier::Unknown, 0.0);
    };
    if main.len() != format.main.count
        || secondary.len() != format.secondary.count
        || win_main.len() != format.main.count
        || win_secondary.len() != format.secondary.count
    {
        return (PrizeTier::Unknown, 0.0);
    }

    let main_hits = main.intersection(&win_main).count();
    let secondary_hits = secondary.intersection(&win_secondary).count();
    format.tier_for(main_hits, secondary_hits)
}

/// Numbers of one group, normalized to two digits. `None` on a
/// non-numeric token or an empty group.
fn tokens(group: &str) -> Option<HashSet<String>> {
    let set: Option<HashSet<String>> = group
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<u8>().ok().map(|n| format!("{n:02}")))
        .collect();
    set.filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    /// Recommendations given an outcome in this pass.
    pub analyzed: usize,
    /// Of those, how many won a tier.
    pub winners: usize,
}

/// Applies [`analyze`] to stored recommendations.
///
/// Only unsettled recommendations are touched, so running a pass twice
/// over the same draw changes nothing the second time.
pub struct WinAnalyzer {
    store: Arc<LotteryStore>,
}

impl WinAnalyzer {
    pub fn new(store: Arc<LotteryStore>) -> Self {
        Self { store }
    }

    /// Score every unsettled recommendation targeting `draw`'s period.
    #[instrument(skip(self, draw), fields(lottery_type_id = draw.lottery_type_id, period = %draw.period))]
    pub fn reanalyze_period(&self, draw: &DrawResult) -> Result<AnalysisSummary> {
        let lottery = self
            .store
            .get_lottery_type(draw.lottery_type_id)?
            .ok_or_else(|| DrawError::UnknownLottery(draw.lottery_type_id.to_string()))?;

        let pending = self
            .store
            .list_unsettled_for_period(draw.lottery_type_id, &draw.period)?;
        let official = draw.official_result();

        let mut summary = AnalysisSummary::default();
        for rec in pending {
            let (tier, amount) = analyze(&lottery.code, &rec.numbers, draw);
            if tier == PrizeTier::Unknown {
                warn!(id = rec.id, numbers = %rec.numbers, "recommendation could not be analyzed");
            }
            if self.store.record_outcome(rec.id, tier, amount, &official)? && tier.is_settled() {
                summary.analyzed += 1;
                if tier.level().is_some() {
                    summary.winners += 1;
                }
            }
        }
        info!(analyzed = summary.analyzed, winners = summary.winners, "period analyzed");
        Ok(summary)
    }

    /// Analyze a single recommendation if its draw is already stored.
    ///
    /// Returns the recorded tier, or `None` when there is no draw yet or the
    /// recommendation was already settled.
    #[instrument(skip(self, rec), fields(id = rec.id))]
    pub fn reconcile(&self, rec: &Recommendation) -> Result<Option<PrizeTier>> {
        if rec.is_settled() {
            return Ok(None);
        }
        let Some(draw) = self
            .store
            .get_draw_result(rec.lottery_type_id, &rec.target_period)?
        else {
            return Ok(None);
        };
        let lottery = self
            .store
            .get_lottery_type(rec.lottery_type_id)?
            .ok_or_else(|| DrawError::UnknownLottery(rec.lottery_type_id.to_string()))?;

        let (tier, amount) = analyze(&lottery.code, &rec.numbers, &draw);
        let written = self
            .store
            .record_outcome(rec.id, tier, amount, &draw.official_result())?;
        debug!(%tier, written, "reconciled against stored draw");
        Ok(written.then_some(tier))
    }

    /// Re-run a period from the stored draw.
    pub fn reanalyze_stored(&self, lottery_type_id: i64, period: &str) -> Result<AnalysisSummary> {
        let draw = self
            .store
            .get_draw_result(lottery_type_id, period)?
            .ok_or_else(|| DrawError::NoDrawResult {
                lottery_type_id,
                period: period.to_string(),
            })?;
        self.reanalyze_period(&draw)
    }
}
