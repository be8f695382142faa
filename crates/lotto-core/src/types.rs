use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// A lottery game the system generates recommendations for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotteryType {
    pub id: i64,
    /// Stable machine key, also the format registry key (e.g. `tc_dlt`).
    pub code: String,
    pub name: String,
    /// 5- or 6-field cron expression; see [`crate::ScheduleSpec`].
    pub schedule_cron: String,
    /// Generation model used for this lottery.
    pub model_name: String,
    pub is_active: bool,
    /// Identifier at the results provider. `None` disables result fetching.
    pub results_api_id: Option<i64>,
    /// Optional per-lottery endpoint returning the upcoming draw.
    pub draw_info_endpoint: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Prize level assigned by the win analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeTier {
    Tier1,
    Tier2,
    Tier3,
    Tier4,
    Tier5,
    Tier6,
    Tier7,
    Tier8,
    Tier9,
    NoWin,
    /// Outcome could not be determined; eligible for re-analysis.
    Unknown,
}

impl PrizeTier {
    pub fn level(&self) -> Option<u8> {
        match self {
            PrizeTier::Tier1 => Some(1),
            PrizeTier::Tier2 => Some(2),
            PrizeTier::Tier3 => Some(3),
            PrizeTier::Tier4 => Some(4),
            PrizeTier::Tier5 => Some(5),
            PrizeTier::Tier6 => Some(6),
            PrizeTier::Tier7 => Some(7),
            PrizeTier::Tier8 => Some(8),
            PrizeTier::Tier9 => Some(9),
            PrizeTier::NoWin | PrizeTier::Unknown => None,
        }
    }

    /// Whether this is a final outcome (anything but `Unknown`).
    pub fn is_settled(&self) -> bool {
        *self != PrizeTier::Unknown
    }
}

impl fmt::Display for PrizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrizeTier::Tier1 => "tier1",
            PrizeTier::Tier2 => "tier2",
            PrizeTier::Tier3 => "tier3",
            PrizeTier::Tier4 => "tier4",
            PrizeTier::Tier5 => "tier5",
            PrizeTier::Tier6 => "tier6",
            PrizeTier::Tier7 => "tier7",
            PrizeTier::Tier8 => "tier8",
            PrizeTier::Tier9 => "tier9",
            PrizeTier::NoWin => "no_win",
            PrizeTier::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PrizeTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tier1" => Ok(PrizeTier::Tier1),
            "tier2" => Ok(PrizeTier::Tier2),
            "tier3" => Ok(PrizeTier::Tier3),
            "tier4" => Ok(PrizeTier::Tier4),
            "tier5" => Ok(PrizeTier::Tier5),
            "tier6" => Ok(PrizeTier::Tier6),
            "tier7" => Ok(PrizeTier::Tier7),
            "tier8" => Ok(PrizeTier::Tier8),
            "tier9" => Ok(PrizeTier::Tier9),
            "no_win" => Ok(PrizeTier::NoWin),
            "unknown" => Ok(PrizeTier::Unknown),
            other => Err(format!("unknown prize tier: {other}")),
        }
    }
}

/// A generated number combination targeting one draw period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: i64,
    pub lottery_type_id: i64,
    /// `main,main,...+secondary,...` with zero-padded two-digit values.
    pub numbers: String,
    pub model_name: String,
    pub target_period: String,
    pub expected_draw_time: DateTime<FixedOffset>,
    pub is_purchased: bool,
    /// Denormalized `main+secondary` string of the official draw.
    pub official_result: Option<String>,
    /// `None` until analyzed.
    pub win_tier: Option<PrizeTier>,
    pub win_amount: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl Recommendation {
    /// True once a concrete (non-unknown) outcome has been stored.
    pub fn is_settled(&self) -> bool {
        self.win_tier.is_some_and(|t| t.is_settled())
    }
}

/// Insert payload for a recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewRecommendation {
    pub lottery_type_id: i64,
    pub numbers: String,
    pub model_name: String,
    pub target_period: String,
    pub expected_draw_time: DateTime<FixedOffset>,
}

/// Amount and winner count of one prize tier of an official draw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierPrize {
    /// 1-based prize level.
    pub level: u8,
    /// Secondary "add-on" variant of the tier.
    pub add_on: bool,
    pub amount: f64,
    pub winners: u32,
}

/// Canonical official draw record as parsed from a results provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchedDraw {
    pub lottery_type_id: i64,
    pub results_api_id: Option<i64>,
    pub period: String,
    /// Space-separated zero-padded values.
    pub main_numbers: String,
    pub special_numbers: String,
    pub draw_date: NaiveDate,
    pub sale_amount: f64,
    pub pool_amount: f64,
    pub official_open_date: Option<String>,
    pub deadline: Option<String>,
    /// Raw prize list as returned by the provider (JSON array).
    pub prize_info: String,
    pub breakdown: Vec<TierPrize>,
}

/// A stored official draw, unique per (lottery_type_id, period).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawResult {
    pub id: i64,
    pub lottery_type_id: i64,
    pub results_api_id: Option<i64>,
    pub period: String,
    pub main_numbers: String,
    pub special_numbers: String,
    pub draw_date: NaiveDate,
    pub sale_amount: f64,
    pub pool_amount: f64,
    pub official_open_date: Option<String>,
    pub deadline: Option<String>,
    pub prize_info: String,
    pub breakdown: Vec<TierPrize>,
    pub created_at: String,
    pub updated_at: String,
}

impl DrawResult {
    /// `main+special` string stored on analyzed recommendations.
    pub fn official_result(&self) -> String {
        format!("{}+{}", self.main_numbers, self.special_numbers)
    }
}

/// Where a [`DrawInfo`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawInfoSource {
    Api,
    Computed,
}

/// Resolved current/next draw of a lottery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawInfo {
    pub code: String,
    /// Most recent known draw, if any.
    pub current_draw_date: Option<NaiveDate>,
    pub current_period: Option<String>,
    /// Upcoming (or today's not-yet-held) draw instant.
    pub next_draw_at: DateTime<FixedOffset>,
    pub next_period: String,
    pub is_draw_today: bool,
    pub source: DrawInfoSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prize_tier_roundtrips_through_strings() {
        for (level, tier) in [(1, PrizeTier::Tier1), (5, PrizeTier::Tier5), (9, PrizeTier::Tier9)] {
            let parsed: PrizeTier = tier.to_string().parse().expect("parse");
            assert_eq!(parsed, tier);
            assert_eq!(parsed.level(), Some(level));
        }
        assert_eq!("no_win".parse::<PrizeTier>(), Ok(PrizeTier::NoWin));
        assert!("tier10".parse::<PrizeTier>().is_err());
    }

    #[test]
    fn only_unknown_is_unsettled() {
        assert!(PrizeTier::NoWin.is_settled());
        assert!(PrizeTier::Tier3.is_settled());
        assert!(!PrizeTier::Unknown.is_settled());
    }
}
