//! Lottery format registry.
//!
//! Every supported game is a [`LotteryFormat`] row in [`FORMATS`]: group
//! sizes and ranges, the weekly draw calendar and the prize decision table.
//! Adding a game is a data change here; nothing else branches on codes.

use crate::types::PrizeTier;

/// Cardinality and inclusive value range of one number group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRule {
    pub count: usize,
    pub min: u8,
    pub max: u8,
}

impl GroupRule {
    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// One row of a prize decision table.
///
/// `matches` lists the `(main, secondary)` match counts that win `tier`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierRule {
    pub tier: PrizeTier,
    pub matches: &'static [(usize, usize)],
    /// Fixed reference amount; not the provider's pool-derived payout.
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotteryFormat {
    pub code: &'static str,
    /// Human-readable shape used in generation prompts.
    pub label: &'static str,
    pub main: GroupRule,
    pub secondary: GroupRule,
    /// `(weekday, ordinal)` pairs, weekday 0 = Sunday, ordinal 1-based
    /// position of that draw within the ISO week.
    pub draw_weekdays: &'static [(u32, u32)],
    /// Evaluated top to bottom; the first matching row wins.
    pub tiers: &'static [TierRule],
    /// A well-formed sample combination.
    pub example: &'static str,
}

/// Format A: 6 of 1-33 plus 1 of 1-16, drawn Tue/Thu/Sun.
pub const SSQ: LotteryFormat = LotteryFormat {
    code: "fc_ssq",
    label: "6 main numbers from 01-33 + 1 secondary number from 01-16",
    main: GroupRule { count: 6, min: 1, max: 33 },
    secondary: GroupRule { count: 1, min: 1, max: 16 },
    draw_weekdays: &[(2, 1), (4, 2), (0, 3)],
    tiers: &[
        TierRule { tier: PrizeTier::Tier1, matches: &[(6, 1)], amount: 5_000_000.0 },
        TierRule { tier: PrizeTier::Tier2, matches: &[(6, 0)], amount: 100_000.0 },
        TierRule { tier: PrizeTier::Tier3, matches: &[(5, 1)], amount: 3_000.0 },
        TierRule { tier: PrizeTier::Tier4, matches: &[(5, 0), (4, 1)], amount: 200.0 },
        TierRule { tier: PrizeTier::Tier5, matches: &[(4, 0), (3, 1)], amount: 10.0 },
        TierRule { tier: PrizeTier::Tier6, matches: &[(2, 1), (1, 1), (0, 1)], amount: 5.0 },
    ],
    example: "01,05,13,22,29,33+07",
};

/// Format B: 5 of 1-35 plus 2 of 1-12, drawn Mon/Wed/Sat.
pub const DLT: LotteryFormat = LotteryFormat {
    code: "tc_dlt",
    label: "5 main numbers from 01-35 + 2 secondary numbers from 01-12",
    main: GroupRule { count: 5, min: 1, max: 35 },
    secondary: GroupRule { count: 2, min: 1, max: 12 },
    draw_weekdays: &[(1, 1), (3, 2), (6, 3)],
    tiers: &[
        TierRule { tier: PrizeTier::Tier1, matches: &[(5, 2)], amount: 10_000_000.0 },
        TierRule { tier: PrizeTier::Tier2, matches: &[(5, 1)], amount: 200_000.0 },
        TierRule { tier: PrizeTier::Tier3, matches: &[(5, 0)], amount: 10_000.0 },
        TierRule { tier: PrizeTier::Tier4, matches: &[(4, 2)], amount: 3_000.0 },
        TierRule { tier: PrizeTier::Tier5, matches: &[(4, 1)], amount: 300.0 },
        TierRule { tier: PrizeTier::Tier6, matches: &[(3, 2)], amount: 200.0 },
        TierRule { tier: PrizeTier::Tier7, matches: &[(4, 0)], amount: 100.0 },
        TierRule { tier: PrizeTier::Tier8, matches: &[(3, 1), (2, 2)], amount: 15.0 },
        TierRule {
            tier: PrizeTier::Tier9,
            matches: &[(3, 0), (1, 2), (2, 1), (0, 2)],
            amount: 5.0,
        },
    ],
    example: "03,05,18,27,34+08,11",
};

pub static FORMATS: &[LotteryFormat] = &[SSQ, DLT];

/// Look up a format by lottery code.
pub fn lookup(code: &str) -> Option<&'static LotteryFormat> {
    FORMATS.iter().find(|f| f.code == code)
}

impl LotteryFormat {
    /// Apply the decision table to a pair of match counts.
    pub fn tier_for(&self, main_matches: usize, secondary_matches: usize) -> (PrizeTier, f64) {
        self.tiers
            .iter()
            .find(|rule| rule.matches.contains(&(main_matches, secondary_matches)))
            .map(|rule| (rule.tier, rule.amount))
            .unwrap_or((PrizeTier::NoWin, 0.0))
    }

    /// Position of a draw weekday within the week, if the format draws then.
    pub fn ordinal_for(&self, weekday: u32) -> Option<u32> {
        self.draw_weekdays
            .iter()
            .find(|(day, _)| *day == weekday)
            .map(|(_, ordinal)| *ordinal)
    }

    pub fn draws_per_week(&self) -> u32 {
        self.draw_weekdays.len() as u32
    }
}
