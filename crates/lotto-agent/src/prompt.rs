use lotto_core::LotteryFormat;

use crate::validate::{CLOSE_MARKER, OPEN_MARKER};

/// System instruction shared by single and batch requests.
pub fn system_prompt(format: &LotteryFormat) -> String {
    format!(
        "You generate lottery number combinations for the {code} game: {label}.\n\
         Rules:\n\
         - Write every number as two digits with a leading zero (e.g. 03).\n\
         - Sort each group in ascending order, no repeated numbers within a group.\n\
         - Separate numbers with commas and the two groups with a single '+'.\n\
         - Wrap each combination in {OPEN_MARKER}...{CLOSE_MARKER}.\n\
         Example: {OPEN_MARKER}{example}{CLOSE_MARKER}",
        code = format.code,
        label = format.label,
        example = format.example,
    )
}

pub fn single_prompt(format: &LotteryFormat) -> String {
    format!(
        "Generate one combination for the next {} draw. Reply with exactly one \
         {OPEN_MARKER}...{CLOSE_MARKER} span and nothing else.",
        format.code
    )
}

pub fn batch_prompt(format: &LotteryFormat, count: usize) -> String {
    format!(
        "Generate {count} different combinations for the next {} draw. Reply with \
         {count} {OPEN_MARKER}...{CLOSE_MARKER} spans, one per line, and nothing else.",
        format.code
    )
}
