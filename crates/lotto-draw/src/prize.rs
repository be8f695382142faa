//! Provider prize-name vocabulary.

const TIER_NAMES: [&str; 9] = [
    "一等奖", "二等奖", "三等奖", "四等奖", "五等奖", "六等奖", "七等奖", "八等奖", "九等奖",
];

/// Marks the add-on variant of a tier, e.g. `一等奖追加`.
const ADD_ON: &str = "追加";

/// Map a provider prize name to `(level, add_on)`.
pub fn classify(name: &str) -> Option<(u8, bool)> {
    let name = name.trim();
    let level = TIER_NAMES.iter().position(|t| name.contains(t))? as u8 + 1;
    Some((level, name.contains(ADD_ON)))
}
