use std::collections::BTreeSet;
use std::fmt;

use crate::error::{LottoError, Result};

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A parsed lottery schedule descriptor.
///
/// Accepts `sec min hour dom month dow` (6 fields) or
/// `min hour dom month dow` (5 fields, seconds assumed `0`). Only the
/// weekday set is interpreted; the remaining fields are
/// range-checked and passed through to the cron engine unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSpec {
    expr: String,
    second: String,
    minute: String,
    hour: String,
    day_of_month: String,
    month: String,
    weekdays: BTreeSet<u32>,
}

impl ScheduleSpec {
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let (second, rest) = match fields.len() {
            5 => ("0", &fields[..]),
            6 => (fields[0], &fields[1..]),
            n => {
                return Err(LottoError::schedule(
                    expr,
                    format!("expected 5 or 6 fields, got {n}"),
                ))
            }
        };
        let (minute, hour, dom, month, dow) = (rest[0], rest[1], rest[2], rest[3], rest[4]);

        let check = |field: &str, name: &str, min: u32, max: u32, names: &[&str], base: u32| {
            expand(field, min, max, names, base)
                .map(|_| ())
                .map_err(|reason| LottoError::schedule(expr, format!("{name}: {reason}")))
        };
        check(second, "second", 0, 59, &[], 0)?;
        check(minute, "minute", 0, 59, &[], 0)?;
        check(hour, "hour", 0, 23, &[], 0)?;
        check(dom, "day of month", 1, 31, &[], 0)?;
        check(month, "month", 1, 12, &MONTH_NAMES[..], 1)?;

        let weekdays: BTreeSet<u32> = expand(dow, 0, 7, &WEEKDAY_NAMES[..], 0)
            .map_err(|reason| LottoError::schedule(expr, format!("day of week: {reason}")))?
            .into_iter()
            .map(|d| d % 7)
            .collect();
        if weekdays.is_empty() {
            return Err(LottoError::schedule(expr, "no draw weekdays"));
        }

        Ok(Self {
            expr: expr.trim().to_string(),
            second: second.to_string(),
            minute: minute.to_string(),
            hour: hour.to_string(),
            day_of_month: dom.to_string(),
            month: month.to_string(),
            weekdays,
        })
    }

    /// Original expression as written.
    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// Draw weekdays, Sunday = 0.
    pub fn weekdays(&self) -> &BTreeSet<u32> {
        &self.weekdays
    }

    pub fn is_draw_day(&self, weekday: u32) -> bool {
        self.weekdays.contains(&weekday)
    }

    /// Normalized 6-field expression with named weekdays.
    ///
    /// Weekday numbering differs between cron dialects (0 or 1 for Sunday),
    /// names are read the same way everywhere.
    pub fn engine_expression(&self) -> String {
        let dom = if self.day_of_month == "?" {
            "*"
        } else {
            self.day_of_month.as_str()
        };
        let dow = if self.weekdays.len() == 7 {
            "*".to_string()
        } else {
            self.weekdays
                .iter()
                .map(|d| WEEKDAY_NAMES[*d as usize])
                .collect::<Vec<_>>()
                .join(",")
        };
        format!(
            "{} {} {} {} {} {}",
            self.second, self.minute, self.hour, dom, self.month, dow
        )
    }
}

impl fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

/// Expand one cron field into the set of values it selects.
fn expand(
    field: &str,
    min: u32,
    max: u32,
    names: &[&str],
    base: u32,
) -> std::result::Result<BTreeSet<u32>, String> {
    let mut out = BTreeSet::new();
    for part in field.split(',') {
        if part.is_empty() {
            return Err(format!("empty list element in '{field}'"));
        }
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid step '{step}'"))?;
                if step == 0 {
                    return Err("step must be positive".to_string());
                }
                (range, step)
            }
            None => (part, 1),
        };

        let (lo, hi) = match range {
            "*" | "?" => (min, max),
            _ => match range.split_once('-') {
                Some((a, b)) => {
                    let lo = value(a, min, max, names, base)?;
                    let hi = value(b, min, max, names, base)?;
                    if lo > hi {
                        return Err(format!("descending range '{range}'"));
                    }
                    (lo, hi)
                }
                // `5/10` means "from 5 to the end, every 10".
                None if step > 1 => (value(range, min, max, names, base)?, max),
                None => {
                    let v = value(range, min, max, names, base)?;
                    (v, v)
                }
            },
        };
        out.extend((lo..=hi).step_by(step as usize));
    }
    Ok(out)
}

fn value(token: &str, min: u32, max: u32, names: &[&str], base: u32) -> std::result::Result<u32, String> {
    if let Ok(v) = token.parse::<u32>() {
        if (min..=max).contains(&v) {
            return Ok(v);
        }
        return Err(format!("{v} out of range {min}-{max}"));
    }
    names
        .iter()
        .position(|n| n.eq_ignore_ascii_case(token))
        .map(|i| i as u32 + base)
        .ok_or_else(|| format!("invalid value '{token}'"))
}
