//! Draw period arithmetic.
//!
//! A period is a year prefix (`YY`, sometimes `YYYY`) followed by a
//! three-digit sequence within that year, e.g. `24099`.

use chrono::{Datelike, Days, NaiveDate};
use lotto_core::{LotteryFormat, ScheduleSpec};

/// A year is assumed to hold at least this many draws; a prior period
/// below it never rolls over into a new year.
pub const ROLLOVER_THRESHOLD: u32 = 150;

/// Period following `prior`, for a draw held on `target`.
///
/// Returns `None` when `prior` is not a usable period (shorter than five
/// characters or not numeric), leaving the caller to synthesize one.
pub fn next_period(prior: &str, target: NaiveDate) -> Option<String> {
    let prior = prior.trim();
    if prior.len() < 5 || !prior.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (prefix, seq) = prior.split_at(prior.len() - 3);
    let seq: u32 = seq.parse().ok()?;

    let target_prefix = year_prefix(target.year(), prefix.len());
    if prefix != target_prefix && seq >= ROLLOVER_THRESHOLD {
        return Some(format!("{target_prefix}001"));
    }
    Some(format!("{prefix}{:03}", seq + 1))
}

/// Period derived from the calendar alone: ISO week and the draw's
/// position within that week.
///
/// The format's weekday ordinals are used when known; otherwise the
/// position of the weekday among the schedule's draw days (Monday first).
pub fn synthesize_period(
    format: Option<&LotteryFormat>,
    schedule: &ScheduleSpec,
    date: NaiveDate,
) -> String {
    let iso = date.iso_week();
    let weekday = date.weekday().num_days_from_sunday();

    let (ordinal, per_week) = match format {
        Some(f) => (f.ordinal_for(weekday), f.draws_per_week()),
        None => {
            let mut days: Vec<u32> = schedule
                .weekdays()
                .iter()
                .map(|d| (d + 6) % 7) // Monday = 0
                .collect();
            days.sort_unstable();
            let pos = days
                .iter()
                .position(|d| *d == (weekday + 6) % 7)
                .map(|p| p as u32 + 1);
            (pos, days.len() as u32)
        }
    };
    let seq = (iso.week() - 1) * per_week.max(1) + ordinal.unwrap_or(1);
    format!("{:02}{:03}", iso.year().rem_euclid(100), seq)
}

/// Date of the next draw as seen at `today`/`hour`.
///
/// Today counts while its draw hour has not been reached; otherwise the
/// next scheduled weekday within the coming week.
pub fn next_draw_date(
    schedule: &ScheduleSpec,
    today: NaiveDate,
    hour: u32,
    draw_hour: u32,
) -> NaiveDate {
    if hour < draw_hour && schedule.is_draw_day(today.weekday().num_days_from_sunday()) {
        return today;
    }
    (1..=7)
        .map(|d| today + Days::new(d))
        .find(|date| schedule.is_draw_day(date.weekday().num_days_from_sunday()))
        .unwrap_or(today + Days::new(7))
}

fn year_prefix(year: i32, width: usize) -> String {
    if width >= 4 {
        format!("{year}")
    } else {
        format!("{:02}", year.rem_euclid(100))
    }
}
