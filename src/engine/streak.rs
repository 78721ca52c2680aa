//! Streak calculator.
//!
//! A streak is the count of consecutive calendar days, ending at the most
//! recent post day, on which a user posted. Day arithmetic is done on local
//! calendar dates, not elapsed hours: a post at 23:59 and one the next day at
//! 00:01 are one calendar day apart and keep the chain alive.

use chrono::{DateTime, TimeZone};

/// Whole calendar days between the two instants' local dates. Positive when
/// `later` is on a later date.
pub fn calendar_day_difference<Tz: TimeZone>(later: &DateTime<Tz>, earlier: &DateTime<Tz>) -> i64 {
    later.date_naive().signed_duration_since(earlier.date_naive()).num_days()
}

/// Current posting streak for one user given their (unordered) post instants.
///
/// The scan walks dates most-recent-first: same-day repeats are skipped, a
/// one-day gap extends the chain, anything larger ends it. Independently of
/// the scan, a streak expires the day after the last post's day: if the most
/// recent post is two or more calendar days before `now`, the result is 0 no
/// matter how long the chain was.
pub fn streak_for<Tz: TimeZone>(dates: &[DateTime<Tz>], now: &DateTime<Tz>) -> u32 {
    if dates.is_empty() {
        return 0;
    }

    let mut sorted: Vec<&DateTime<Tz>> = dates.iter().collect();
    sorted.sort_by(|a, b| b.cmp(a));

    // Expiry takes priority over the chain scan.
    if calendar_day_difference(now, sorted[0]) > 1 {
        return 0;
    }

    let mut streak = 1;
    let mut cursor = sorted[0];
    for date in &sorted[1..] {
        match calendar_day_difference(cursor, date) {
            0 => continue,
            1 => {
                streak += 1;
                cursor = date;
            }
            _ => break,
        }
    }
    streak
}
