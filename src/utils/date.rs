use chrono::{Datelike, NaiveDate};

/// Encode a date as the YYMMDD integer used by the registration table,
/// e.g. 2026-08-23 becomes 260823.
pub fn encode_yymmdd(date: NaiveDate) -> i32 {
    let year = date.year().rem_euclid(100);
    year * 10_000 + date.month() as i32 * 100 + date.day() as i32
}
