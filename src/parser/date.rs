use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

// Parenthesized weekday/date stamp, e.g. "(Tuesday, October 7, 2025)".
// "day" covers every weekday name; the 4-digit run anchors the year.
static DATE_STAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+day[^)]+\d{4})\)").unwrap());

/// Locate the report's as-of date anywhere in the document text.
///
/// Only the first parenthesized stamp is consulted; a document without one
/// (or with an unparseable one) yields `None`, which the assembler treats as
/// fatal.
pub fn extract_report_date(text: &str) -> Option<NaiveDate> {
    let caps = DATE_STAMP_RE.captures(text)?;
    parse_stamp(caps[1].trim())
}

fn parse_stamp(stamp: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(stamp, "%A, %B %d, %Y") {
        return Some(date);
    }
    // Weekday prefix inconsistent with the date (typeset error): drop it and
    // trust the month-day-year tail.
    let tail = stamp
        .split_once(',')
        .map(|(_, rest)| rest.trim())
        .unwrap_or(stamp);
    NaiveDate::parse_from_str(tail, "%B %d, %Y").ok()
}
