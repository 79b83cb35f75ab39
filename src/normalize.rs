//! Canonical derived fields shared by every source cleaner.
//!
//! Every function here is total: malformed input maps to an empty/absent
//! result, never to a panic or a default value. The cleaners decide what an
//! absent field means for the row.

use std::{str::FromStr, sync::LazyLock};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use itertools::Itertools;
use regex::Regex;
use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Earliest release year accepted by the cleaners.
pub const YEAR_MIN: i32 = 1880;
/// Latest release year accepted by the cleaners.
pub const YEAR_MAX: i32 = 2025;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

static BARE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(?:\.0+)?$").expect("bare year pattern"));

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:\s|\\n)*['"]?(.*?)['"]?(?:\s|\\n)*$"#).expect("list item pattern")
});

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d[\d,]*)").expect("leading number pattern"));

/// Lowercases `raw` and keeps only letters and digits.
pub fn normalize_title(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parses the date-like values the three sources carry.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(parsed.date());
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|parsed| parsed.date_naive())
}

/// Returns the calendar year of a date-like value, or `None` when unparseable.
///
/// Accepts full dates as well as a bare four digit year (optionally rendered
/// as a float, e.g. `2010.0`).
pub fn extract_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if let Some(caps) = BARE_YEAR.captures(trimmed) {
        return caps[1].parse().ok();
    }
    parse_release_date(trimmed).map(|date| date.year())
}

pub fn year_in_range(year: i32) -> bool {
    (YEAR_MIN..=YEAR_MAX).contains(&year)
}

/// `1986` becomes `"1980–1989"`. Absent years stay absent.
pub fn decade_label(year: Option<i32>) -> Option<String> {
    let year = year?;
    let start = year.div_euclid(10) * 10;
    Some(format!("{start}–{}", start + 9))
}

pub fn composite_key(normalized_title: &str, year: i32) -> String {
    format!("{normalized_title}_{year}")
}

/// Uppercases the first letter of every alphabetic run and lowercases the rest.
pub fn title_case(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut previous_is_letter = false;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                output.extend(ch.to_lowercase());
            } else {
                output.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            output.push(ch);
            previous_is_letter = false;
        }
    }
    output
}

/// Splits a comma-separated cell into trimmed, title-cased, distinct values.
pub fn split_multi_value(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(title_case)
        .unique()
        .collect()
}

/// Decodes a sequence that was flattened into a single cell.
///
/// Understands JSON arrays (the artifact encoding), Python list literals
/// (`['Action', 'Drama']`, possibly with embedded `\n` escapes) and plain
/// comma lists. Items are trimmed but not re-cased.
pub fn parse_sequence(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
        return items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
    }
    let body = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    body.split(',')
        .filter_map(|part| {
            LIST_ITEM
                .captures(part)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Cleans a scraped money cell (`"$1,234"`, `"\u{a0}$5"`) into whole units.
pub fn parse_money(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '\u{a0}') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let amount = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()?;
    if amount.is_sign_negative() {
        return None;
    }
    amount.round().to_i64()
}

/// Parses a count such as `"1,234"` or a runtime such as `"142 min"`.
pub fn parse_count(raw: &str) -> Option<i64> {
    if let Some(value) = parse_float(raw) {
        return (value.is_finite() && value >= 0.0).then(|| value.round() as i64);
    }
    let caps = LEADING_NUMBER.captures(raw)?;
    caps[1].replace(',', "").parse().ok()
}

pub fn parse_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn is_true_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}
