//! Coercion of loosely-typed front-matter fields into the shape the
//! explorer renders. One function per field; nothing here fails.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::domain::{Entry, FieldValue, NormalizedEntry};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

fn iso_date(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Parses the date notations commonly found in front matter. Naive
/// values are taken as UTC.
pub fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    // `YYYY-MM` and bare `YYYY`
    let digits_and_dash = text.chars().all(|c| c.is_ascii_digit() || c == '-');
    if digits_and_dash && text.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    if text.len() == 4 && text.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = text.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc());
    }
    None
}

fn from_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}

/// Renders a date-like value as `YYYY-MM-DD`. Values that do not read
/// as a date are passed through as text; absent values give `None`.
pub fn normalize_date(value: &FieldValue) -> Option<String> {
    match value {
        absent if absent.is_absent() => None,
        FieldValue::Timestamp(ts) => Some(iso_date(ts)),
        FieldValue::Integer(millis) => Some(
            DateTime::from_timestamp_millis(*millis)
                .map(|ts| iso_date(&ts))
                .unwrap_or_else(|| value.to_string()),
        ),
        FieldValue::Float(millis) => Some(
            from_epoch_millis(*millis)
                .map(|ts| iso_date(&ts))
                .unwrap_or_else(|| value.to_string()),
        ),
        FieldValue::Text(text) => Some(
            parse_date_text(text)
                .map(|ts| iso_date(&ts))
                .unwrap_or_else(|| text.clone()),
        ),
        other => Some(other.to_string()),
    }
}

/// Sequences are stringified element-wise, a single string is split on
/// commas. Anything else has no tags.
pub fn normalize_tags(value: &FieldValue) -> Option<Vec<String>> {
    match value {
        FieldValue::Sequence(items) => Some(items.iter().map(ToString::to_string).collect()),
        FieldValue::Text(text) => Some(
            text.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

pub fn normalize_title(value: &FieldValue, id: &str) -> String {
    if value.is_truthy() {
        let title = value.to_string();
        if !title.is_empty() {
            return title;
        }
    }
    id.to_string()
}

pub fn normalize_entry(entry: Entry) -> NormalizedEntry {
    NormalizedEntry {
        title: normalize_title(&entry.title, &entry.id),
        date: normalize_date(&entry.date),
        tags: normalize_tags(&entry.tags),
        id: entry.id,
        path: entry.path,
        folder: entry.folder,
        content: entry.content,
    }
}

pub fn normalize_entries(entries: Vec<Entry>) -> Vec<NormalizedEntry> {
    entries.into_iter().map(normalize_entry).collect()
}
