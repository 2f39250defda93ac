use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::domain::JournalEntry;

/// Journal files are named after their day, `DD-MM-YYYY`.
pub fn parse_name_date(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name.trim(), "%d-%m-%Y").ok()
}

impl JournalEntry {
    pub fn day(&self) -> Option<NaiveDate> {
        parse_name_date(&self.date)
    }

    /// `YYYY-MM-DD` when the name is a valid day.
    pub fn iso_date(&self) -> Option<String> {
        self.day().map(|d| d.format("%Y-%m-%d").to_string())
    }
}

/// Newest day first. Names that are not days keep their load order
/// after every dated entry.
pub fn sort_journal(entries: &mut [JournalEntry]) {
    entries.sort_by(|a, b| match (a.day(), b.day()) {
        (Some(ad), Some(bd)) => bd.cmp(&ad),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

pub fn select_entry<'a>(entries: &'a [JournalEntry], id: &str) -> Option<&'a JournalEntry> {
    entries.iter().rev().find(|e| e.id == id)
}
