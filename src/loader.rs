use serde::Serialize;
use tracing::{info, instrument};

use crate::config::{CollectionConfig, Config};
use crate::domain::{Entry, JournalEntry, NormalizedEntry};
use crate::frontmatter;
use crate::journal::sort_journal;
use crate::normalize::normalize_entries;
use crate::remote::{FetchedFile, RemoteSource, filter_items};

/// What one page load produced. `skipped` lists files whose download
/// failed; `listing_failed` is set when not even the tree was available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport<T> {
    pub items: Vec<T>,
    pub skipped: Vec<String>,
    pub listing_failed: bool,
}

impl<T> Default for LoadReport<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skipped: Vec::new(),
            listing_failed: false,
        }
    }
}

impl<T> LoadReport<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn is_partial(&self) -> bool {
        self.listing_failed || !self.skipped.is_empty()
    }
}

/// Base name of `path` without the collection suffix; falls back to the
/// whole file name when stripping leaves nothing.
pub fn entry_id(path: &str, suffix: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.strip_suffix(suffix) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

/// Directory of `path` relative to the collection prefix; "" for files
/// directly under the prefix.
pub fn entry_folder(path: &str, prefix: &str) -> String {
    let relative = path.strip_prefix(prefix).unwrap_or(path);
    match relative.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}

pub fn entry_from_file(collection: &CollectionConfig, path: &str, raw: &str) -> Entry {
    let parsed = frontmatter::parse(raw);
    Entry {
        id: entry_id(path, &collection.suffix),
        path: path.to_string(),
        folder: entry_folder(path, &collection.prefix),
        title: parsed.get("title"),
        date: parsed.get("date"),
        tags: parsed.get("tags"),
        content: parsed.body,
    }
}

pub fn journal_entry_from_file(collection: &CollectionConfig, path: &str, raw: &str) -> JournalEntry {
    let id = entry_id(path, &collection.suffix);
    JournalEntry {
        date: id.clone(),
        id,
        path: path.to_string(),
        content: raw.to_string(),
    }
}

async fn fetch_collection(
    remote: &RemoteSource,
    collection: &CollectionConfig,
) -> (Vec<FetchedFile>, Vec<String>, bool) {
    let Some(listing) = remote.fetch_tree().await else {
        return (Vec::new(), Vec::new(), true);
    };
    let paths: Vec<String> = filter_items(&listing, collection)
        .into_iter()
        .map(|item| item.path.clone())
        .collect();
    let batch = remote.fetch_contents(&paths).await;
    (batch.files, batch.failed, false)
}

#[instrument(skip(remote, collection), fields(prefix = %collection.prefix))]
pub async fn load_notes(remote: &RemoteSource, collection: &CollectionConfig) -> LoadReport<NormalizedEntry> {
    let (files, skipped, listing_failed) = fetch_collection(remote, collection).await;
    let entries = files
        .iter()
        .map(|file| entry_from_file(collection, &file.path, &file.body))
        .collect();
    let items = normalize_entries(entries);
    info!("loaded {} notes ({} skipped)", items.len(), skipped.len());
    LoadReport {
        items,
        skipped,
        listing_failed,
    }
}

#[instrument(skip(remote, collection), fields(prefix = %collection.prefix))]
pub async fn load_journal(remote: &RemoteSource, collection: &CollectionConfig) -> LoadReport<JournalEntry> {
    let (files, skipped, listing_failed) = fetch_collection(remote, collection).await;
    let mut items: Vec<JournalEntry> = files
        .iter()
        .map(|file| journal_entry_from_file(collection, &file.path, &file.body))
        .collect();
    sort_journal(&mut items);
    info!("loaded {} journal entries ({} skipped)", items.len(), skipped.len());
    LoadReport {
        items,
        skipped,
        listing_failed,
    }
}

/// Both collections, as handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub notes: LoadReport<NormalizedEntry>,
    pub journal: LoadReport<JournalEntry>,
}

pub async fn load_snapshot(remote: &RemoteSource, config: &Config) -> Snapshot {
    let (notes, journal) = tokio::join!(
        load_notes(remote, &config.notes),
        load_journal(remote, &config.journal)
    );
    Snapshot { notes, journal }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldValue;

    #[test]
    fn id_is_base_name_without_suffix() {
        assert_eq!(entry_id("notes/life/sleep.md", ".md"), "sleep");
        assert_eq!(entry_id("notes/a.b.md", ".md"), "a.b");
        assert_eq!(entry_id("notes/.md", ".md"), ".md");
    }

    #[test]
    fn folder_is_relative_directory() {
        assert_eq!(entry_folder("notes/life/sleep/naps.md", "notes/"), "life/sleep");
        assert_eq!(entry_folder("notes/top.md", "notes/"), "");
    }

    #[test]
    fn entry_carries_front_matter_fields() {
        let collection = CollectionConfig::new("notes/", ".md");
        let raw = "---\ntitle: Sleep\ndate: 2024-03-05\ntags: rest, health\n---\nBody\n";
        let entry = entry_from_file(&collection, "notes/life/sleep.md", raw);
        assert_eq!(entry.id, "sleep");
        assert_eq!(entry.folder, "life");
        assert_eq!(entry.title, FieldValue::Text("Sleep".into()));
        assert_eq!(entry.tags, FieldValue::Text("rest, health".into()));
        assert!(entry.content.contains("Body"));
    }

    #[test]
    fn journal_entries_keep_raw_text() {
        let collection = CollectionConfig::new("journal/", ".md");
        let entry = journal_entry_from_file(&collection, "journal/05-03-2024.md", "---\nx: 1\n---\nday");
        assert_eq!(entry.id, "05-03-2024");
        assert_eq!(entry.date, "05-03-2024");
        assert!(entry.content.starts_with("---"));
    }

    #[test]
    fn partial_reports() {
        let mut report = LoadReport::from_items(vec![1, 2]);
        assert!(!report.is_partial());
        report.skipped.push("notes/c.md".into());
        assert!(report.is_partial());
    }
}
