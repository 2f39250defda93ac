use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use crate::domain::{FolderNode, NormalizedEntry};

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Separator between search fields; never present in natural text.
const FIELD_SEPARATOR: &str = " \u{0} ";

/// Splits a folder attribute into its non-empty segments. A blank
/// folder lands in [`UNCATEGORIZED`].
pub fn folder_segments(folder: &str) -> Vec<&str> {
    let segments: Vec<&str> = folder.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        vec![UNCATEGORIZED]
    } else {
        segments
    }
}

/// Folder paths that must be open for `folder` to be visible, root first.
pub fn folder_trail(folder: &str) -> Vec<String> {
    let mut trail = vec![String::new()];
    let mut current = String::new();
    for segment in folder_segments(folder) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        trail.push(current.clone());
    }
    trail
}

fn find_or_create_node<'a>(mut segments: VecDeque<&str>, node: &'a mut FolderNode) -> &'a mut FolderNode {
    let Some(segment) = segments.pop_front() else {
        return node;
    };
    let path = if node.path.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{}", node.path, segment)
    };
    let child = node
        .folders
        .entry(segment.to_string())
        .or_insert_with(|| FolderNode {
            name: segment.to_string(),
            path,
            ..FolderNode::default()
        });
    find_or_create_node(segments, child)
}

/// Appends `entry` to the node of its last folder segment, creating the
/// intermediate folders as needed.
pub fn insert_entry(root: &mut FolderNode, entry: NormalizedEntry) {
    let segments: VecDeque<&str> = folder_segments(&entry.folder).into_iter().collect();
    let node = find_or_create_node(segments, root);
    node.notes.push(entry);
}

fn non_empty(date: &Option<String>) -> Option<&str> {
    date.as_deref().filter(|d| !d.is_empty())
}

/// Newest first, then title without regard to case.
///
/// Dates are compared as plain strings, which orders correctly only
/// because normalization renders every parseable date as `YYYY-MM-DD`.
/// An entry with a date sorts before one without.
pub fn compare_entries(a: &NormalizedEntry, b: &NormalizedEntry) -> Ordering {
    let by_date = match (non_empty(&a.date), non_empty(&b.date)) {
        (Some(ad), Some(bd)) => bd.cmp(ad),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
}

pub fn sort_tree(node: &mut FolderNode) {
    node.notes.sort_by(compare_entries);
    for child in node.folders.values_mut() {
        sort_tree(child);
    }
}

pub fn build_tree(entries: &[NormalizedEntry]) -> FolderNode {
    let mut root = FolderNode::root();
    for entry in entries {
        insert_entry(&mut root, entry.clone());
    }
    sort_tree(&mut root);
    root
}

/// `lower_query` must already be lowercased.
pub fn matches_query(entry: &NormalizedEntry, lower_query: &str) -> bool {
    let mut fields = vec![entry.title.as_str(), entry.path.as_str(), entry.folder.as_str()];
    if let Some(date) = &entry.date {
        fields.push(date.as_str());
    }
    if let Some(tags) = &entry.tags {
        fields.extend(tags.iter().map(String::as_str));
    }
    let haystack = fields
        .into_iter()
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
        .to_lowercase();
    haystack.contains(lower_query)
}

/// Builds a fresh tree holding only the entries that match `query`
/// (case-insensitive substring). A blank query gives the full tree.
pub fn filter_tree(entries: &[NormalizedEntry], query: &str) -> FolderNode {
    let lower_query = query.trim().to_lowercase();
    if lower_query.is_empty() {
        return build_tree(entries);
    }
    let mut root = FolderNode::root();
    for entry in entries.iter().filter(|e| matches_query(e, &lower_query)) {
        insert_entry(&mut root, entry.clone());
    }
    sort_tree(&mut root);
    root
}

/// Lookup by id. When ids collide the entry loaded last wins.
pub fn index_by_id(entries: &[NormalizedEntry]) -> HashMap<&str, &NormalizedEntry> {
    entries.iter().map(|e| (e.id.as_str(), e)).collect()
}

pub fn select_by_id<'a>(entries: &'a [NormalizedEntry], id: &str) -> Option<&'a NormalizedEntry> {
    entries.iter().rev().find(|e| e.id == id)
}
