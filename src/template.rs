//! View models for the explorer pages and their rendering with Tera.

use comrak::ComrakOptions;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use std::collections::HashSet;
use tera::{Context, Tera};

use crate::config::CollectionConfig;
use crate::content::{breadcrumb, render_markdown};
use crate::domain::{FolderNode, JournalEntry, NormalizedEntry};
use crate::error::Result;
use crate::journal;
use crate::loader::LoadReport;
use crate::tree::{filter_tree, folder_trail, select_by_id};

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("macros.html", include_str!("../templates/macros.html")),
    ("notes.html", include_str!("../templates/notes.html")),
    ("journal.html", include_str!("../templates/journal.html")),
];

/// Unreserved URL characters stay readable in links.
const ID_ENCODE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

pub const STYLESHEET: &str = include_str!("../templates/style.css");

pub fn init_tera() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.to_vec())?;
    Ok(tera)
}

fn encode(id: &str) -> String {
    utf8_percent_encode(id, ID_ENCODE).to_string()
}

/// How pages link to each other: query parameters on the live server,
/// plain files in a static export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStyle {
    Query,
    /// `root` leads from the current page back to the export root.
    Files { root: String },
}

impl LinkStyle {
    pub fn note(&self, id: &str) -> String {
        match self {
            LinkStyle::Query => format!("/notes?note={}", encode(id)),
            LinkStyle::Files { root } => format!("{root}notes/{}.html", encode(id)),
        }
    }

    pub fn journal_entry(&self, id: &str) -> String {
        match self {
            LinkStyle::Query => format!("/journal?entry={}", encode(id)),
            LinkStyle::Files { root } => format!("{root}journal/{}.html", encode(id)),
        }
    }

    fn links(&self) -> Links {
        match self {
            LinkStyle::Query => Links {
                notes: "/notes".into(),
                journal: "/journal".into(),
                style: "/style.css".into(),
            },
            LinkStyle::Files { root } => Links {
                notes: format!("{root}index.html"),
                journal: format!("{root}journal.html"),
                style: format!("{root}style.css"),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Links {
    pub notes: String,
    pub journal: String,
    pub style: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteLink {
    pub id: String,
    pub title: String,
    pub date: Option<String>,
    pub tags: Option<Vec<String>>,
    pub href: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderView {
    pub name: String,
    pub path: String,
    pub open: bool,
    pub count: usize,
    pub folders: Vec<FolderView>,
    pub notes: Vec<NoteLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedNote {
    pub id: String,
    pub title: String,
    pub date: Option<String>,
    pub tags: Option<Vec<String>>,
    pub breadcrumb: Vec<String>,
    pub href: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotesPage {
    pub heading: String,
    pub section: &'static str,
    pub links: Links,
    pub banner: Option<String>,
    pub searchable: bool,
    pub query: String,
    /// Nothing to list, either no notes at all or no search hits.
    pub empty: bool,
    pub tree: FolderView,
    pub selected: Option<SelectedNote>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalLink {
    pub id: String,
    pub label: String,
    pub iso_date: Option<String>,
    pub href: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedJournal {
    pub id: String,
    pub label: String,
    pub iso_date: Option<String>,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalPage {
    pub heading: String,
    pub section: &'static str,
    pub links: Links,
    pub banner: Option<String>,
    pub entries: Vec<JournalLink>,
    pub selected: Option<SelectedJournal>,
}

fn banner<T>(report: &LoadReport<T>, what: &str) -> Option<String> {
    if report.listing_failed {
        Some(format!("The {what} could not be listed right now."))
    } else if !report.skipped.is_empty() {
        Some(format!(
            "{} {what} could not be loaded and are missing below.",
            report.skipped.len()
        ))
    } else {
        None
    }
}

fn folder_view(
    node: &FolderNode,
    open: &HashSet<String>,
    all_open: bool,
    links: &LinkStyle,
    selected_id: Option<&str>,
) -> FolderView {
    FolderView {
        name: node.name.clone(),
        path: node.path.clone(),
        open: all_open || open.contains(&node.path),
        count: node.note_count(),
        folders: node
            .sorted_folders()
            .into_iter()
            .map(|child| folder_view(child, open, all_open, links, selected_id))
            .collect(),
        notes: node
            .notes
            .iter()
            .map(|note| NoteLink {
                id: note.id.clone(),
                title: note.title.clone(),
                date: note.date.clone(),
                tags: note.tags.clone(),
                href: links.note(&note.id),
                selected: selected_id == Some(note.id.as_str()),
            })
            .collect(),
    }
}

fn selected_note(
    note: &NormalizedEntry,
    collection: &CollectionConfig,
    links: &LinkStyle,
    options: &ComrakOptions,
) -> SelectedNote {
    SelectedNote {
        id: note.id.clone(),
        title: note.title.clone(),
        date: note.date.clone(),
        tags: note.tags.clone(),
        breadcrumb: breadcrumb(&note.path, &collection.prefix),
        href: links.note(&note.id),
        html: render_markdown(&note.content, options),
    }
}

/// Builds the explorer for `query` with `selected_id` deep-linked. An
/// unknown id leaves nothing selected.
pub fn notes_page(
    report: &LoadReport<NormalizedEntry>,
    collection: &CollectionConfig,
    query: &str,
    selected_id: Option<&str>,
    links: &LinkStyle,
    options: &ComrakOptions,
) -> NotesPage {
    let query = query.trim();
    let tree = filter_tree(&report.items, query);
    let selected = selected_id.and_then(|id| select_by_id(&report.items, id));

    let open: HashSet<String> = selected
        .map(|note| folder_trail(&note.folder).into_iter().collect())
        .unwrap_or_default();

    NotesPage {
        heading: "Notes".into(),
        section: "notes",
        links: links.links(),
        banner: banner(report, "notes"),
        searchable: *links == LinkStyle::Query,
        query: query.to_string(),
        empty: tree.is_empty(),
        tree: folder_view(&tree, &open, !query.is_empty(), links, selected.map(|n| n.id.as_str())),
        selected: selected.map(|note| selected_note(note, collection, links, options)),
    }
}

fn journal_label(entry: &JournalEntry) -> String {
    entry.day().map(|d| d.format("%B %-d, %Y").to_string()).unwrap_or_else(|| entry.date.clone())
}

pub fn journal_page(
    report: &LoadReport<JournalEntry>,
    selected_id: Option<&str>,
    links: &LinkStyle,
    options: &ComrakOptions,
) -> JournalPage {
    let selected = selected_id.and_then(|id| journal::select_entry(&report.items, id));
    JournalPage {
        heading: "Journal".into(),
        section: "journal",
        links: links.links(),
        banner: banner(report, "journal entries"),
        entries: report
            .items
            .iter()
            .map(|entry| JournalLink {
                id: entry.id.clone(),
                label: journal_label(entry),
                iso_date: entry.iso_date(),
                href: links.journal_entry(&entry.id),
                selected: selected_id == Some(entry.id.as_str()),
            })
            .collect(),
        selected: selected.map(|entry| SelectedJournal {
            id: entry.id.clone(),
            label: journal_label(entry),
            iso_date: entry.iso_date(),
            html: render_markdown(&entry.content, options),
        }),
    }
}

pub fn render_notes(tera: &Tera, page: &NotesPage) -> Result<String> {
    let context = Context::from_serialize(page)?;
    Ok(tera.render("notes.html", &context)?)
}

pub fn render_journal(tera: &Tera, page: &JournalPage) -> Result<String> {
    let context = Context::from_serialize(page)?;
    Ok(tera.render("journal.html", &context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::make_comrak_options;

    fn note(id: &str, folder: &str, title: &str, date: Option<&str>) -> NormalizedEntry {
        NormalizedEntry {
            id: id.into(),
            path: format!("notes/{folder}/{id}.md"),
            folder: folder.into(),
            title: title.into(),
            date: date.map(str::to_string),
            tags: Some(vec!["health".into()]),
            content: format!("# {title}\n\nSome *text*."),
        }
    }

    fn report() -> LoadReport<NormalizedEntry> {
        LoadReport::from_items(vec![
            note("naps", "life/sleep", "Naps", Some("2024-02-01")),
            note("food", "life", "Food", None),
            note("standup", "Work", "Standup", Some("2023-05-05")),
            note("agenda", "archive", "Agenda", None),
        ])
    }

    fn page(query: &str, selected: Option<&str>) -> NotesPage {
        notes_page(
            &report(),
            &CollectionConfig::new("notes/", ".md"),
            query,
            selected,
            &LinkStyle::Query,
            &make_comrak_options(),
        )
    }

    #[test]
    fn folders_listed_without_case() {
        let page = page("", None);
        let names: Vec<&str> = page.tree.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["archive", "life", "Work"]);
        assert!(page.tree.folders.iter().all(|f| !f.open));
    }

    #[test]
    fn deep_link_opens_folder_trail() {
        let page = page("", Some("naps"));
        let life = page.tree.folders.iter().find(|f| f.name == "life").unwrap();
        assert!(life.open);
        assert!(life.folders[0].open);
        assert!(life.folders[0].notes[0].selected);
        let selected = page.selected.unwrap();
        assert_eq!(selected.breadcrumb, vec!["life", "sleep", "naps.md"]);
        assert!(selected.html.contains("<em>text</em>"));
    }

    #[test]
    fn unknown_id_selects_nothing() {
        assert!(page("", Some("missing")).selected.is_none());
    }

    #[test]
    fn searching_opens_everything() {
        let page = page("nap", None);
        assert_eq!(page.tree.folders.len(), 1);
        assert!(page.tree.folders[0].open);
        assert_eq!(page.tree.count, 1);
    }

    #[test]
    fn links_follow_style() {
        assert_eq!(LinkStyle::Query.note("my note"), "/notes?note=my%20note");
        let files = LinkStyle::Files { root: "../".into() };
        assert_eq!(files.note("naps"), "../notes/naps.html");
        assert_eq!(files.journal_entry("05-03-2024"), "../journal/05-03-2024.html");
    }

    #[test]
    fn renders_explorer_html() {
        let tera = init_tera().unwrap();
        let html = render_notes(&tera, &page("", Some("naps"))).unwrap();
        assert!(html.contains("<h1>Naps</h1>"));
        assert!(html.contains("/notes?note=food"));
        assert!(html.contains("class=\"tag\""));
        assert!(html.contains("name=\"q\""));
    }

    #[test]
    fn renders_empty_search() {
        let tera = init_tera().unwrap();
        let page = page("zzz", None);
        assert!(page.empty);
        let html = render_notes(&tera, &page).unwrap();
        assert!(html.contains("No notes match"));
    }

    #[test]
    fn shows_partial_failure_banner() {
        let mut report = report();
        report.skipped.push("notes/broken.md".into());
        let page = notes_page(
            &report,
            &CollectionConfig::new("notes/", ".md"),
            "",
            None,
            &LinkStyle::Query,
            &make_comrak_options(),
        );
        assert!(page.banner.unwrap().starts_with("1 notes"));
    }

    #[test]
    fn renders_journal() {
        let report = LoadReport::from_items(vec![JournalEntry {
            id: "05-03-2024".into(),
            path: "journal/05-03-2024.md".into(),
            date: "05-03-2024".into(),
            content: "Slept well.".into(),
        }]);
        let page = journal_page(&report, Some("05-03-2024"), &LinkStyle::Query, &make_comrak_options());
        assert_eq!(page.entries[0].label, "March 5, 2024");
        assert_eq!(page.entries[0].iso_date.as_deref(), Some("2024-03-05"));
        let html = render_journal(&init_tera().unwrap(), &page).unwrap();
        assert!(html.contains("Slept well."));
        assert!(html.contains("<time datetime=\"2024-03-05\">"));
    }
}
