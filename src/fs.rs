use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;
use crate::content::make_comrak_options;
use crate::error::Result;
use crate::loader::Snapshot;
use crate::template::{LinkStyle, STYLESHEET, init_tera, journal_page, notes_page, render_journal, render_notes};
use crate::tree::{build_tree, index_by_id};

pub fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    // Remove old output and recreate
    if output_dir.exists() {
        info!("cleaning output directory: {}", output_dir.display());
        fs::remove_dir_all(output_dir)?;
    }
    fs::create_dir_all(output_dir)?;
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    debug!("wrote {}", path.display());
    Ok(())
}

/// Writes the explorer for `snapshot` as static pages: `index.html` and
/// `notes/<id>.html`, `journal.html` and `journal/<id>.html`, plus the
/// stylesheet and JSON dumps of the notes and their tree.
pub fn export_snapshot(snapshot: &Snapshot, config: &Config, output_dir: &Path) -> Result<()> {
    let tera = init_tera()?;
    let options = make_comrak_options();
    let top = LinkStyle::Files { root: String::new() };
    let nested = LinkStyle::Files { root: "../".into() };

    prepare_output_dir(output_dir)?;

    let index = notes_page(&snapshot.notes, &config.notes, "", None, &top, &options);
    write_file(&output_dir.join("index.html"), &render_notes(&tera, &index)?)?;

    let by_id = index_by_id(&snapshot.notes.items);
    for id in by_id.keys() {
        let page = notes_page(&snapshot.notes, &config.notes, "", Some(*id), &nested, &options);
        let path = output_dir.join("notes").join(format!("{id}.html"));
        write_file(&path, &render_notes(&tera, &page)?)?;
    }

    let journal = journal_page(&snapshot.journal, None, &top, &options);
    write_file(&output_dir.join("journal.html"), &render_journal(&tera, &journal)?)?;
    for entry in &snapshot.journal.items {
        let page = journal_page(&snapshot.journal, Some(&entry.id), &nested, &options);
        let path = output_dir.join("journal").join(format!("{}.html", entry.id));
        write_file(&path, &render_journal(&tera, &page)?)?;
    }

    write_file(&output_dir.join("style.css"), STYLESHEET)?;
    write_file(
        &output_dir.join("notes.json"),
        &serde_json::to_string_pretty(&snapshot.notes.items)?,
    )?;
    write_file(
        &output_dir.join("tree.json"),
        &serde_json::to_string_pretty(&build_tree(&snapshot.notes.items))?,
    )?;

    info!(
        "exported {} notes and {} journal entries to {}",
        by_id.len(),
        snapshot.journal.items.len(),
        output_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JournalEntry, NormalizedEntry};
    use crate::loader::LoadReport;

    fn note(id: &str, folder: &str, title: &str) -> NormalizedEntry {
        NormalizedEntry {
            id: id.into(),
            path: format!("notes/{folder}/{id}.md"),
            folder: folder.into(),
            title: title.into(),
            date: Some("2024-03-05".into()),
            tags: None,
            content: format!("Body of {title}"),
        }
    }

    #[test]
    fn exports_every_page() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("site");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stale.html"), "old").unwrap();

        let snapshot = Snapshot {
            notes: LoadReport::from_items(vec![
                note("naps", "life/sleep", "Naps"),
                note("dup", "one", "First"),
                note("dup", "two", "Second"),
            ]),
            journal: LoadReport::from_items(vec![JournalEntry {
                id: "05-03-2024".into(),
                path: "journal/05-03-2024.md".into(),
                date: "05-03-2024".into(),
                content: "Slept well.".into(),
            }]),
        };
        export_snapshot(&snapshot, &Config::default(), &out).unwrap();

        assert!(!out.join("stale.html").exists());
        assert!(out.join("style.css").exists());
        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains("notes/naps.html"));

        let naps = fs::read_to_string(out.join("notes").join("naps.html")).unwrap();
        assert!(naps.contains("Body of Naps"));
        assert!(naps.contains("../style.css"));

        let dup = fs::read_to_string(out.join("notes").join("dup.html")).unwrap();
        assert!(dup.contains("Body of Second"));

        let day = fs::read_to_string(out.join("journal").join("05-03-2024.html")).unwrap();
        assert!(day.contains("Slept well."));

        let dumped: Vec<NormalizedEntry> =
            serde_json::from_str(&fs::read_to_string(out.join("notes.json")).unwrap()).unwrap();
        assert_eq!(dumped.len(), 3);
    }
}
