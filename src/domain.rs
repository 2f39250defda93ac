use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A front-matter value of unknown shape, as found in the source file.
///
/// Everything past the parser works on this type; coercion into the
/// render-safe shape happens only in [`crate::normalize`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Missing,
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Sequence(Vec<FieldValue>),
    Mapping(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Missing | FieldValue::Null)
    }

    /// Empty text, zero, `false` and absent values are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Missing | FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Integer(i) => *i != 0,
            FieldValue::Float(f) => *f != 0.0 && !f.is_nan(),
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Timestamp(_) | FieldValue::Sequence(_) | FieldValue::Mapping(_) => true,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Missing => Ok(()),
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(x) => write!(f, "{x}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Timestamp(ts) => {
                write!(f, "{}", ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            FieldValue::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            FieldValue::Mapping(map) => {
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                Ok(())
            }
        }
    }
}

/// One markdown file as loaded from the remote repository.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entry {
    pub id: String,
    pub path: String,
    pub folder: String,
    pub title: FieldValue,
    pub date: FieldValue,
    pub tags: FieldValue,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEntry {
    pub id: String,
    pub path: String,
    pub folder: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FolderNode {
    pub name: String,
    pub path: String,
    pub folders: BTreeMap<String, FolderNode>,
    pub notes: Vec<NormalizedEntry>,
}

impl FolderNode {
    pub fn root() -> Self {
        FolderNode::default()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.notes.is_empty()
    }

    /// Child folders in display order: case-insensitive by name.
    pub fn sorted_folders(&self) -> Vec<&FolderNode> {
        let mut children: Vec<&FolderNode> = self.folders.values().collect();
        children.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        children
    }

    pub fn note_count(&self) -> usize {
        self.notes.len() + self.folders.values().map(FolderNode::note_count).sum::<usize>()
    }

    /// Every folder path below this node, depth first.
    pub fn folder_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for child in self.folders.values() {
            paths.push(child.path.clone());
            paths.extend(child.folder_paths());
        }
        paths
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub path: String,
    /// The file base name, expected as `DD-MM-YYYY`.
    pub date: String,
    pub content: String,
}
