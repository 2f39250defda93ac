use gray_matter::engine::Engine;
use gray_matter::{Matter, Pod};
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::FieldValue;
use crate::normalize::parse_date_text;

/// Leaves the metadata block undecoded so that `serde_yaml` can report
/// malformed input instead of the splitter.
struct Deferred;

impl Engine for Deferred {
    fn parse(_content: &str) -> Pod {
        Pod::Null
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrontMatter {
    pub fields: BTreeMap<String, FieldValue>,
    pub body: String,
}

impl FrontMatter {
    pub fn get(&self, key: &str) -> FieldValue {
        self.fields.get(key).cloned().unwrap_or_default()
    }
}

/// A block opens with a `---` line and needs a later `---` line to close
/// it; otherwise the leading rule belongs to the body.
fn has_closed_block(raw: &str) -> bool {
    let mut lines = raw.lines();
    matches!(lines.next(), Some(first) if first.trim_end() == "---")
        && lines.any(|line| line.trim_end() == "---")
}

/// Splits `raw` into its metadata block and body. Never fails: a missing
/// or malformed block gives an empty mapping.
pub fn parse(raw: &str) -> FrontMatter {
    if !has_closed_block(raw) {
        return FrontMatter {
            fields: BTreeMap::new(),
            body: raw.to_string(),
        };
    }

    let matter = Matter::<Deferred>::new();
    let result = matter.parse(raw);

    if result.matter.trim().is_empty() {
        return FrontMatter {
            fields: BTreeMap::new(),
            body: result.content,
        };
    }

    let fields = match serde_yaml::from_str::<Value>(&result.matter) {
        Ok(Value::Mapping(map)) => map
            .into_iter()
            .map(|(key, value)| (key_to_string(key), to_field(value)))
            .collect(),
        Ok(other) => {
            debug!("front matter is not a mapping: {:?}", other);
            BTreeMap::new()
        }
        Err(e) => {
            debug!("ignoring malformed front matter: {e}");
            BTreeMap::new()
        }
    };

    FrontMatter {
        fields,
        body: result.content,
    }
}

fn key_to_string(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => to_field(other).to_string(),
    }
}

pub(crate) fn to_field(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => FieldValue::Text(s),
        Value::Sequence(items) => FieldValue::Sequence(items.into_iter().map(to_field).collect()),
        Value::Mapping(map) => FieldValue::Mapping(
            map.into_iter()
                .map(|(k, v)| (key_to_string(k), to_field(v)))
                .collect(),
        ),
        Value::Tagged(tagged) => {
            let is_timestamp = tagged.tag.to_string().ends_with("timestamp");
            let inner = to_field(tagged.value);
            if let (true, FieldValue::Text(text)) = (is_timestamp, &inner) {
                if let Some(ts) = parse_date_text(text) {
                    return FieldValue::Timestamp(ts);
                }
            }
            inner
        }
    }
}
