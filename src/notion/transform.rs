use std::collections::BTreeMap;

use serde_json::Value;

use crate::notion::models::{
    FileKind, FileRef, FlatValue, Icon, IconKind, NotionPage, PageRef, RawPage, SelectOption,
};

/// Normalize a raw Notion row into a [`NotionPage`].
///
/// Total: every property maps to some [`FlatValue`]. Unknown or malformed
/// wrappers become an empty string so a schema change upstream degrades
/// the affected field instead of the whole page.
pub fn transform_page(raw: &RawPage) -> NotionPage {
    let properties = raw
        .properties
        .iter()
        .map(|(name, wrapper)| (name.clone(), transform_property(wrapper)))
        .collect::<BTreeMap<_, _>>();

    NotionPage {
        id: raw.id.clone(),
        created_time: raw.created_time.clone(),
        last_edited_time: raw.last_edited_time.clone(),
        icon: raw.icon.as_ref().and_then(transform_icon),
        cover: raw.cover.as_ref().and_then(file_url),
        properties,
    }
}

/// Collapse one `{type, <type>: ...}` property wrapper.
pub fn transform_property(wrapper: &Value) -> FlatValue {
    let kind = wrapper.get("type").and_then(Value::as_str).unwrap_or("");
    let inner = wrapper.get(kind).unwrap_or(&Value::Null);

    match kind {
        "title" | "rich_text" => FlatValue::Text(plain_text(inner)),
        "multi_select" => FlatValue::MultiSelect(
            inner
                .as_array()
                .map(|items| items.iter().filter_map(select_option).collect())
                .unwrap_or_default(),
        ),
        "select" | "status" => FlatValue::Select(select_option(inner)),
        "url" | "email" | "phone_number" => {
            FlatValue::Text(inner.as_str().unwrap_or_default().to_string())
        }
        "number" => FlatValue::Number(inner.as_f64().unwrap_or(0.0)),
        "checkbox" => FlatValue::Bool(inner.as_bool().unwrap_or(false)),
        "date" => FlatValue::Text(date_start(inner)),
        "relation" | "people" => FlatValue::Refs(
            inner
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.get("id").and_then(Value::as_str))
                        .map(PageRef::new)
                        .collect()
                })
                .unwrap_or_default(),
        ),
        "files" => FlatValue::Files(
            inner
                .as_array()
                .map(|items| items.iter().filter_map(file_ref).collect())
                .unwrap_or_default(),
        ),
        "rollup" => transform_rollup(inner),
        "formula" => transform_formula(inner),
        "created_time" | "last_edited_time" => {
            FlatValue::Text(inner.as_str().unwrap_or_default().to_string())
        }
        _ => FlatValue::empty(),
    }
}

fn transform_rollup(inner: &Value) -> FlatValue {
    match inner.get("type").and_then(Value::as_str) {
        Some("array") => FlatValue::Array(
            inner
                .get("array")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        ),
        Some("number") => FlatValue::Number(
            inner.get("number").and_then(Value::as_f64).unwrap_or(0.0),
        ),
        Some("date") => FlatValue::Text(date_start(inner.get("date").unwrap_or(&Value::Null))),
        _ => FlatValue::empty(),
    }
}

fn transform_formula(inner: &Value) -> FlatValue {
    match inner.get("type").and_then(Value::as_str) {
        Some("string") => FlatValue::Text(
            inner
                .get("string")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        Some("number") => FlatValue::Number(
            inner.get("number").and_then(Value::as_f64).unwrap_or(0.0),
        ),
        Some("boolean") => FlatValue::Bool(
            inner.get("boolean").and_then(Value::as_bool).unwrap_or(false),
        ),
        Some("date") => FlatValue::Text(date_start(inner.get("date").unwrap_or(&Value::Null))),
        _ => FlatValue::empty(),
    }
}

/// Concatenate the `plain_text` of every rich text run.
pub fn plain_text(runs: &Value) -> String {
    runs.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|run| run.get("plain_text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn select_option(value: &Value) -> Option<SelectOption> {
    let name = value.get("name")?.as_str()?;
    Some(SelectOption {
        id: value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        name: name.to_string(),
    })
}

fn date_start(value: &Value) -> String {
    value
        .get("start")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn file_ref(value: &Value) -> Option<FileRef> {
    let kind = match value.get("type").and_then(Value::as_str)? {
        "external" => FileKind::External,
        "file" => FileKind::File,
        _ => return None,
    };
    Some(FileRef {
        kind,
        url: file_url(value)?,
    })
}

/// URL of an `external` / `file` object (covers, files, image blocks).
pub fn file_url(value: &Value) -> Option<String> {
    let kind = value.get("type").and_then(Value::as_str)?;
    value
        .get(kind)
        .and_then(|inner| inner.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn transform_icon(value: &Value) -> Option<Icon> {
    match value.get("type").and_then(Value::as_str)? {
        "emoji" => Some(Icon {
            kind: IconKind::Emoji,
            value: value.get("emoji")?.as_str()?.to_string(),
        }),
        "external" => Some(Icon {
            kind: IconKind::External,
            value: file_url(value)?,
        }),
        "file" => Some(Icon {
            kind: IconKind::File,
            value: file_url(value)?,
        }),
        _ => None,
    }
}
