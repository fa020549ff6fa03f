use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// -- Wire types (Notion REST API) --

/// Body of `POST /v1/databases/{id}/query`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// One page of query results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<RawPage>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A database row as returned by Notion, properties still wrapped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPage {
    pub id: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub last_edited_time: String,
    #[serde(default)]
    pub icon: Option<Value>,
    #[serde(default)]
    pub cover: Option<Value>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Database metadata from `GET /v1/databases/{id}`; only property types are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaProperty>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaProperty {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Body of `POST /v1/pages`.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePageRequest {
    pub parent: DatabaseParent,
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseParent {
    pub database_id: String,
}

/// One page of `GET /v1/blocks/{id}/children`. Blocks stay untyped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockList {
    pub results: Vec<Value>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

// -- Normalized types --

/// `{id}` reference to another page (relation, people).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    pub id: String,
}

impl PageRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    External,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconKind {
    Emoji,
    External,
    File,
}

/// Page icon: an emoji character or an image URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    #[serde(rename = "type")]
    pub kind: IconKind,
    pub value: String,
}

/// A property value after the page transform.
///
/// Serialized untagged so a transformed page reads as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlatValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Select(Option<SelectOption>),
    MultiSelect(Vec<SelectOption>),
    Refs(Vec<PageRef>),
    Files(Vec<FileRef>),
    Array(Vec<Value>),
}

impl FlatValue {
    pub fn empty() -> Self {
        FlatValue::Text(String::new())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FlatValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FlatValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_refs(&self) -> &[PageRef] {
        match self {
            FlatValue::Refs(refs) => refs,
            _ => &[],
        }
    }

    /// Option names of a `multi_select`, or the single name of a `select`.
    pub fn tag_names(&self) -> Vec<String> {
        match self {
            FlatValue::MultiSelect(options) => options.iter().map(|o| o.name.clone()).collect(),
            FlatValue::Select(Some(option)) => vec![option.name.clone()],
            _ => vec![],
        }
    }
}

/// A Notion row normalized into a uniform record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotionPage {
    pub id: String,
    pub created_time: String,
    pub last_edited_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, FlatValue>,
}

impl NotionPage {
    pub fn property(&self, name: &str) -> Option<&FlatValue> {
        self.properties.get(name)
    }

    /// Text of a property; empty when absent or not textual.
    pub fn text(&self, name: &str) -> &str {
        self.property(name).and_then(FlatValue::as_text).unwrap_or("")
    }

    pub fn refs(&self, name: &str) -> &[PageRef] {
        self.property(name).map(FlatValue::as_refs).unwrap_or(&[])
    }

    pub fn tags(&self, name: &str) -> Vec<String> {
        self.property(name).map(FlatValue::tag_names).unwrap_or_default()
    }
}

/// The database layer only ever hands out transformed pages as resources.
pub type ResourceRecord = NotionPage;
