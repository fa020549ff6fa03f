use serde::{Deserialize, Serialize};

use crate::config::CategoryFieldNames;
use crate::notion::models::{Icon, NotionPage, PageRef, ResourceRecord};

/// A category row from the category database.
///
/// An empty `parent` makes it a primary category; anything else is
/// treated as secondary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub sort: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default)]
    pub parent: Vec<PageRef>,
    #[serde(default)]
    pub children: Vec<PageRef>,
    #[serde(default)]
    pub links: Vec<PageRef>,
}

impl CategoryRecord {
    pub fn from_page(page: &NotionPage, fields: &CategoryFieldNames) -> Self {
        Self {
            id: page.id.clone(),
            name: page.text(&fields.name).to_string(),
            desc: page.text(&fields.desc).to_string(),
            sort: page
                .property(&fields.sort)
                .and_then(|v| v.as_number())
                .map(|n| n as i64)
                .unwrap_or(0),
            icon: page.icon.clone(),
            parent: page.refs(&fields.parent).to_vec(),
            children: page.refs(&fields.children).to_vec(),
            links: page.refs(&fields.links).to_vec(),
        }
    }

    pub fn is_primary(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Resolved projection of a category used for browsing and filtering.
///
/// `children` and `links` are resolved to full objects. `parent` keeps
/// the parent ids only; resolved parents would be cyclic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryViewNode {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub sort: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default)]
    pub parent: Vec<PageRef>,
    #[serde(default)]
    pub children: Vec<CategoryViewNode>,
    #[serde(default)]
    pub links: Vec<ResourceRecord>,
}
