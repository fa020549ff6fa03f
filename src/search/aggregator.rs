use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::BlogFieldNames;
use crate::notion::client::{NotionClient, NotionError};
use crate::notion::fields::ResourceFields;
use crate::notion::models::{Icon, NotionPage, QueryRequest};
use crate::notion::transform::transform_page;

/// Maximum hits requested from each collection.
pub const SEARCH_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Resource,
    Blog,
}

/// A search hit returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub kind: SearchKind,
    pub id: String,
    pub name: String,
    pub desc: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Where a hit's `url` comes from.
#[derive(Debug, Clone)]
pub enum LinkSource {
    /// A url-typed property of the row.
    Property(Option<String>),
    /// An internal path: `{prefix}/{slug}`, falling back to the page id.
    Path {
        prefix: String,
        slug_field: String,
    },
}

/// One searchable Notion database and how to read its rows.
#[derive(Debug, Clone)]
pub struct Collection {
    pub kind: SearchKind,
    pub database_id: String,
    pub title_field: String,
    pub desc_field: Option<String>,
    pub tags_field: Option<String>,
    pub link: LinkSource,
    /// Checkbox that must be ticked for a row to be searchable.
    pub published_field: Option<String>,
}

impl Collection {
    pub fn resources(database_id: &str, fields: &ResourceFields) -> Self {
        Self {
            kind: SearchKind::Resource,
            database_id: database_id.to_string(),
            title_field: fields.name.clone(),
            desc_field: fields.desc.clone(),
            tags_field: fields.tags.clone(),
            link: LinkSource::Property(fields.url.clone()),
            published_field: None,
        }
    }

    pub fn blog(database_id: &str, fields: &BlogFieldNames) -> Self {
        Self {
            kind: SearchKind::Blog,
            database_id: database_id.to_string(),
            title_field: fields.title.clone(),
            desc_field: Some(fields.summary.clone()),
            tags_field: Some(fields.tags.clone()),
            link: LinkSource::Path {
                prefix: "/blog".to_string(),
                slug_field: fields.slug.clone(),
            },
            published_field: Some(fields.published.clone()),
        }
    }

    /// Notion filter: title or description contains `query`.
    pub fn filter(&self, query: &str) -> Value {
        let mut matches = vec![json!({
            "property": self.title_field,
            "title": { "contains": query }
        })];
        if let Some(desc) = &self.desc_field {
            matches.push(json!({
                "property": desc,
                "rich_text": { "contains": query }
            }));
        }
        let text = json!({ "or": matches });

        match &self.published_field {
            Some(published) => json!({
                "and": [
                    text,
                    { "property": published, "checkbox": { "equals": true } }
                ]
            }),
            None => text,
        }
    }

    pub fn to_result(&self, page: &NotionPage) -> SearchResult {
        let url = match &self.link {
            LinkSource::Property(field) => field
                .as_deref()
                .map(|f| page.text(f).to_string())
                .unwrap_or_default(),
            LinkSource::Path { prefix, slug_field } => {
                let slug = page.text(slug_field);
                let slug = if slug.is_empty() { page.id.as_str() } else { slug };
                format!("{prefix}/{slug}")
            }
        };

        SearchResult {
            kind: self.kind,
            id: page.id.clone(),
            name: page.text(&self.title_field).to_string(),
            desc: self
                .desc_field
                .as_deref()
                .map(|f| page.text(f).to_string())
                .unwrap_or_default(),
            url,
            icon: page.icon.clone(),
            tags: self
                .tags_field
                .as_deref()
                .map(|f| page.tags(f))
                .unwrap_or_default(),
        }
    }
}

/// Searches the resource and blog databases together.
pub struct SearchAggregator<'a> {
    notion: &'a dyn NotionClient,
    resources: Collection,
    blog: Collection,
}

impl<'a> SearchAggregator<'a> {
    pub fn new(notion: &'a dyn NotionClient, resources: Collection, blog: Collection) -> Self {
        Self {
            notion,
            resources,
            blog,
        }
    }

    /// Query both collections concurrently.
    ///
    /// A blank query returns nothing without touching Notion. A collection
    /// whose query fails contributes no hits; the other still does.
    /// Resource hits come first, each group in Notion's order.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let (resources, blog) = tokio::join!(
            self.query_collection(&self.resources, query),
            self.query_collection(&self.blog, query),
        );

        [(&self.resources, resources), (&self.blog, blog)]
            .into_iter()
            .flat_map(|(collection, outcome)| match outcome {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!(
                        kind = ?collection.kind,
                        database_id = %collection.database_id,
                        "Search source failed, continuing without it: {e}"
                    );
                    Vec::new()
                }
            })
            .collect()
    }

    async fn query_collection(
        &self,
        collection: &Collection,
        query: &str,
    ) -> Result<Vec<SearchResult>, NotionError> {
        let request = QueryRequest {
            filter: Some(collection.filter(query)),
            page_size: Some(SEARCH_PAGE_SIZE),
            ..Default::default()
        };
        let response = self
            .notion
            .query_database(&collection.database_id, &request)
            .await?;

        Ok(response
            .results
            .iter()
            .map(transform_page)
            .map(|page| collection.to_result(&page))
            .collect())
    }
}
