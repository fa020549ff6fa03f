use crate::config::ResourceFieldOverrides;
use crate::notion::models::DatabaseSchema;

/// Property names used to read and write the resource database.
///
/// Resolved once from the database schema; explicit overrides win over
/// anything inferred.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceFields {
    pub name: String,
    pub desc: Option<String>,
    pub url: Option<String>,
    pub tags: Option<String>,
    pub category: Option<String>,
}

const DESC_CANDIDATES: &[&str] = &["desc", "description", "summary"];

impl ResourceFields {
    pub fn resolve(schema: &DatabaseSchema, overrides: &ResourceFieldOverrides) -> Self {
        let first_of = |kind: &str| {
            schema
                .properties
                .iter()
                .find(|(_, prop)| prop.kind == kind)
                .map(|(name, _)| name.clone())
        };

        let desc = overrides.desc.clone().or_else(|| {
            let rich_text = || {
                schema
                    .properties
                    .iter()
                    .filter(|(_, prop)| prop.kind == "rich_text")
            };
            rich_text()
                .find(|(name, _)| DESC_CANDIDATES.contains(&name.to_lowercase().as_str()))
                .or_else(|| rich_text().next())
                .map(|(name, _)| name.clone())
        });

        Self {
            name: overrides
                .name
                .clone()
                .or_else(|| first_of("title"))
                .unwrap_or_else(|| "Name".to_string()),
            desc,
            url: overrides.url.clone().or_else(|| first_of("url")),
            tags: overrides.tags.clone().or_else(|| first_of("multi_select")),
            category: overrides.category.clone().or_else(|| first_of("relation")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notion::models::SchemaProperty;
    use std::collections::BTreeMap;

    fn schema(props: &[(&str, &str)]) -> DatabaseSchema {
        DatabaseSchema {
            id: "db".to_string(),
            properties: props
                .iter()
                .map(|(name, kind)| {
                    (
                        name.to_string(),
                        SchemaProperty {
                            kind: kind.to_string(),
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_resolve_from_types() {
        let fields = ResourceFields::resolve(
            &schema(&[
                ("Title", "title"),
                ("Notes", "rich_text"),
                ("Description", "rich_text"),
                ("Link", "url"),
                ("Labels", "multi_select"),
                ("Category", "relation"),
            ]),
            &ResourceFieldOverrides::default(),
        );
        assert_eq!(fields.name, "Title");
        assert_eq!(fields.desc.as_deref(), Some("Description"));
        assert_eq!(fields.url.as_deref(), Some("Link"));
        assert_eq!(fields.tags.as_deref(), Some("Labels"));
        assert_eq!(fields.category.as_deref(), Some("Category"));
    }

    #[test]
    fn test_desc_falls_back_to_first_rich_text() {
        let fields = ResourceFields::resolve(
            &schema(&[("Name", "title"), ("About", "rich_text")]),
            &ResourceFieldOverrides::default(),
        );
        assert_eq!(fields.desc.as_deref(), Some("About"));
        assert!(fields.url.is_none());
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ResourceFieldOverrides {
            url: Some("Homepage".to_string()),
            ..Default::default()
        };
        let fields = ResourceFields::resolve(
            &schema(&[("Name", "title"), ("Repo", "url")]),
            &overrides,
        );
        assert_eq!(fields.url.as_deref(), Some("Homepage"));
    }

    #[test]
    fn test_empty_schema_defaults_title() {
        let fields =
            ResourceFields::resolve(&DatabaseSchema::default(), &ResourceFieldOverrides::default());
        assert_eq!(fields.name, "Name");
        assert!(fields.desc.is_none());
    }
}
