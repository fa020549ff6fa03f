use serde::Deserialize;

use crate::error::AppError;

/// Runtime configuration.
///
/// Loaded from an optional `fenav.toml` in the working directory, then
/// overridden by `FENAV__<SECTION>__<KEY>` environment variables.
/// Required values are optional here: a missing value only fails the
/// requests that need it, never startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub notion: NotionSettings,
    pub storage: StorageSettings,
    pub auth: AuthSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotionSettings {
    pub token: Option<String>,
    pub api_base: String,
    pub version: String,
    pub timeout_secs: u64,
    pub resource_database_id: Option<String>,
    pub category_database_id: Option<String>,
    pub blog_database_id: Option<String>,
    pub resource_fields: ResourceFieldOverrides,
    pub category_fields: CategoryFieldNames,
    pub blog_fields: BlogFieldNames,
}

impl Default for NotionSettings {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.notion.com/v1".to_string(),
            version: "2022-06-28".to_string(),
            timeout_secs: 15,
            resource_database_id: None,
            category_database_id: None,
            blog_database_id: None,
            resource_fields: ResourceFieldOverrides::default(),
            category_fields: CategoryFieldNames::default(),
            blog_fields: BlogFieldNames::default(),
        }
    }
}

impl NotionSettings {
    pub fn resource_database(&self) -> Result<&str, AppError> {
        required(&self.resource_database_id, "notion.resource_database_id")
    }

    pub fn category_database(&self) -> Result<&str, AppError> {
        required(&self.category_database_id, "notion.category_database_id")
    }

    pub fn blog_database(&self) -> Result<&str, AppError> {
        required(&self.blog_database_id, "notion.blog_database_id")
    }
}

/// Explicit property names for the resource database.
///
/// Anything left unset is resolved from the database schema on first use.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResourceFieldOverrides {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub url: Option<String>,
    pub tags: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CategoryFieldNames {
    pub name: String,
    pub desc: String,
    pub sort: String,
    pub parent: String,
    pub children: String,
    pub links: String,
}

impl Default for CategoryFieldNames {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            desc: "Desc".to_string(),
            sort: "Sort".to_string(),
            parent: "Parent".to_string(),
            children: "Children".to_string(),
            links: "Links".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlogFieldNames {
    pub title: String,
    pub summary: String,
    pub tags: String,
    pub date: String,
    pub slug: String,
    pub published: String,
}

impl Default for BlogFieldNames {
    fn default() -> Self {
        Self {
            title: "Title".to_string(),
            summary: "Summary".to_string(),
            tags: "Tags".to_string(),
            date: "Date".to_string(),
            slug: "Slug".to_string(),
            published: "Published".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub bucket: Option<String>,
    pub region: Option<String>,
    /// Custom endpoint for R2 / MinIO.
    pub endpoint: Option<String>,
    /// Public base URL objects are served from, e.g. `https://cdn.example.com`.
    pub public_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub session_secret: Option<String>,
    pub service_token: Option<String>,
    pub session_ttl_hours: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_secret: None,
            service_token: None,
            session_ttl_hours: 24 * 7,
        }
    }
}

impl AuthSettings {
    pub fn secret(&self) -> Result<&str, AppError> {
        required(&self.session_secret, "auth.session_secret")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub revalidate_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { revalidate_secs: 60 }
    }
}

impl Settings {
    /// Load settings from `fenav.toml` (optional) and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("fenav").required(false))
            .add_source(
                config::Environment::with_prefix("FENAV")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{key} is not configured")))
}
