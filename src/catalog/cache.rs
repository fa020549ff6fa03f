use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OnceCell, RwLock};

use crate::catalog::models::{CategoryRecord, CategoryViewNode};
use crate::catalog::tree::build_tree;
use crate::config::NotionSettings;
use crate::error::AppError;
use crate::notion::client::{query_all, NotionClient};
use crate::notion::fields::ResourceFields;
use crate::notion::models::{QueryRequest, ResourceRecord};
use crate::notion::transform::transform_page;

/// Immutable view of both collections plus the tree derived from them.
#[derive(Debug)]
pub struct CatalogSnapshot {
    pub resources: Vec<ResourceRecord>,
    pub categories: Vec<CategoryRecord>,
    pub tree: Vec<CategoryViewNode>,
    pub fetched_at: Instant,
}

impl CatalogSnapshot {
    pub fn new(resources: Vec<ResourceRecord>, categories: Vec<CategoryRecord>) -> Self {
        let tree = build_tree(&categories, &resources);
        Self {
            resources,
            categories,
            tree,
            fetched_at: Instant::now(),
        }
    }
}

struct Cached {
    snapshot: Arc<CatalogSnapshot>,
    /// Value of `Catalog::generation` when the fetch started.
    generation: u64,
}

/// Process-lifetime cache of the resource and category databases.
///
/// Snapshots are replaced wholesale once older than `ttl` or invalidated.
/// A failed refresh keeps serving the previous snapshot when there is one,
/// and at most one refresh runs at a time.
pub struct Catalog {
    notion: Arc<dyn NotionClient>,
    settings: NotionSettings,
    ttl: Duration,
    cached: RwLock<Option<Cached>>,
    generation: AtomicU64,
    refresh_lock: Mutex<()>,
    resource_fields: OnceCell<ResourceFields>,
}

impl Catalog {
    pub fn new(notion: Arc<dyn NotionClient>, settings: NotionSettings, ttl: Duration) -> Self {
        Self {
            notion,
            settings,
            ttl,
            cached: RwLock::new(None),
            generation: AtomicU64::new(0),
            refresh_lock: Mutex::new(()),
            resource_fields: OnceCell::new(),
        }
    }

    pub fn notion(&self) -> &dyn NotionClient {
        self.notion.as_ref()
    }

    pub fn settings(&self) -> &NotionSettings {
        &self.settings
    }

    /// Current snapshot, refreshing it first when stale, invalidated or absent.
    pub async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, AppError> {
        if let Some(snapshot) = self.fresh().await {
            return Ok(snapshot);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(snapshot) = self.fresh().await {
            return Ok(snapshot);
        }

        match self.fetch().await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => match self.last_known().await {
                Some(stale) => {
                    tracing::warn!("Catalog refresh failed, serving stale snapshot: {e}");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    /// Mark the cached snapshot stale so the next read refetches. It stays
    /// available as a fallback if that refetch fails.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    async fn fresh(&self) -> Option<Arc<CatalogSnapshot>> {
        let current = self.generation.load(Ordering::SeqCst);
        self.cached
            .read()
            .await
            .as_ref()
            .filter(|c| c.generation == current && c.snapshot.fetched_at.elapsed() < self.ttl)
            .map(|c| c.snapshot.clone())
    }

    async fn last_known(&self) -> Option<Arc<CatalogSnapshot>> {
        self.cached.read().await.as_ref().map(|c| c.snapshot.clone())
    }

    /// Fetch both databases concurrently and swap in a new snapshot.
    /// The caller holds `refresh_lock`.
    async fn fetch(&self) -> Result<Arc<CatalogSnapshot>, AppError> {
        let generation = self.generation.load(Ordering::SeqCst);
        let resource_db = self.settings.resource_database()?;
        let category_db = self.settings.category_database()?;

        let (resource_rows, category_rows) = tokio::try_join!(
            query_all(self.notion(), resource_db, QueryRequest::default()),
            query_all(self.notion(), category_db, QueryRequest::default()),
        )?;

        let resources: Vec<ResourceRecord> = resource_rows.iter().map(transform_page).collect();
        let categories: Vec<CategoryRecord> = category_rows
            .iter()
            .map(transform_page)
            .map(|page| CategoryRecord::from_page(&page, &self.settings.category_fields))
            .collect();

        tracing::debug!(
            resources = resources.len(),
            categories = categories.len(),
            "Catalog refreshed"
        );

        let snapshot = Arc::new(CatalogSnapshot::new(resources, categories));
        *self.cached.write().await = Some(Cached {
            snapshot: snapshot.clone(),
            generation,
        });
        Ok(snapshot)
    }

    /// Resource property names, resolved from the schema on first use.
    pub async fn resource_fields(&self) -> Result<&ResourceFields, AppError> {
        self.resource_fields
            .get_or_try_init(|| async {
                let database_id = self.settings.resource_database()?;
                let schema = self.notion.retrieve_database(database_id).await?;
                let fields = ResourceFields::resolve(&schema, &self.settings.resource_fields);
                tracing::info!(?fields, "Resolved resource field mapping");
                Ok::<_, AppError>(fields)
            })
            .await
    }
}
