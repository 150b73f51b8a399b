//! Semantic-model client: name resolution, DAX execution, schema inference.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::api::{Dataset, PbiApi, QueryResult, Workspace};
use crate::dax;
use crate::error::PbiError;
use crate::schema::{self, DataType, SchemaDescription};

/// Process-lifetime workspace name-to-entry cache.
///
/// Constructed empty and populated by the first successful workspace
/// listing; resolutions after that never re-query, so a renamed or deleted
/// workspace is not reflected until restart. Duplicate names keep the first
/// listed entry.
#[derive(Default)]
pub struct WorkspaceCache {
    inner: RwLock<Option<HashMap<String, Workspace>>>,
}

impl WorkspaceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache already holding a listing, for tests and warm starts.
    #[must_use]
    pub fn preloaded(workspaces: Vec<Workspace>) -> Self {
        Self {
            inner: RwLock::new(Some(index(workspaces))),
        }
    }

    async fn is_populated(&self) -> bool {
        self.inner.read().await.is_some()
    }

    async fn populate(&self, workspaces: Vec<Workspace>) {
        *self.inner.write().await = Some(index(workspaces));
    }

    async fn lookup(&self, name: &str) -> Option<Workspace> {
        self.inner.read().await.as_ref()?.get(name).cloned()
    }
}

/// First listed wins on duplicate names.
fn index(workspaces: Vec<Workspace>) -> HashMap<String, Workspace> {
    let mut indexed = HashMap::with_capacity(workspaces.len());
    for workspace in workspaces {
        indexed
            .entry(workspace.name.clone())
            .or_insert(workspace);
    }
    indexed
}

/// One table/column hit from a cross-table search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub table: String,
    pub column: String,
    pub rows: QueryResult,
}

/// Client over one authenticated Power BI API handle.
///
/// All operations are request-per-call with no internal parallelism; the
/// only shared state is the workspace cache.
pub struct PbiClient<A: PbiApi> {
    api: Arc<A>,
    workspaces: WorkspaceCache,
}

impl<A: PbiApi> PbiClient<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self::from_arc(Arc::new(api))
    }

    #[must_use]
    pub fn from_arc(api: Arc<A>) -> Self {
        Self::with_cache(api, WorkspaceCache::new())
    }

    /// Builds a client around an injected cache.
    #[must_use]
    pub const fn with_cache(api: Arc<A>, workspaces: WorkspaceCache) -> Self {
        Self { api, workspaces }
    }

    /// Lists all accessible workspaces and refreshes the cache.
    ///
    /// # Errors
    /// Returns [`PbiError`] on transport or auth failure.
    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>, PbiError> {
        let workspaces = self.api.list_workspaces().await?;
        self.workspaces.populate(workspaces.clone()).await;
        Ok(workspaces)
    }

    async fn ensure_cache(&self) -> Result<(), PbiError> {
        if !self.workspaces.is_populated().await {
            self.list_workspaces().await?;
        }
        Ok(())
    }

    /// Resolves a workspace name to its service-assigned id.
    ///
    /// # Errors
    /// Returns [`PbiError::WorkspaceNotFound`] when no cached or freshly
    /// listed workspace matches `name` exactly.
    pub async fn workspace_id(&self, name: &str) -> Result<String, PbiError> {
        self.ensure_cache().await?;
        self.workspaces
            .lookup(name)
            .await
            .map(|workspace| workspace.id)
            .ok_or_else(|| PbiError::WorkspaceNotFound(name.to_string()))
    }

    /// Whether the workspace runs on Premium/Fabric capacity. Unknown
    /// names report `false`.
    ///
    /// # Errors
    /// Returns [`PbiError`] if the initial listing fails.
    pub async fn is_premium(&self, name: &str) -> Result<bool, PbiError> {
        self.ensure_cache().await?;
        Ok(self
            .workspaces
            .lookup(name)
            .await
            .is_some_and(|workspace| workspace.is_premium))
    }

    /// Lists the datasets of a workspace by workspace name.
    ///
    /// # Errors
    /// Returns [`PbiError::WorkspaceNotFound`] or a transport failure.
    pub async fn list_datasets(&self, workspace_name: &str) -> Result<Vec<Dataset>, PbiError> {
        let workspace_id = self.workspace_id(workspace_name).await?;
        self.api.list_datasets(&workspace_id).await
    }

    /// Resolves a dataset name within a workspace. Datasets are listed on
    /// every call; only workspaces are cached.
    ///
    /// # Errors
    /// Returns [`PbiError::DatasetNotFound`] naming both workspace and
    /// dataset when no exact match exists.
    pub async fn dataset_id(
        &self,
        workspace_name: &str,
        dataset_name: &str,
    ) -> Result<String, PbiError> {
        let datasets = self.list_datasets(workspace_name).await?;
        datasets
            .into_iter()
            .find(|dataset| dataset.name == dataset_name)
            .map(|dataset| dataset.id)
            .ok_or_else(|| PbiError::DatasetNotFound {
                workspace: workspace_name.to_string(),
                dataset: dataset_name.to_string(),
            })
    }

    /// Executes a DAX query against a dataset resolved by name.
    ///
    /// # Errors
    /// Propagates resolution misses and [`PbiError::QueryExecution`].
    pub async fn execute_dax(
        &self,
        workspace_name: &str,
        dataset_name: &str,
        query: &str,
    ) -> Result<QueryResult, PbiError> {
        let workspace_id = self.workspace_id(workspace_name).await?;
        let dataset_id = self.dataset_id(workspace_name, dataset_name).await?;
        self.api
            .execute_queries(&workspace_id, &dataset_id, query)
            .await
    }

    /// Reads a table, optionally bounded to the first `top_n` rows.
    ///
    /// # Errors
    /// Propagates resolution misses and [`PbiError::QueryExecution`].
    pub async fn read_table(
        &self,
        workspace_name: &str,
        dataset_name: &str,
        table_name: &str,
        top_n: Option<usize>,
    ) -> Result<QueryResult, PbiError> {
        self.execute_dax(workspace_name, dataset_name, &dax::read_table(table_name, top_n))
            .await
    }

    /// Evaluates a measure, optionally grouped by columns.
    ///
    /// # Errors
    /// Propagates resolution misses and [`PbiError::QueryExecution`].
    pub async fn evaluate_measure(
        &self,
        workspace_name: &str,
        dataset_name: &str,
        measure: &str,
        group_by: &[String],
    ) -> Result<QueryResult, PbiError> {
        self.execute_dax(
            workspace_name,
            dataset_name,
            &dax::evaluate_measure(measure, group_by),
        )
        .await
    }

    /// Infers the full schema of a semantic model from one statistics
    /// query. All-or-nothing: a statistics failure yields no partial
    /// schema.
    ///
    /// # Errors
    /// Propagates resolution misses and [`PbiError::QueryExecution`] from
    /// the statistics query; the in-memory inference itself cannot fail.
    pub async fn describe_dataset(
        &self,
        workspace_name: &str,
        dataset_name: &str,
    ) -> Result<SchemaDescription, PbiError> {
        let dataset_id = self.dataset_id(workspace_name, dataset_name).await?;
        let rows = self
            .execute_dax(workspace_name, dataset_name, dax::COLUMN_STATISTICS)
            .await?;
        let description = schema::build_schema(dataset_name, &dataset_id, &rows);
        info!(
            dataset = dataset_name,
            tables = description.tables.len(),
            relationships = description.relationships.len(),
            "inferred schema"
        );
        Ok(description)
    }

    /// Searches every text column of every table for a substring, one
    /// bounded filter query per column, unioning non-empty results. A
    /// failing per-column probe is skipped rather than aborting the union.
    ///
    /// # Errors
    /// Propagates resolution misses and a statistics-query failure; the
    /// per-column probes themselves are best-effort.
    pub async fn search_across_tables(
        &self,
        workspace_name: &str,
        dataset_name: &str,
        search_term: &str,
        max_rows_per_table: usize,
    ) -> Result<Vec<SearchHit>, PbiError> {
        let description = self.describe_dataset(workspace_name, dataset_name).await?;
        let mut hits = Vec::new();

        for table in &description.tables {
            for column in &table.columns {
                if column.data_type != DataType::Text {
                    continue;
                }
                let query = dax::contains_search(
                    &table.name,
                    &column.name,
                    search_term,
                    max_rows_per_table,
                );
                match self
                    .execute_dax(workspace_name, dataset_name, &query)
                    .await
                {
                    Ok(rows) if rows.is_empty() => {}
                    Ok(rows) => hits.push(SearchHit {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        rows,
                    }),
                    Err(err) => {
                        debug!(
                            table = %table.name,
                            column = %column.name,
                            error = %err,
                            "search probe failed, skipping column"
                        );
                    }
                }
            }
        }

        info!(
            dataset = dataset_name,
            hits = hits.len(),
            "cross-table search complete"
        );
        Ok(hits)
    }
}
