//! Batched bulk indexing of TechDocs collections into Glean.
//!
//! One run re-indexes an entity's whole documentation set: the file list
//! comes from the collection metadata, gets filtered to HTML pages, and is
//! uploaded in fixed-size batches under a single upload session id. The
//! first batch restarts any stale upload session for the datasource; the
//! last batch marks the session complete.
//!
//! Batches are strictly sequential (the bulk-index protocol's page
//! framing requires ordered delivery), while the documents inside one
//! batch are built concurrently.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{header, Client};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::document::DocumentBuilder;
use crate::error::FetchError;
use crate::models::{EntityRef, GleanDocument};
use crate::techdocs::TechDocsClient;

/// Number of documents uploaded per bulk-index call.
pub const BATCH_SIZE: usize = 25;

// ═══════════════════════════════════════════════════════════════════════
// Entity selection
// ═══════════════════════════════════════════════════════════════════════

/// Yields the entities a run should index.
#[async_trait]
pub trait EntityProvider: Send + Sync {
    async fn entities(&self) -> Result<Vec<EntityRef>>;
}

/// Always yields the single entity named in the configuration.
pub struct FixedEntityProvider {
    entity: EntityRef,
}

impl FixedEntityProvider {
    pub fn new(entity: EntityRef) -> Self {
        Self { entity }
    }
}

#[async_trait]
impl EntityProvider for FixedEntityProvider {
    async fn entities(&self) -> Result<Vec<EntityRef>> {
        Ok(vec![self.entity.clone()])
    }
}

/// Yields every entity the catalog reports as carrying TechDocs.
pub struct CatalogEntityProvider {
    techdocs: Arc<TechDocsClient>,
}

impl CatalogEntityProvider {
    pub fn new(techdocs: Arc<TechDocsClient>) -> Self {
        Self { techdocs }
    }
}

#[async_trait]
impl EntityProvider for CatalogEntityProvider {
    async fn entities(&self) -> Result<Vec<EntityRef>> {
        self.techdocs.techdocs_entities().await
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Indexer
// ═══════════════════════════════════════════════════════════════════════

/// Bulk-index request body, camelCase as the Glean API expects.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkIndexRequest<'a> {
    datasource: &'a str,
    documents: &'a [GleanDocument],
    is_first_page: bool,
    is_last_page: bool,
    force_restart_upload: bool,
    upload_id: &'a str,
}

pub struct GleanIndexer {
    api_base_url: String,
    datasource: String,
    token: String,
    builder: DocumentBuilder,
    techdocs: Arc<TechDocsClient>,
    entities: Box<dyn EntityProvider>,
    client: Client,
}

impl GleanIndexer {
    pub fn new(
        config: &Config,
        techdocs: Arc<TechDocsClient>,
        entities: Box<dyn EntityProvider>,
    ) -> Result<Self> {
        let client = Client::builder().pool_max_idle_per_host(0).build()?;
        Ok(Self {
            api_base_url: config.glean.api_base_url.clone(),
            datasource: config.glean.datasource.clone(),
            token: config.glean.api_token()?,
            builder: DocumentBuilder::new(techdocs.clone(), config.glean.datasource.clone()),
            techdocs,
            entities,
            client,
        })
    }

    fn generate_upload_id() -> String {
        format!("upload-{}", Uuid::new_v4())
    }

    /// Entry point for a scheduled or manually triggered run.
    ///
    /// Indexes every entity the provider yields; the first failure aborts
    /// the run and propagates to the caller, which logs and alerts.
    pub async fn bulk_index(&self) -> Result<()> {
        for entity in self.entities.entities().await? {
            self.bulk_index_techdocs(&entity).await?;
        }
        Ok(())
    }

    /// Runs one full re-index of one entity's documentation set.
    pub async fn bulk_index_techdocs(&self, entity: &EntityRef) -> Result<()> {
        let upload_id = Self::generate_upload_id();
        info!(%upload_id, entity = %self.techdocs.entity_uri(entity), "bulk indexing techdocs");

        let metadata = self
            .techdocs
            .metadata(entity)
            .await
            .context("failed to fetch techdocs metadata")?;

        let files_to_index: Vec<String> = metadata
            .files
            .unwrap_or_default()
            .into_iter()
            .filter(|file_path| file_path.ends_with(".html"))
            .collect();

        if files_to_index.is_empty() {
            warn!("no files to index");
            return Ok(());
        }

        let total = files_to_index.len();
        for (batch_number, batch) in files_to_index.chunks(BATCH_SIZE).enumerate() {
            info!(batch = batch_number, "bulk indexing batch");

            let index = batch_number * BATCH_SIZE;
            let (is_first_page, is_last_page) = page_flags(index, total);

            let documents = try_join_all(
                batch
                    .iter()
                    .map(|file_path| self.builder.build(entity, file_path)),
            )
            .await?;

            self.bulk_index_batch(&documents, is_first_page, is_last_page, &upload_id)
                .await
                .with_context(|| format!("failed to upload batch {batch_number}"))?;
        }

        info!(
            %upload_id,
            batches = total.div_ceil(BATCH_SIZE),
            "successfully bulk indexed"
        );
        Ok(())
    }

    /// Uploads one batch of documents to the bulk-index endpoint.
    ///
    /// `force_restart_upload` mirrors `is_first_page`: only the first batch
    /// tells the backend to discard a stale prior upload for the datasource.
    pub async fn bulk_index_batch(
        &self,
        documents: &[GleanDocument],
        is_first_page: bool,
        is_last_page: bool,
        upload_id: &str,
    ) -> Result<(), FetchError> {
        let url = format!("{}/bulkindexdocuments", self.api_base_url);
        let request = BulkIndexRequest {
            datasource: &self.datasource,
            documents,
            is_first_page,
            is_last_page,
            force_restart_upload: is_first_page,
            upload_id,
        };

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            error!(%upload_id, status = %response.status(), "error bulk indexing");
            return Err(FetchError::from_status(response.status()));
        }
        Ok(())
    }
}

/// Page framing for the batch starting at absolute offset `index` within a
/// filtered list of `total` files.
///
/// The batch is the first page when its offset falls inside the first
/// batch-sized window, and the last page when its offset reaches the final
/// batch-sized window (saturating, so a list that fits in one batch makes
/// that batch both).
fn page_flags(index: usize, total: usize) -> (bool, bool) {
    (
        index < BATCH_SIZE,
        index >= total.saturating_sub(BATCH_SIZE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Framing for every batch of an n-file list, in batch order.
    fn framing(total: usize) -> Vec<(bool, bool)> {
        (0..total)
            .step_by(BATCH_SIZE)
            .map(|index| page_flags(index, total))
            .collect()
    }

    #[test]
    fn single_batch_is_both_first_and_last() {
        assert_eq!(framing(1), vec![(true, true)]);
        assert_eq!(framing(3), vec![(true, true)]);
        assert_eq!(framing(25), vec![(true, true)]);
    }

    #[test]
    fn two_batches_split_first_and_last() {
        assert_eq!(framing(26), vec![(true, false), (false, true)]);
        assert_eq!(framing(30), vec![(true, false), (false, true)]);
        assert_eq!(framing(50), vec![(true, false), (false, true)]);
    }

    #[test]
    fn middle_batches_are_neither() {
        assert_eq!(
            framing(51),
            vec![(true, false), (false, false), (false, true)]
        );
        assert_eq!(
            framing(75),
            vec![(true, false), (false, false), (false, true)]
        );
    }

    #[test]
    fn every_list_has_exactly_one_first_and_one_last() {
        for total in 1..=200 {
            let flags = framing(total);
            assert_eq!(flags.iter().filter(|(first, _)| *first).count(), 1, "n={total}");
            assert_eq!(flags.iter().filter(|(_, last)| *last).count(), 1, "n={total}");
        }
    }

    #[test]
    fn batches_partition_the_file_list_in_order() {
        let files: Vec<String> = (0..60).map(|i| format!("page-{i:02}.html")).collect();
        let batches: Vec<&[String]> = files.chunks(BATCH_SIZE).collect();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 25);
        assert_eq!(batches[1].len(), 25);
        assert_eq!(batches[2].len(), 10);

        let rejoined: Vec<String> = batches.concat();
        assert_eq!(rejoined, files);
    }
}
