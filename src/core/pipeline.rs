//! Pipeline context and stage chaining
//!
//! A [`PipelineContext`] is built once per invocation and handed to every stage;
//! stages hold no process-wide state of their own.

use crate::adapters::database::{SourceDatabase, WarehouseConnection};
use crate::adapters::notify::{create_notifier, Notifier};
use crate::adapters::storage::{create_object_store, ObjectStore};
use crate::config::QuarryConfig;
use crate::core::extract::{ExtractRequest, ExtractResponse, Extractor};
use crate::core::load::{LoadRequest, LoadResponse, Loader};
use crate::core::transform::{TransformRequest, TransformResponse, Transformer};
use crate::domain::Result;
use serde::Serialize;
use std::sync::Arc;

/// Everything a stage needs besides its database connection
#[derive(Clone)]
pub struct PipelineContext {
    config: QuarryConfig,
    store: Arc<dyn ObjectStore>,
    notifier: Arc<dyn Notifier>,
}

impl PipelineContext {
    /// Assembles a context from explicit collaborators
    pub fn new(config: QuarryConfig, store: Arc<dyn ObjectStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            store,
            notifier,
        }
    }

    /// Builds the object store and notifier selected by configuration
    pub fn from_config(config: QuarryConfig) -> Result<Self> {
        let store = create_object_store(&config.storage);
        let notifier = create_notifier(&config.notifications)?;
        Ok(Self::new(config, store, notifier))
    }

    /// Returns a copy with dry-run forced on
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.config.application.dry_run = self.config.application.dry_run || dry_run;
        self
    }

    /// Configuration
    pub fn config(&self) -> &QuarryConfig {
        &self.config
    }

    /// Staged object storage
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Notification channel
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Whether stages should skip every write
    pub fn dry_run(&self) -> bool {
        self.config.application.dry_run
    }
}

/// Responses of a chained run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    /// Extraction result
    pub extract: ExtractResponse,
    /// Transform result
    pub transform: TransformResponse,
    /// Load result, absent in dry-run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadResponse>,
}

impl PipelineResponse {
    /// Whether any stage reported a failed table or batch
    pub fn has_failures(&self) -> bool {
        !self.extract.failed_tables.is_empty()
            || !self.transform.failed_tables.is_empty()
            || self
                .load
                .as_ref()
                .is_some_and(|l| !l.failed_batches.is_empty())
    }
}

/// Runs extract, transform and load in sequence, feeding each response forward
///
/// In dry-run nothing is staged, so the load stage is not attempted and no
/// warehouse connection is needed.
pub async fn run_pipeline(
    ctx: &PipelineContext,
    source: Arc<dyn SourceDatabase>,
    warehouse: Option<&mut dyn WarehouseConnection>,
) -> Result<PipelineResponse> {
    let extract = Extractor::new(ctx, source)
        .run(&ExtractRequest::default())
        .await?;

    let transform = Transformer::new(ctx)
        .run(&TransformRequest::from(&extract))
        .await?;

    let load = match warehouse {
        Some(warehouse) if !ctx.dry_run() => Some(
            Loader::new(ctx)
                .run(warehouse, &LoadRequest::from(&transform))
                .await?,
        ),
        Some(_) => {
            tracing::info!("Dry run: skipping load stage");
            None
        }
        None => {
            tracing::info!("No warehouse connection; skipping load stage");
            None
        }
    };

    Ok(PipelineResponse {
        extract,
        transform,
        load,
    })
}
