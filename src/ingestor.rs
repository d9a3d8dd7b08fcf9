// ecommbot_ingest/src/ingestor.rs
// Core ingestion logic: the fresh/attach decision and the shared client context.

use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use serde::Serialize;
use tracing::info;

use crate::astra::AstraDataApi;
use crate::config::{CollectionHandle, ConnectionSettings};
use crate::converter::DocumentSource;
use crate::embeddings::{Embedder, HuggingFaceEmbedder};
use crate::error::{IngestError, Result};
use crate::store::{DocumentStore, VectorCollection};

/// Whether a run writes documents or only attaches to what is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize,)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Convert the dataset, embed it and insert it into the collection.
    Fresh,
    /// Reuse the existing collection without reading or writing documents.
    Attach,
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result {
        match self {
            IngestMode::Fresh => f.write_str("fresh",),
            IngestMode::Attach => f.write_str("attach",),
        }
    }
}

/// Configuration for an ingestor.
#[derive(Debug, Clone,)]
pub struct IngestorConfig {
    pub connection:      ConnectionSettings,
    pub collection_name: String,
}

impl IngestorConfig {
    pub fn new(connection: ConnectionSettings,) -> Self {
        Self {
            connection,
            collection_name: crate::DEFAULT_COLLECTION_NAME.to_string(),
        }
    }
}

/// Result of `ingest`, same shape for both modes. `inserted_ids` is empty on attach.
#[derive(Debug,)]
pub struct IngestOutcome {
    pub collection:   VectorCollection,
    pub inserted_ids: Vec<String,>,
}

pub struct Ingestor {
    config:   IngestorConfig,
    source:   Arc<dyn DocumentSource,>,
    embedder: Arc<dyn Embedder,>,
    store:    Arc<dyn DocumentStore,>,
}

impl Ingestor {
    pub fn new(
        config: IngestorConfig,
        source: Arc<dyn DocumentSource,>,
        embedder: Arc<dyn Embedder,>,
        store: Arc<dyn DocumentStore,>,
    ) -> Self {
        Self {
            config,
            source,
            embedder,
            store,
        }
    }

    pub async fn ingest(&self, mode: IngestMode,) -> Result<IngestOutcome,> {
        let handle = CollectionHandle::resolve(&self.config.connection, &self.config.collection_name,)?;
        let collection = VectorCollection::new(
            handle,
            Arc::clone(&self.embedder,),
            Arc::clone(&self.store,),
        );

        match mode {
            IngestMode::Attach => {
                info!(
                    "Attached to existing collection {}",
                    collection.handle().collection_name()
                );
                Ok(IngestOutcome {
                    collection,
                    inserted_ids: Vec::new(),
                },)
            },
            IngestMode::Fresh => {
                let documents = self.source.load_documents()?;
                if documents.is_empty() {
                    return Err(IngestError::DataError(
                        "dataset produced no documents".to_string(),
                    ),);
                }

                info!(
                    "Ingesting {} documents into {} with {}",
                    documents.len(),
                    collection.handle().collection_name(),
                    self.embedder.model()
                );
                collection.ensure_exists().await?;
                let inserted_ids = collection.add_documents(documents,).await?;

                Ok(IngestOutcome {
                    collection,
                    inserted_ids,
                },)
            },
        }
    }
}

/// Clients shared by every ingest call in the process.
///
/// Build it once with [`AppContext::init`] before the first call and release it
/// with [`AppContext::shutdown`] when the run is over. Dropping the context
/// closes the HTTP connection pools held by the embedder and the store.
pub struct AppContext {
    embedder: Arc<dyn Embedder,>,
    store:    Arc<dyn DocumentStore,>,
}

impl AppContext {
    pub fn init(hf_token: Option<String,>,) -> Self {
        let embedder = HuggingFaceEmbedder::new(hf_token,);
        info!(model = %embedder.model(), "Embedding client initialised");
        Self::from_parts(Arc::new(embedder,), Arc::new(AstraDataApi::new(),),)
    }

    pub fn from_parts(embedder: Arc<dyn Embedder,>, store: Arc<dyn DocumentStore,>,) -> Self {
        Self { embedder, store, }
    }

    pub fn ingestor(&self, config: IngestorConfig, source: Arc<dyn DocumentSource,>,) -> Ingestor {
        Ingestor::new(
            config,
            source,
            Arc::clone(&self.embedder,),
            Arc::clone(&self.store,),
        )
    }

    pub fn shutdown(self,) {
        let outstanding = Arc::strong_count(&self.embedder,).saturating_sub(1,);
        info!(outstanding, "Releasing embedding and store clients");
    }
}
