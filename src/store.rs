// ecommbot_ingest/src/store.rs
// Collection handle bound to an embedder and a document store.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::CollectionHandle;
use crate::document::{Document, ScoredDocument};
use crate::embeddings::Embedder;
use crate::error::{IngestError, Result};

/// Documents per embedding call and per insert command.
pub const INSERT_BATCH_SIZE: usize = 20;

/// A document ready to be written: its assigned id and its embedding.
#[derive(Debug, Clone, PartialEq,)]
pub struct EmbeddedDocument {
    pub id:       String,
    pub document: Document,
    pub vector:   Vec<f32,>,
}

/// Remote storage for embedded documents, addressed by a [`CollectionHandle`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates the collection if it does not exist yet.
    async fn ensure_collection(&self, handle: &CollectionHandle, dimension: usize,) -> Result<(),>;

    /// Writes documents and returns the ids reported as inserted, in submission order.
    async fn insert_documents(
        &self,
        handle: &CollectionHandle,
        documents: Vec<EmbeddedDocument,>,
    ) -> Result<Vec<String,>,>;

    async fn find_similar(
        &self,
        handle: &CollectionHandle,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument,>,>;
}

#[derive(Clone,)]
pub struct VectorCollection {
    handle:   CollectionHandle,
    embedder: Arc<dyn Embedder,>,
    store:    Arc<dyn DocumentStore,>,
}

impl fmt::Debug for VectorCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result {
        f.debug_struct("VectorCollection",)
            .field("handle", &self.handle,)
            .field("model", &self.embedder.model(),)
            .finish()
    }
}

impl VectorCollection {
    pub fn new(
        handle: CollectionHandle,
        embedder: Arc<dyn Embedder,>,
        store: Arc<dyn DocumentStore,>,
    ) -> Self {
        Self {
            handle,
            embedder,
            store,
        }
    }

    pub fn handle(&self,) -> &CollectionHandle {
        &self.handle
    }

    pub async fn ensure_exists(&self,) -> Result<(),> {
        self.store
            .ensure_collection(&self.handle, self.embedder.dimension(),)
            .await
    }

    /// Embeds and stores documents batch by batch. Batches already written stay
    /// written if a later one fails.
    pub async fn add_documents(&self, documents: Vec<Document,>,) -> Result<Vec<String,>,> {
        let total = documents.len();
        let mut inserted = Vec::with_capacity(total,);
        let mut pending = documents.into_iter().peekable();

        while pending.peek().is_some() {
            let batch: Vec<Document,> = pending.by_ref().take(INSERT_BATCH_SIZE,).collect();
            let texts: Vec<String,> = batch.iter().map(|d| d.content.clone(),).collect();
            let vectors = self.embedder.generate_embeddings(&texts,).await?;
            if vectors.len() != batch.len() {
                return Err(IngestError::upstream(
                    "embedding",
                    format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        vectors.len()
                    ),
                ),);
            }

            let embedded = batch
                .into_iter()
                .zip(vectors,)
                .map(|(document, vector,)| EmbeddedDocument {
                    id: Uuid::new_v4().to_string(),
                    document,
                    vector,
                },)
                .collect::<Vec<_,>>();
            let batch_len = embedded.len();

            let ids = self
                .store
                .insert_documents(&self.handle, embedded,)
                .await?;
            if ids.len() != batch_len {
                return Err(IngestError::upstream(
                    "document store",
                    format!("expected {} inserted ids, got {}", batch_len, ids.len()),
                ),);
            }
            inserted.extend(ids,);
            debug!("Stored {}/{} documents", inserted.len(), total);
        }

        info!(
            "Inserted {} documents into collection {}",
            inserted.len(),
            self.handle.collection_name()
        );
        Ok(inserted,)
    }

    pub async fn similarity_search(&self, query: &str, k: usize,) -> Result<Vec<ScoredDocument,>,> {
        if k == 0 {
            return Ok(vec![],);
        }
        let mut vectors = self
            .embedder
            .generate_embeddings(&[query.to_string()],)
            .await?;
        let vector = vectors.pop().ok_or_else(|| {
            IngestError::upstream("embedding", "no embedding returned for query",)
        },)?;

        self.store.find_similar(&self.handle, &vector, k,).await
    }
}
