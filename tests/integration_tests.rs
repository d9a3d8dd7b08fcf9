// ecommbot_ingest/tests/integration_tests.rs

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ecommbot_ingest::config::{CollectionHandle, ConnectionSettings};
use ecommbot_ingest::converter::{ConversionRule, DataConverter, DocumentSource};
use ecommbot_ingest::document::{Document, ScoredDocument};
use ecommbot_ingest::embeddings::Embedder;
use ecommbot_ingest::error::{IngestError, Result};
use ecommbot_ingest::ingestor::{AppContext, IngestMode, Ingestor, IngestorConfig};
use ecommbot_ingest::store::{DocumentStore, EmbeddedDocument, INSERT_BATCH_SIZE};
use tempfile::NamedTempFile;

struct CountingSource {
    inner: DataConverter,
    calls: AtomicUsize,
}

impl DocumentSource for CountingSource {
    fn load_documents(&self,) -> Result<Vec<Document,>,> {
        self.calls.fetch_add(1, Ordering::SeqCst,);
        self.inner.load_documents()
    }
}

/// Embeds text as a tiny bag-of-letters vector so similar words rank close together.
#[derive(Default,)]
struct LetterEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for LetterEmbedder {
    async fn generate_embeddings(&self, texts: &[String],) -> Result<Vec<Vec<f32,>,>,> {
        self.calls.fetch_add(1, Ordering::SeqCst,);
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0_f32; 4];
                for c in t.to_lowercase().chars() {
                    match c {
                        'a'..='f' => v[0] += 1.0,
                        'g'..='l' => v[1] += 1.0,
                        'm'..='r' => v[2] += 1.0,
                        's'..='z' => v[3] += 1.0,
                        _ => {},
                    }
                }
                v
            },)
            .collect(),)
    }

    fn dimension(&self,) -> usize {
        4
    }

    fn model(&self,) -> &str {
        "letter-counts"
    }
}

#[derive(Default,)]
struct InMemoryStore {
    ensure_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    find_calls:   AtomicUsize,
    rows:         Mutex<Vec<EmbeddedDocument,>,>,
    reject:       bool,
    silent:       bool,
}

impl InMemoryStore {
    fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    /// Accepts writes but reports no inserted ids.
    fn silent() -> Self {
        Self {
            silent: true,
            ..Default::default()
        }
    }

    fn network_calls(&self,) -> usize {
        self.ensure_calls.load(Ordering::SeqCst,)
            + self.insert_calls.load(Ordering::SeqCst,)
            + self.find_calls.load(Ordering::SeqCst,)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn ensure_collection(&self, _handle: &CollectionHandle, dimension: usize,) -> Result<(),> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst,);
        assert_eq!(dimension, 4);
        Ok((),)
    }

    async fn insert_documents(
        &self,
        _handle: &CollectionHandle,
        documents: Vec<EmbeddedDocument,>,
    ) -> Result<Vec<String,>,> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst,);
        if self.reject {
            return Err(IngestError::upstream("in-memory store", "write rejected",),);
        }
        let ids = if self.silent {
            Vec::new()
        } else {
            documents.iter().map(|d| d.id.clone(),).collect()
        };
        self.rows.lock().unwrap().extend(documents,);
        Ok(ids,)
    }

    async fn find_similar(
        &self,
        _handle: &CollectionHandle,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument,>,> {
        self.find_calls.fetch_add(1, Ordering::SeqCst,);
        let rows = self.rows.lock().unwrap();
        let mut scored: Vec<ScoredDocument,> = rows
            .iter()
            .map(|r| ScoredDocument {
                id:         r.id.clone(),
                document:   r.document.clone(),
                similarity: Some(cosine(vector, &r.vector,),),
            },)
            .collect();
        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity,).unwrap(),);
        scored.truncate(limit,);
        Ok(scored,)
    }
}

fn cosine(a: &[f32], b: &[f32],) -> f32 {
    let dot: f32 = a.iter().zip(b,).map(|(x, y,)| x * y,).sum();
    let na: f32 = a.iter().map(|x| x * x,).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x,).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

fn dataset(contents: &str,) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temporary file",);
    file.write_all(contents.as_bytes(),)
        .expect("Failed to write dataset",);
    file
}

const THREE_ROWS: &str = "product_title,rating,summary,review\n\
    boAt Rockerz 235v2,5,Terrific,Deep bass and cheap\n\
    JBL C100SI,4,Good,Clear vocals for calls\n\
    realme Buds 2,3,Okay,Average sound but comfortable\n";

fn connection() -> ConnectionSettings {
    ConnectionSettings {
        api_endpoint: Some("https://db-id-us-east1.apps.astra.datastax.com".to_string(),),
        token:        Some("AstraCS:test".to_string(),),
        keyspace:     Some("shop".to_string(),),
    }
}

struct Harness {
    source:   Arc<CountingSource,>,
    embedder: Arc<LetterEmbedder,>,
    store:    Arc<InMemoryStore,>,
    ingestor: Ingestor,
}

fn harness(file: &NamedTempFile, connection: ConnectionSettings, store: InMemoryStore,) -> Harness {
    let source = Arc::new(CountingSource {
        inner: DataConverter::new(file.path(), ConversionRule::default(),),
        calls: AtomicUsize::new(0,),
    },);
    let embedder = Arc::new(LetterEmbedder::default(),);
    let store = Arc::new(store,);
    let ingestor = Ingestor::new(
        IngestorConfig::new(connection,),
        source.clone(),
        embedder.clone(),
        store.clone(),
    );
    Harness {
        source,
        embedder,
        store,
        ingestor,
    }
}

#[test]
fn converter_is_deterministic() {
    let file = dataset(THREE_ROWS,);
    let converter = DataConverter::new(file.path(), ConversionRule::default(),);

    let first = converter.convert().unwrap();
    let second = converter.convert().unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn fresh_ingest_returns_one_id_per_document_then_attach_succeeds() {
    let file = dataset(THREE_ROWS,);
    let h = harness(&file, connection(), InMemoryStore::default(),);

    let outcome = h.ingestor.ingest(IngestMode::Fresh,).await.unwrap();

    assert_eq!(outcome.inserted_ids.len(), 3);
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.ensure_calls.load(Ordering::SeqCst), 1);
    let stored: Vec<String,> = h.store.rows.lock().unwrap().iter().map(|r| r.id.clone(),).collect();
    assert_eq!(outcome.inserted_ids, stored);

    let attached = h.ingestor.ingest(IngestMode::Attach,).await.unwrap();
    assert!(attached.inserted_ids.is_empty());
    assert_eq!(attached.collection.handle().collection_name(), "aws");
}

#[tokio::test]
async fn attach_never_touches_converter_embedder_or_store() {
    let file = dataset(THREE_ROWS,);
    let h = harness(&file, connection(), InMemoryStore::default(),);

    let outcome = h.ingestor.ingest(IngestMode::Attach,).await.unwrap();

    assert!(outcome.inserted_ids.is_empty());
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.network_calls(), 0);
}

#[tokio::test]
async fn missing_configuration_fails_before_any_collaborator() {
    let file = dataset(THREE_ROWS,);

    for strip in 0..3 {
        let mut settings = connection();
        match strip {
            0 => settings.api_endpoint = None,
            1 => settings.token = None,
            _ => settings.keyspace = None,
        }
        let h = harness(&file, settings, InMemoryStore::default(),);

        for mode in [IngestMode::Fresh, IngestMode::Attach,] {
            let err = h.ingestor.ingest(mode,).await.unwrap_err();
            assert!(matches!(err, IngestError::ConfigurationError(_)), "{:?}", err);
        }
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.network_calls(), 0);
    }
}

#[tokio::test]
async fn dataset_without_valid_rows_is_a_data_error_and_writes_nothing() {
    let file = dataset("product_title,rating,summary,review\nboAt,5,Terrific,\nJBL,4,Good,\"  \"\n",);
    let h = harness(&file, connection(), InMemoryStore::default(),);

    let err = h.ingestor.ingest(IngestMode::Fresh,).await.unwrap_err();

    assert!(matches!(err, IngestError::DataError(_)));
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.network_calls(), 0);
    assert!(h.store.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_write_surfaces_as_upstream_error() {
    let file = dataset(THREE_ROWS,);
    let h = harness(&file, connection(), InMemoryStore::rejecting(),);

    let err = h.ingestor.ingest(IngestMode::Fresh,).await.unwrap_err();

    assert!(matches!(err, IngestError::UpstreamError { .. }));
    assert_eq!(h.store.insert_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_inserted_ids_fail_the_fresh_ingest() {
    let file = dataset(THREE_ROWS,);
    let h = harness(&file, connection(), InMemoryStore::silent(),);

    let err = h.ingestor.ingest(IngestMode::Fresh,).await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::UpstreamError { ref message, .. } if message.contains("expected 3 inserted ids, got 0")
    ));
    assert_eq!(h.store.insert_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn large_dataset_is_written_in_sequential_batches() {
    let mut csv = String::from("product_title,rating,summary,review\n",);
    for i in 0..(INSERT_BATCH_SIZE * 2 + 5) {
        csv.push_str(&format!("Product {},4,Fine,Review number {}\n", i, i),);
    }
    let file = dataset(&csv,);
    let h = harness(&file, connection(), InMemoryStore::default(),);

    let outcome = h.ingestor.ingest(IngestMode::Fresh,).await.unwrap();

    assert_eq!(outcome.inserted_ids.len(), INSERT_BATCH_SIZE * 2 + 5);
    assert_eq!(h.store.insert_calls.load(Ordering::SeqCst), 3);
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 3);
    let rows = h.store.rows.lock().unwrap();
    assert_eq!(rows[0].document.content, "Review number 0");
    assert_eq!(rows[rows.len() - 1].document.content, format!("Review number {}", INSERT_BATCH_SIZE * 2 + 4));
}

#[tokio::test]
async fn similarity_search_on_attached_collection_ranks_stored_documents() {
    let file = dataset(THREE_ROWS,);
    let h = harness(&file, connection(), InMemoryStore::default(),);
    h.ingestor.ingest(IngestMode::Fresh,).await.unwrap();

    let outcome = h.ingestor.ingest(IngestMode::Attach,).await.unwrap();
    let results = outcome
        .collection
        .similarity_search("Deep bass and cheap", 2,)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].document.content, "Deep bass and cheap");
    assert!(results[0].similarity >= results[1].similarity);
    assert!(results[0].to_string().starts_with("* Deep bass and cheap ["));
}

#[tokio::test]
async fn app_context_shares_clients_between_ingestors() {
    let file = dataset(THREE_ROWS,);
    let embedder = Arc::new(LetterEmbedder::default(),);
    let store = Arc::new(InMemoryStore::default(),);
    let context = AppContext::from_parts(embedder.clone(), store.clone(),);

    let source = Arc::new(DataConverter::new(file.path(), ConversionRule::default(),),);
    let first = context.ingestor(IngestorConfig::new(connection(),), source.clone(),);
    let second = context.ingestor(IngestorConfig::new(connection(),), source,);

    first.ingest(IngestMode::Fresh,).await.unwrap();
    second.ingest(IngestMode::Attach,).await.unwrap();
    context.shutdown();

    assert_eq!(store.rows.lock().unwrap().len(), 3);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_astra_ingestion() {
    // Runs against a real Astra DB database and the Hugging Face inference API.
    if std::env::var("RUN_ASTRA_TESTS",).is_err() {
        println!("Skipping Astra DB ingestion test: RUN_ASTRA_TESTS environment variable not set.");
        return;
    }
    let file = dataset(THREE_ROWS,);
    let context = AppContext::init(std::env::var("HF_TOKEN",).ok(),);
    let mut config = IngestorConfig::new(ConnectionSettings::from_env(),);
    config.collection_name = "ecommbot_ingest_test".to_string();

    let ingestor = context.ingestor(
        config,
        Arc::new(DataConverter::new(file.path(), ConversionRule::default(),),),
    );
    let outcome = ingestor
        .ingest(IngestMode::Fresh,)
        .await
        .expect("Failed to ingest data to Astra DB",);
    assert_eq!(outcome.inserted_ids.len(), 3);

    let results = outcome
        .collection
        .similarity_search("cheap headphones with bass", 3,)
        .await
        .expect("Failed to query Astra DB",);
    assert!(!results.is_empty());
    context.shutdown();
}
