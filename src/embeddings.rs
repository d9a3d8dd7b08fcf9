use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{IngestError, Result};

pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-mpnet-base-v2";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
pub const DEFAULT_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference";

const SERVICE: &str = "Hugging Face inference";

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn generate_embeddings(&self, texts: &[String],) -> Result<Vec<Vec<f32,>,>,>;

    fn dimension(&self,) -> usize;

    fn model(&self,) -> &str;
}

/// Sentence embeddings from the Hugging Face feature-extraction pipeline.
pub struct HuggingFaceEmbedder {
    client:    Client,
    base_url:  String,
    api_token: Option<String,>,
    model:     String,
    dimension: usize,
}

impl HuggingFaceEmbedder {
    pub fn new(api_token: Option<String,>,) -> Self {
        Self::with_base_url(DEFAULT_INFERENCE_URL, api_token,)
    }

    pub fn with_base_url(base_url: impl Into<String,>, api_token: Option<String,>,) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/',).to_string(),
            api_token: api_token.filter(|t| !t.trim().is_empty(),),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }

    fn endpoint(&self,) -> String {
        format!(
            "{}/models/{}/pipeline/feature-extraction",
            self.base_url, self.model
        )
    }
}

#[derive(Serialize,)]
struct FeatureExtractionRequest<'a,> {
    inputs: &'a [String],
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    async fn generate_embeddings(&self, texts: &[String],) -> Result<Vec<Vec<f32,>,>,> {
        if texts.is_empty() {
            return Ok(vec![],);
        }

        debug!(count = texts.len(), model = %self.model, "Requesting embeddings");
        let mut request = self
            .client
            .post(self.endpoint(),)
            .json(&FeatureExtractionRequest { inputs: texts, },);
        if let Some(token,) = &self.api_token {
            request = request.bearer_auth(token,);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IngestError::upstream(SERVICE, format!("request failed: {}", e),),)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(IngestError::upstream(
                SERVICE,
                format!("{} - {}", status, error_text),
            ),);
        }

        let embeddings: Vec<Vec<f32,>,> = response.json().await.map_err(|e| {
            IngestError::upstream(SERVICE, format!("failed to parse response: {}", e),)
        },)?;

        if embeddings.len() != texts.len() {
            return Err(IngestError::upstream(
                SERVICE,
                format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    embeddings.len()
                ),
            ),);
        }
        if let Some(bad,) = embeddings.iter().find(|v| v.len() != self.dimension,) {
            return Err(IngestError::upstream(
                SERVICE,
                format!(
                    "expected {}-dimensional vectors, got {}",
                    self.dimension,
                    bad.len()
                ),
            ),);
        }

        Ok(embeddings,)
    }

    fn dimension(&self,) -> usize {
        self.dimension
    }

    fn model(&self,) -> &str {
        &self.model
    }
}
