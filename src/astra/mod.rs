// ecommbot_ingest/src/astra/mod.rs
// Astra DB specific storage logic, spoken over the JSON Data API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::CollectionHandle;
use crate::document::{Document, Metadata, ScoredDocument};
use crate::error::{IngestError, Result};
use crate::store::{DocumentStore, EmbeddedDocument};

const SERVICE: &str = "Astra DB";
const API_PATH: &str = "api/json/v1";

pub struct AstraDataApi {
    client: Client,
}

impl Default for AstraDataApi {
    fn default() -> Self {
        Self::new()
    }
}

impl AstraDataApi {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn keyspace_url(handle: &CollectionHandle,) -> String {
        format!(
            "{}/{}/{}",
            handle.api_endpoint(),
            API_PATH,
            handle.keyspace()
        )
    }

    fn collection_url(handle: &CollectionHandle,) -> String {
        format!(
            "{}/{}",
            Self::keyspace_url(handle,),
            handle.collection_name()
        )
    }

    async fn command(
        &self,
        url: String,
        handle: &CollectionHandle,
        body: &Value,
    ) -> Result<CommandResponse,> {
        let response = self
            .client
            .post(&url,)
            .header("Token", handle.token(),)
            .json(body,)
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

        let decoded: CommandResponse = response.json().await.map_err(|e| {
            IngestError::upstream(SERVICE, format!("failed to parse response: {}", e),)
        },)?;

        Ok(decoded,)
    }
}

#[derive(Serialize,)]
struct StoredDocument<'a,> {
    #[serde(rename = "_id")]
    id:       &'a str,
    content:  &'a str,
    metadata: &'a Metadata,
    #[serde(rename = "$vector")]
    vector:   &'a [f32],
}

#[derive(Deserialize, Default,)]
struct CommandResponse {
    #[serde(default)]
    status: Option<CommandStatus,>,
    #[serde(default)]
    data:   Option<FindData,>,
    #[serde(default)]
    errors: Vec<ApiError,>,
}

#[derive(Deserialize, Default,)]
struct CommandStatus {
    #[serde(default, rename = "insertedIds")]
    inserted_ids: Vec<Value,>,
}

#[derive(Deserialize,)]
struct FindData {
    #[serde(default)]
    documents: Vec<FoundDocument,>,
}

#[derive(Deserialize,)]
struct FoundDocument {
    #[serde(rename = "_id")]
    id:         Value,
    #[serde(default)]
    content:    String,
    #[serde(default)]
    metadata:   Metadata,
    #[serde(default, rename = "$similarity")]
    similarity: Option<f32,>,
}

#[derive(Deserialize,)]
struct ApiError {
    #[serde(default)]
    message:    String,
    #[serde(default, rename = "errorCode")]
    error_code: Option<String,>,
}

impl CommandResponse {
    fn into_result(self,) -> Result<Self,> {
        if self.errors.is_empty() {
            return Ok(self,);
        }
        let message = self
            .errors
            .iter()
            .map(|e| match &e.error_code {
                Some(code,) => format!("[{}] {}", code, e.message),
                None => e.message.clone(),
            },)
            .collect::<Vec<_,>>()
            .join("; ",);
        Err(IngestError::upstream(SERVICE, message,),)
    }
}

fn id_to_string(id: Value,) -> String {
    match id {
        Value::String(s,) => s,
        other => other.to_string(),
    }
}

#[async_trait]
impl DocumentStore for AstraDataApi {
    async fn ensure_collection(&self, handle: &CollectionHandle, dimension: usize,) -> Result<(),> {
        let body = json!({
            "createCollection": {
                "name": handle.collection_name(),
                "options": {
                    "vector": { "dimension": dimension, "metric": "cosine" }
                }
            }
        });

        self.command(Self::keyspace_url(handle,), handle, &body,)
            .await?
            .into_result()?;
        info!(
            "Collection {} ready in keyspace {} ({} dimensions)",
            handle.collection_name(),
            handle.keyspace(),
            dimension
        );
        Ok((),)
    }

    async fn insert_documents(
        &self,
        handle: &CollectionHandle,
        documents: Vec<EmbeddedDocument,>,
    ) -> Result<Vec<String,>,> {
        if documents.is_empty() {
            return Ok(vec![],);
        }

        let stored: Vec<StoredDocument<'_,>,> = documents
            .iter()
            .map(|d| StoredDocument {
                id:       &d.id,
                content:  &d.document.content,
                metadata: &d.document.metadata,
                vector:   &d.vector,
            },)
            .collect();
        let body = json!({
            "insertMany": {
                "documents": stored,
                "options": { "ordered": true }
            }
        });

        let response = self
            .command(Self::collection_url(handle,), handle, &body,)
            .await?;
        let inserted: Vec<String,> = response
            .status
            .as_ref()
            .map(|s| s.inserted_ids.iter().cloned().map(id_to_string,).collect(),)
            .unwrap_or_default();

        if !response.errors.is_empty() {
            warn!(
                "Astra DB reported errors after inserting {}/{} documents",
                inserted.len(),
                documents.len()
            );
        }
        response.into_result()?;

        if inserted.len() != documents.len() {
            return Err(IngestError::upstream(
                SERVICE,
                format!(
                    "expected {} inserted ids, got {}",
                    documents.len(),
                    inserted.len()
                ),
            ),);
        }

        debug!("insertMany stored {} documents", inserted.len());
        Ok(inserted,)
    }

    async fn find_similar(
        &self,
        handle: &CollectionHandle,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument,>,> {
        let body = json!({
            "find": {
                "sort": { "$vector": vector },
                "projection": { "$vector": 0 },
                "options": { "limit": limit, "includeSimilarity": true }
            }
        });

        let response = self
            .command(Self::collection_url(handle,), handle, &body,)
            .await?
            .into_result()?;

        let found = response
            .data
            .map(|d| d.documents,)
            .unwrap_or_default()
            .into_iter()
            .map(|d| ScoredDocument {
                id:         id_to_string(d.id,),
                document:   Document {
                    content:  d.content,
                    metadata: d.metadata,
                },
                similarity: d.similarity,
            },)
            .collect();
        Ok(found,)
    }
}
