// ecommbot_ingest/src/config.rs
// Connection settings and the collection handle derived from them.

use std::fmt;

use url::Url;

use crate::error::{IngestError, Result};

pub const ENV_API_ENDPOINT: &str = "ASTRA_DB_API_ENDPOINT";
pub const ENV_APPLICATION_TOKEN: &str = "ASTRA_DB_APPLICATION_TOKEN";
pub const ENV_KEYSPACE: &str = "ASTRA_DB_KEYSPACE";

/// Raw connection parameters as read from the environment or the command line.
///
/// Nothing is validated here; validation happens when a [`CollectionHandle`] is
/// resolved, so a missing value surfaces from `ingest` rather than at startup.
#[derive(Clone, Default,)]
pub struct ConnectionSettings {
    pub api_endpoint: Option<String,>,
    pub token:        Option<String,>,
    pub keyspace:     Option<String,>,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result {
        f.debug_struct("ConnectionSettings",)
            .field("api_endpoint", &self.api_endpoint,)
            .field("token", &redacted(self.token.as_deref(),),)
            .field("keyspace", &self.keyspace,)
            .finish()
    }
}

impl ConnectionSettings {
    pub fn from_env() -> Self {
        Self {
            api_endpoint: std::env::var(ENV_API_ENDPOINT,).ok(),
            token:        std::env::var(ENV_APPLICATION_TOKEN,).ok(),
            keyspace:     std::env::var(ENV_KEYSPACE,).ok(),
        }
    }
}

/// Address of a remote collection: endpoint, token, keyspace and collection name.
#[derive(Clone, PartialEq, Eq,)]
pub struct CollectionHandle {
    api_endpoint:    String,
    token:           String,
    keyspace:        String,
    collection_name: String,
}

impl fmt::Debug for CollectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result {
        f.debug_struct("CollectionHandle",)
            .field("api_endpoint", &self.api_endpoint,)
            .field("token", &redacted(Some(&self.token,),),)
            .field("keyspace", &self.keyspace,)
            .field("collection_name", &self.collection_name,)
            .finish()
    }
}

impl CollectionHandle {
    pub fn resolve(settings: &ConnectionSettings, collection_name: &str,) -> Result<Self,> {
        let api_endpoint = required(&settings.api_endpoint, ENV_API_ENDPOINT,)?;
        let token = required(&settings.token, ENV_APPLICATION_TOKEN,)?;
        let keyspace = required(&settings.keyspace, ENV_KEYSPACE,)?;

        let parsed = Url::parse(&api_endpoint,).map_err(|e| {
            IngestError::ConfigurationError(format!(
                "{} is not a valid URL ({}): {}",
                ENV_API_ENDPOINT, api_endpoint, e
            ),)
        },)?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(IngestError::ConfigurationError(format!(
                "{} must use http or https, got scheme `{}`",
                ENV_API_ENDPOINT,
                parsed.scheme()
            ),),);
        }

        let collection_name = collection_name.trim();
        if collection_name.is_empty() {
            return Err(IngestError::ConfigurationError(
                "collection name must not be empty".to_string(),
            ),);
        }

        Ok(Self {
            api_endpoint: api_endpoint.trim_end_matches('/',).to_string(),
            token,
            keyspace,
            collection_name: collection_name.to_string(),
        },)
    }

    pub fn api_endpoint(&self,) -> &str {
        &self.api_endpoint
    }

    pub fn token(&self,) -> &str {
        &self.token
    }

    pub fn keyspace(&self,) -> &str {
        &self.keyspace
    }

    pub fn collection_name(&self,) -> &str {
        &self.collection_name
    }
}

fn required(value: &Option<String,>, name: &str,) -> Result<String,> {
    match value.as_deref().map(str::trim,) {
        Some(v,) if !v.is_empty() => Ok(v.to_string(),),
        _ => Err(IngestError::ConfigurationError(format!(
            "{} is not set",
            name
        ),),),
    }
}

fn redacted(value: Option<&str,>,) -> &'static str {
    if value.is_some() { "<redacted>" } else { "<none>" }
}
