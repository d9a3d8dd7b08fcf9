// ecommbot_ingest/src/error.rs
// Error taxonomy shared by the converter, the driver and the remote collaborators.

use thiserror::Error;

#[derive(Debug, Error,)]
pub enum IngestError {
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String,),
    #[error("Data conversion failed: {0}")]
    DataError(String,),
    #[error("{service} rejected the request: {message}")]
    UpstreamError {
        service: &'static str,
        message: String,
    },
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error,),
    #[error("Other error: {0}")]
    Other(String,),
}

impl IngestError {
    pub fn upstream(service: &'static str, message: impl Into<String,>,) -> Self {
        IngestError::UpstreamError {
            service,
            message: message.into(),
        }
    }

    /// Short label used in logs and in the run report.
    pub fn kind(&self,) -> &'static str {
        match self {
            IngestError::ConfigurationError(_,) => "configuration",
            IngestError::DataError(_,) => "data",
            IngestError::UpstreamError { .. } => "upstream",
            IngestError::IoError(_,) => "io",
            IngestError::Other(_,) => "other",
        }
    }
}

pub type Result<T,> = std::result::Result<T, IngestError,>;
