// ecommbot_ingest/src/lib.rs
// Public API of the review ingestion crate.

pub mod astra;
pub mod cli;
pub mod config;
pub mod converter;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod ingestor;
pub mod store;

pub const DEFAULT_COLLECTION_NAME: &str = "aws";
pub const DEFAULT_DATASET_PATH: &str = "data/flipkart_product_review.csv";
pub const DEFAULT_DEMO_QUERY: &str = "can you tell me the low budget sound basshead.";
pub const DEFAULT_TOP_K: usize = 4;
