// ecommbot_ingest/src/converter.rs
// Turns a CSV dataset of product reviews into documents.

use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::document::{Document, infer_scalar};
use crate::error::{IngestError, Result};

/// Anything that can hand the driver a batch of documents.
pub trait DocumentSource: Send + Sync {
    fn load_documents(&self,) -> Result<Vec<Document,>,>;
}

#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct MetadataColumn {
    pub column: String,
    pub key:    String,
}

impl MetadataColumn {
    pub fn new(column: impl Into<String,>, key: impl Into<String,>,) -> Self {
        Self {
            column: column.into(),
            key:    key.into(),
        }
    }
}

/// Which column becomes the document text and which become metadata.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct ConversionRule {
    pub text_column:      String,
    pub metadata_columns: Vec<MetadataColumn,>,
}

impl Default for ConversionRule {
    fn default() -> Self {
        Self {
            text_column:      "review".to_string(),
            metadata_columns: vec![
                MetadataColumn::new("product_title", "product_name",),
                MetadataColumn::new("rating", "rating",),
            ],
        }
    }
}

pub struct DataConverter {
    path: PathBuf,
    rule: ConversionRule,
}

impl DataConverter {
    pub fn new(path: impl Into<PathBuf,>, rule: ConversionRule,) -> Self {
        Self {
            path: path.into(),
            rule,
        }
    }

    pub fn path(&self,) -> &Path {
        &self.path
    }

    /// Reads the dataset and returns one document per row with a non-blank text cell.
    ///
    /// Rows with a blank text cell are skipped. A missing column or a malformed
    /// record fails the whole conversion.
    pub fn convert(&self,) -> Result<Vec<Document,>,> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true,)
            .flexible(false,)
            .from_path(&self.path,)
            .map_err(|e| {
                IngestError::DataError(format!(
                    "Failed to open dataset {}: {}",
                    self.path.display(),
                    e
                ),)
            },)?;

        let headers = reader
            .headers()
            .map_err(|e| {
                IngestError::DataError(format!(
                    "Failed to read header of {}: {}",
                    self.path.display(),
                    e
                ),)
            },)?
            .clone();

        let text_idx = column_index(&headers, &self.rule.text_column, &self.path,)?;
        let metadata_idx = self
            .rule
            .metadata_columns
            .iter()
            .map(|m| column_index(&headers, &m.column, &self.path,).map(|idx| (idx, m.key.as_str(),),),)
            .collect::<Result<Vec<_,>,>>()?;

        let mut documents = Vec::new();
        let mut skipped = 0usize;

        for (row, record,) in reader.records().enumerate() {
            let row_number = row + 1;
            let record = record.map_err(|e| {
                IngestError::DataError(format!(
                    "Malformed record at data row {} of {}: {}",
                    row_number,
                    self.path.display(),
                    e
                ),)
            },)?;

            let text = record.get(text_idx,).map(str::trim,).unwrap_or_default();
            if text.is_empty() {
                warn!(
                    row = row_number,
                    column = %self.rule.text_column,
                    "Skipping row with empty text field"
                );
                skipped += 1;
                continue;
            }

            let mut document = Document::new(text,);
            for (idx, key,) in &metadata_idx {
                match record.get(*idx,).map(str::trim,) {
                    Some(cell,) if !cell.is_empty() => {
                        document.metadata.insert(key.to_string(), infer_scalar(cell,),);
                    },
                    _ => debug!(row = row_number, key = %key, "Metadata cell is empty"),
                }
            }
            documents.push(document,);
        }

        info!(
            "Converted {} documents from {} ({} rows skipped)",
            documents.len(),
            self.path.display(),
            skipped
        );
        Ok(documents,)
    }
}

impl DocumentSource for DataConverter {
    fn load_documents(&self,) -> Result<Vec<Document,>,> {
        self.convert()
    }
}

fn column_index(headers: &StringRecord, column: &str, path: &Path,) -> Result<usize,> {
    headers
        .iter()
        .position(|h| h.trim() == column,)
        .ok_or_else(|| {
            IngestError::DataError(format!(
                "Column `{}` not found in {} (available: {})",
                column,
                path.display(),
                headers.iter().collect::<Vec<_,>>().join(", ")
            ),)
        },)
}
