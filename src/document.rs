// ecommbot_ingest/src/document.rs
// Documents, their scalar metadata and ranked query results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scalar metadata attached to a document, keyed in sorted order.
pub type Metadata = BTreeMap<String, Value,>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize,)]
pub struct Document {
    pub content:  String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String,>,) -> Self {
        Self {
            content:  content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String,>, value: impl Into<Value,>,) -> Self {
        self.metadata.insert(key.into(), value.into(),);
        self
    }
}

/// A document returned by a similarity query, best match first.
#[derive(Clone, Debug, PartialEq,)]
pub struct ScoredDocument {
    pub id:         String,
    pub document:   Document,
    pub similarity: Option<f32,>,
}

impl fmt::Display for ScoredDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result {
        let metadata = serde_json::to_string(&self.document.metadata,).map_err(|_| fmt::Error,)?;
        write!(f, "* {} [{}]", self.document.content, metadata)
    }
}

/// Infers the narrowest scalar for a raw cell: integer, float, bool, then string.
///
/// A number is only taken when it renders back to the cell text, so codes like
/// `007` and integers beyond `i64` stay strings.
pub fn infer_scalar(raw: &str,) -> Value {
    let trimmed = raw.trim();
    if let Ok(i,) = trimmed.parse::<i64>() {
        if i.to_string() == trimmed {
            return Value::from(i,);
        }
    }
    if let Ok(f,) = trimmed.parse::<f64>() {
        if f.is_finite() && f.to_string() == strip_fraction_zeros(trimmed,) {
            return Value::from(f,);
        }
    }
    match trimmed {
        "true" | "True" | "TRUE" => Value::Bool(true,),
        "false" | "False" | "FALSE" => Value::Bool(false,),
        _ => Value::String(trimmed.to_string(),),
    }
}

// "4.50" and "3.0" render as "4.5" and "3".
fn strip_fraction_zeros(text: &str,) -> &str {
    if text.contains('.',) {
        text.trim_end_matches('0',).trim_end_matches('.',)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn infers_scalars() {
        assert_eq!(infer_scalar("5"), json!(5));
        assert_eq!(infer_scalar(" 4.5 "), json!(4.5));
        assert_eq!(infer_scalar("TRUE"), json!(true));
        assert_eq!(infer_scalar("NaN"), json!("NaN"));
        assert_eq!(infer_scalar("boAt Rockerz 235v2"), json!("boAt Rockerz 235v2"));
    }

    #[test]
    fn keeps_cells_that_would_lose_digits_as_strings() {
        assert_eq!(infer_scalar("12345678901234567890"), json!("12345678901234567890"));
        assert_eq!(infer_scalar("007"), json!("007"));
        assert_eq!(infer_scalar("1e3"), json!("1e3"));
        assert_eq!(infer_scalar("0.1000000000000000055511"), json!("0.1000000000000000055511"));
        assert_eq!(infer_scalar("3.0"), json!(3.0));
        assert_eq!(infer_scalar("4.50"), json!(4.5));
        assert_eq!(infer_scalar("-12"), json!(-12));
    }

    #[test]
    fn display_matches_cli_line() {
        let scored = ScoredDocument {
            id:         "1".to_string(),
            document:   Document::new("Great bass",)
                .with_metadata("product_name", "boAt",)
                .with_metadata("rating", 5,),
            similarity: Some(0.9,),
        };
        assert_eq!(
            scored.to_string(),
            r#"* Great bass [{"product_name":"boAt","rating":5}]"#
        );
    }
}
