//! Object storage and schema registry models

use serde::{Deserialize, Serialize};

/// Body of `POST s3/generate_presigned_url`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignRequest {
    pub key: String,
}

/// Presigned upload URL for a single object key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignResponse {
    pub url: String,
}

/// Schema registry document
///
/// Holds the JSON Schema under `jsonSchema`; the remaining keys form the
/// example instance used to scaffold local files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(rename = "jsonSchema", default, skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<serde_json::Value>,

    #[serde(flatten)]
    pub example: serde_json::Map<String, serde_json::Value>,
}

impl SchemaDocument {
    pub fn is_empty(&self) -> bool {
        self.json_schema.is_none() && self.example.is_empty()
    }
}
