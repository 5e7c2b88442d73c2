use serde::Deserialize;

/// PostgREST error envelope.
#[derive(Deserialize, Debug, Default)]
pub struct RestErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Storage API error envelope. `statusCode` is a string and may differ from
/// the HTTP status (missing buckets come back as HTTP 400 with "404").
#[derive(Deserialize, Debug, Default)]
pub struct StorageErrorBody {
    #[serde(rename = "statusCode", default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Descriptor returned after a successful object upload.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
}
