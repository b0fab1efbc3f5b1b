use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::model::ids::UploadId;

/// Processing state reported by the upload service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Uploaded,
    Processing,
    Completed,
    Failed,
    /// Any status this client does not recognise.
    #[serde(other)]
    Unknown,
}

/// Counts extracted by the parsing service. Absent until parsing completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedCounts {
    #[serde(default)]
    pub total_questions: Option<u32>,
    #[serde(default)]
    pub total_concepts: Option<u32>,
}

/// An uploaded study document as listed by the upload service.
///
/// Opaque to the aggregator; only its creation time is used, for
/// recent-activity ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub id: UploadId,
    pub filename: String,
    pub file_type: String,
    pub file_size: u64,
    #[serde(default)]
    pub status: UploadStatus,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub parsed_data: ParsedCounts,
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC.
///
/// # Errors
///
/// Returns `chrono::ParseError` if neither form matches.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(at) => Ok(at.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|at| at.and_utc()),
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(de::Error::custom)
}
