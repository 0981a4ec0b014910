use crate::error::{Result, TelemetryError};
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Schema version stamped on batch-once artifacts
pub const MOCK_VERSION: &str = "2.0";
/// API version reported by the on-demand endpoint
pub const DYNAMIC_API_VERSION: &str = "v2.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMetadata {
    /// Fetched payloads may omit the source; they are real data
    #[serde(default = "real_source")]
    pub source: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
    pub match_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

fn real_source() -> DataSource {
    DataSource::Real
}

impl TelemetryMetadata {
    /// When the batch was produced; fetched data takes precedence
    pub fn timestamp(&self) -> Option<&str> {
        self.fetched_at.as_deref().or(self.generated_at.as_deref())
    }
}

/// Envelope shared by the static artifact, the HTTP body and fetched data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryDocument {
    pub matches: Vec<MatchRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TelemetryMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl TelemetryDocument {
    /// Static artifact for the dashboard's demo data
    pub fn mock(matches: Vec<MatchRecord>) -> Self {
        Self {
            matches,
            metadata: None,
            version: Some(MOCK_VERSION.to_string()),
        }
    }

    /// Fresh on-demand batch; `generated_at` is an ISO-8601 timestamp
    pub fn dynamic(matches: Vec<MatchRecord>, generated_at: String) -> Self {
        let match_count = matches.len();
        Self {
            matches,
            metadata: Some(TelemetryMetadata {
                source: DataSource::Dynamic,
                generated_at: Some(generated_at),
                fetched_at: None,
                match_count,
                api_version: Some(DYNAMIC_API_VERSION.to_string()),
            }),
            version: None,
        }
    }

    /// Source badge; documents without metadata are demo data
    pub fn source(&self) -> DataSource {
        self.metadata.as_ref().map(|m| m.source).unwrap_or(DataSource::Mock)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a document from disk
    pub fn read_from(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| TelemetryError::io(path, e))?;
        Self::from_json(&json)
    }

    /// Write pretty JSON, creating parent directories as needed
    pub fn write_to(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TelemetryError::io(parent, e))?;
        }
        std::fs::write(path, self.to_json_pretty()?).map_err(|e| TelemetryError::io(path, e))
    }
}
