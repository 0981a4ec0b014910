use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid meta: {0}")]
    InvalidMeta(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Document has no metadata timestamp")]
    MissingTimestamp,

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl TelemetryError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
