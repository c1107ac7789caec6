use thiserror::Error;

#[derive(Error, Debug)]
pub enum RefDataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source error: {message}")]
    Source { message: String },

    #[error("Load failed for entity '{entity}': {message}")]
    Load { entity: String, message: String },
}

pub type Result<T> = std::result::Result<T, RefDataError>;
