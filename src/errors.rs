use thiserror::Error;

#[derive(Error, Debug)]
pub enum CastCoachError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No casts found in the last {0} days")]
    EmptyCorpus(u32),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Narrative generation failed: {0}")]
    Narrative(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for CastCoachError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CastCoachError>;
