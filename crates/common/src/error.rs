//! Error types for the shared site layer

use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Page '{0}' not found in configuration")]
    UnknownPage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
