use std::path::PathBuf;
use thiserror::Error;

/// Fatal setup errors, raised before any record is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing judge API key: set {env} or pass --api-key")]
    MissingCredential { env: &'static str },

    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
