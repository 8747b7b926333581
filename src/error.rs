use thiserror::Error;

/// Failure while exporting a single record. Never escapes the export loop;
/// it is counted in `ExportStats` and the record is dropped.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Write error: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate metric: {0}")]
    Duplicate(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}
