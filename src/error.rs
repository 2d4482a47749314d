use std::path::PathBuf;

/// Reasons a single route document yields no stations at all
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document has no top-level `features` array")]
    MissingFeatures,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read route file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid line catalog: {0}")]
    LineCatalog(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("preference file io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("preference file is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("preference file root must be a json object")]
    NotAnObject,
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
