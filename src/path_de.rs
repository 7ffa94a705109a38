use serde::de::DeserializeOwned;

use crate::desc::Catalog;

/// Deserialization failure located by its JSON path (e.g. `types[2]`).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("at JSON path {path} → {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(located)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(located)
}

/// A declaration file: `{"types": [...]}`.
pub fn catalog_from_str(src: &str) -> Result<Catalog, PathError> {
    from_str_with_path(src)
}

fn located(err: serde_path_to_error::Error<serde_json::Error>) -> PathError {
    PathError { path: err.path().to_string(), message: err.into_inner().to_string() }
}
