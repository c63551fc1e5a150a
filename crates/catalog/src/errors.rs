use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to load model configuration from {}: {reason}", .path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("Failed to load translation table {}: {reason}", .path.display())]
    TranslationLoad { path: PathBuf, reason: String },
}

impl CatalogError {
    pub(crate) fn config(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn translation(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::TranslationLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
