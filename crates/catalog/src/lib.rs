pub mod config_store;
pub mod errors;
pub mod language;
pub mod translation;

pub use config_store::{ConfigStore, DEFAULT_MODEL_CONFIG_PATH, ModelConfig};
pub use errors::CatalogError;
pub use language::{Language, LanguageCodes};
pub use translation::{TableMismatch, TranslationEntry, TranslationTable};
