use crate::errors::CatalogError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_MODEL_CONFIG_PATH: &str = "model_config.json";

/// Active model selection. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelConfig {
    /// File name of the model artifact under the models directory
    pub model_identifier: String,
    /// File name of the translation table under the translations directory
    pub translation_table_identifier: String,
    #[serde(skip)]
    document: Map<String, Value>,
}

impl ModelConfig {
    pub fn new(
        model_identifier: impl Into<String>,
        translation_table_identifier: impl Into<String>,
    ) -> Self {
        let model_identifier = model_identifier.into();
        let translation_table_identifier = translation_table_identifier.into();

        let mut document = Map::new();
        document.insert("model_name".into(), Value::String(model_identifier.clone()));
        document.insert(
            "translate_name".into(),
            Value::String(translation_table_identifier.clone()),
        );

        Self {
            model_identifier,
            translation_table_identifier,
            document,
        }
    }

    /// The configuration document as it was read, unknown keys included.
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }
}

#[derive(Deserialize)]
struct ModelConfigFile {
    #[serde(alias = "model_identifier")]
    model_name: Option<String>,
    #[serde(alias = "translation_table_identifier")]
    translate_name: Option<String>,
}

/// Reads the model selection document from disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Single attempt; a failure here is terminal for startup.
    pub fn load(&self) -> Result<ModelConfig, CatalogError> {
        let contents =
            fs::read_to_string(&self.path).map_err(|e| CatalogError::config(&self.path, e))?;

        let config = Self::parse(&contents)
            .map_err(|reason| CatalogError::config(&self.path, reason))?;

        tracing::info!(
            path = %self.path.display(),
            model = %config.model_identifier,
            translations = %config.translation_table_identifier,
            "Model configuration loaded"
        );

        Ok(config)
    }

    fn parse(contents: &str) -> Result<ModelConfig, String> {
        let document: Map<String, Value> =
            serde_json::from_str(contents).map_err(|e| e.to_string())?;

        let file: ModelConfigFile = serde_json::from_value(Value::Object(document.clone()))
            .map_err(|e| e.to_string())?;

        let model_identifier = required(file.model_name, "model_name")?;
        let translation_table_identifier = required(file.translate_name, "translate_name")?;

        Ok(ModelConfig {
            model_identifier,
            translation_table_identifier,
            document,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(format!("field `{}` must not be empty", field)),
        None => Err(format!("missing field `{}`", field)),
    }
}
