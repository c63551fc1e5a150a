use catalog::{
    CatalogError, ConfigStore, LanguageCodes, ModelConfig, TableMismatch, TranslationTable,
};
use inference::DetectionEngine;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Loading,
            2 => Self::Ready,
            _ => Self::Failed,
        }
    }
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("{0}")]
    Config(CatalogError),

    #[error("Failed to load detection engine: {0:#}")]
    Engine(anyhow::Error),

    #[error("{0}")]
    Translations(CatalogError),

    #[error("{0} skipped: model configuration unavailable")]
    Skipped(&'static str),

    #[error("Application state was already initialized")]
    AlreadyInitialized,
}

/// The loaded engine, serialized behind a mutex.
pub struct EngineHandle {
    engine: Mutex<Box<dyn DetectionEngine>>,
    classes: usize,
}

impl EngineHandle {
    pub fn new(engine: Box<dyn DetectionEngine>) -> Self {
        let classes = engine.vocabulary().len();
        Self {
            engine: Mutex::new(engine),
            classes,
        }
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    /// The engine holds no per-call state, so a guard poisoned by a panicking
    /// request is recovered rather than failing every later request.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn DetectionEngine>> {
        self.engine.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Detection engine lock poisoned by an earlier panic, recovering");
            self.engine.clear_poison();
            PoisonError::into_inner(poisoned)
        })
    }
}

/// All three resources, available only once the state is ready.
pub struct ReadyResources<'a> {
    pub config: &'a ModelConfig,
    pub translations: &'a TranslationTable,
    pub engine: Arc<EngineHandle>,
}

/// Process-wide resources. Written once during startup, read-only after.
pub struct AppState {
    languages: LanguageCodes,
    default_confidence: f32,
    lifecycle: AtomicU8,
    ready: AtomicBool,
    model_config: OnceLock<ModelConfig>,
    engine: OnceLock<Arc<EngineHandle>>,
    translations: OnceLock<TranslationTable>,
    startup_errors: OnceLock<Vec<String>>,
}

impl AppState {
    pub fn new(languages: LanguageCodes, default_confidence: f32) -> Self {
        Self {
            languages,
            default_confidence,
            lifecycle: AtomicU8::new(Lifecycle::Uninitialized as u8),
            ready: AtomicBool::new(false),
            model_config: OnceLock::new(),
            engine: OnceLock::new(),
            translations: OnceLock::new(),
            startup_errors: OnceLock::new(),
        }
    }

    /// Build an already-ready state from loaded parts.
    pub fn from_parts(
        languages: LanguageCodes,
        default_confidence: f32,
        config: ModelConfig,
        translations: TranslationTable,
        engine: Box<dyn DetectionEngine>,
    ) -> Self {
        let state = Self::new(languages, default_confidence);
        let _ = state.model_config.set(config);
        let _ = state.translations.set(translations);
        let _ = state.engine.set(Arc::new(EngineHandle::new(engine)));
        state.finish(Vec::new());
        state
    }

    /// Load config, then engine, then translations.
    ///
    /// A failed engine load does not stop the translation load. Any failure
    /// leaves the state `Failed`; there are no retries.
    pub fn initialize<F>(
        &self,
        store: &ConfigStore,
        translations_dir: &Path,
        load_engine: F,
    ) -> Result<(), Vec<StartupError>>
    where
        F: FnOnce(&ModelConfig) -> anyhow::Result<Box<dyn DetectionEngine>>,
    {
        if self
            .lifecycle
            .compare_exchange(
                Lifecycle::Uninitialized as u8,
                Lifecycle::Loading as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(vec![StartupError::AlreadyInitialized]);
        }

        let mut errors = Vec::new();

        match store.load() {
            Ok(config) => {
                match load_engine(&config) {
                    Ok(engine) => {
                        let _ = self.engine.set(Arc::new(EngineHandle::new(engine)));
                    }
                    Err(e) => errors.push(StartupError::Engine(e)),
                }

                match TranslationTable::load(translations_dir, &config.translation_table_identifier)
                {
                    Ok(table) => {
                        let _ = self.translations.set(table);
                    }
                    Err(e) => errors.push(StartupError::Translations(e)),
                }

                let _ = self.model_config.set(config);
            }
            Err(e) => {
                errors.push(StartupError::Config(e));
                errors.push(StartupError::Skipped("Engine load"));
                errors.push(StartupError::Skipped("Translation load"));
            }
        }

        self.check_table_against_engine();

        for error in &errors {
            tracing::error!(error = %error, "Startup step failed");
        }
        let messages = errors.iter().map(ToString::to_string).collect();
        self.finish(messages);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn finish(&self, errors: Vec<String>) {
        let lifecycle = if errors.is_empty() {
            Lifecycle::Ready
        } else {
            Lifecycle::Failed
        };
        let _ = self.startup_errors.set(errors);
        self.lifecycle.store(lifecycle as u8, Ordering::Release);
        if lifecycle == Lifecycle::Ready {
            self.ready.store(true, Ordering::Release);
        }

        tracing::info!(
            lifecycle = ?lifecycle,
            model = self.model_config().map(|c| c.model_identifier.as_str()),
            translations = self.translations().map(TranslationTable::len),
            "Application state initialized"
        );
    }

    /// Advisory only: logs classes whose table index disagrees with the engine.
    fn check_table_against_engine(&self) {
        let (Some(handle), Some(table)) = (self.engine.get(), self.translations.get()) else {
            return;
        };
        let engine = handle.lock();

        for mismatch in table.mismatches(engine.vocabulary().iter()) {
            match mismatch {
                TableMismatch::IndexDiffers {
                    name,
                    table_index,
                    engine_index,
                } => tracing::warn!(
                    class = %name,
                    table_index,
                    engine_index,
                    "Translation table class index differs from model"
                ),
                TableMismatch::UnknownClass { name } => tracing::warn!(
                    class = %name,
                    "Translation table names a class the model does not know"
                ),
            }
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn ready(&self) -> Option<ReadyResources<'_>> {
        if !self.is_ready() {
            return None;
        }
        Some(ReadyResources {
            config: self.model_config.get()?,
            translations: self.translations.get()?,
            engine: Arc::clone(self.engine.get()?),
        })
    }

    pub fn model_config(&self) -> Option<&ModelConfig> {
        self.model_config.get()
    }

    pub fn translations(&self) -> Option<&TranslationTable> {
        self.translations.get()
    }

    pub fn engine(&self) -> Option<&Arc<EngineHandle>> {
        self.engine.get()
    }

    pub fn languages(&self) -> &LanguageCodes {
        &self.languages
    }

    pub fn default_confidence(&self) -> f32 {
        self.default_confidence
    }

    pub fn startup_errors(&self) -> &[String] {
        self.startup_errors.get().map(Vec::as_slice).unwrap_or_default()
    }
}
