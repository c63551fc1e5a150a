use catalog::LanguageCodes;
use common::{Environment, LogLevel};
use inference::EngineConfig;
use serde::Deserialize;
use std::path::PathBuf;

pub const SERVICE_NAME: &str = "detection-gateway";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub model_config_path: PathBuf,
    pub models_dir: PathBuf,
    pub translations_dir: PathBuf,
    pub source_language: String,
    pub target_language: String,
    pub default_confidence: f32,
    pub max_upload_bytes: usize,
    /// Exit instead of serving when startup leaves the service not ready
    pub require_ready: bool,
    pub otel_endpoint: Option<String>,
    #[serde(default)]
    pub inference: EngineConfig,
}

impl Settings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn languages(&self) -> LanguageCodes {
        LanguageCodes::new(self.source_language.trim(), self.target_language.trim())
    }

    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(format!(
                "default_confidence must be within [0, 1], got {}",
                self.default_confidence
            ));
        }

        let source = self.source_language.trim();
        let target = self.target_language.trim();
        if source.is_empty() || target.is_empty() {
            return Err("source_language and target_language must not be empty".to_string());
        }
        if source.eq_ignore_ascii_case(target) {
            return Err(format!(
                "source_language and target_language must differ, both are '{}'",
                source
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than zero".to_string());
        }

        self.inference.validate().map_err(|e| e.to_string())
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8000)?
        .set_default("model_config_path", catalog::DEFAULT_MODEL_CONFIG_PATH)?
        .set_default("models_dir", "models")?
        .set_default("translations_dir", "translations")?
        .set_default("source_language", "en")?
        .set_default("target_language", "ru")?
        .set_default("default_confidence", 0.5)?
        .set_default("max_upload_bytes", 20 * 1024 * 1024)?
        .set_default("require_ready", false)?
        .add_source(
            config::Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings: Settings = config.try_deserialize::<Settings>()?;
    settings.validate().map_err(config::ConfigError::Message)?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference::ExecutionProvider;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 6] = [
        "GATEWAY_PORT",
        "GATEWAY_TARGET_LANGUAGE",
        "GATEWAY_DEFAULT_CONFIDENCE",
        "GATEWAY_INFERENCE__INPUT_SIZE",
        "GATEWAY_INFERENCE__EXECUTION_PROVIDER",
        "GATEWAY_ENVIRONMENT",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn defaults_load() {
        clear_env();

        let settings = get_configuration().unwrap();

        assert_eq!(settings.bind_address(), "0.0.0.0:8000");
        assert_eq!(settings.environment, Environment::Development);
        assert_eq!(settings.default_confidence, 0.5);
        assert_eq!(settings.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(settings.languages(), LanguageCodes::new("en", "ru"));
        assert_eq!(settings.inference.input_size, 640);
        assert!(!settings.require_ready);
        assert!(settings.otel_endpoint.is_none());
    }

    #[test]
    #[serial]
    fn env_overrides_nested_keys() {
        clear_env();
        unsafe {
            env::set_var("GATEWAY_PORT", "9000");
            env::set_var("GATEWAY_TARGET_LANGUAGE", "es");
            env::set_var("GATEWAY_INFERENCE__INPUT_SIZE", "320");
            env::set_var("GATEWAY_INFERENCE__EXECUTION_PROVIDER", "cuda");
            env::set_var("GATEWAY_ENVIRONMENT", "production");
        }

        let settings = get_configuration().unwrap();
        clear_env();

        assert_eq!(settings.port, 9000);
        assert_eq!(settings.languages().target, "es");
        assert_eq!(settings.inference.input_size, 320);
        assert_eq!(settings.inference.execution_provider, ExecutionProvider::Cuda);
        assert_eq!(settings.environment, Environment::Production);
    }

    #[test]
    #[serial]
    fn invalid_values_fail() {
        clear_env();
        unsafe { env::set_var("GATEWAY_DEFAULT_CONFIDENCE", "1.5") };
        assert!(get_configuration().is_err());

        unsafe { env::set_var("GATEWAY_DEFAULT_CONFIDENCE", "0.4") };
        unsafe { env::set_var("GATEWAY_TARGET_LANGUAGE", "EN") };
        assert!(get_configuration().is_err(), "Languages must differ");

        clear_env();
    }
}
