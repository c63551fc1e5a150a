use catalog::ConfigStore;
use common::{TelemetryGuard, setup_logging};
use gateway::{
    config::{SERVICE_NAME, get_configuration},
    routes::run_server,
    state::AppState,
};
use inference::DetectionEngine;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = get_configuration()?;

    let _telemetry = match &settings.otel_endpoint {
        Some(endpoint) => Some(TelemetryGuard::init(
            SERVICE_NAME,
            endpoint,
            settings.log_level,
            settings.environment,
        )?),
        None => {
            setup_logging(settings.log_level, settings.environment);
            None
        }
    };

    tracing::info!(
        environment = settings.environment.as_str(),
        config = %settings.model_config_path.display(),
        provider = ?settings.inference.execution_provider,
        "Starting {}",
        SERVICE_NAME
    );

    let state = Arc::new(AppState::new(
        settings.languages(),
        settings.default_confidence,
    ));

    let init_state = Arc::clone(&state);
    let init_settings = settings.clone();
    let startup = tokio::task::spawn_blocking(move || {
        let store = ConfigStore::new(&init_settings.model_config_path);
        init_state.initialize(&store, &init_settings.translations_dir, |config| {
            let engine = inference::load_engine(
                &init_settings.models_dir,
                &config.model_identifier,
                &init_settings.inference,
            )?;
            Ok(Box::new(engine) as Box<dyn DetectionEngine>)
        })
    })
    .await?;

    if let Err(errors) = startup {
        if settings.require_ready {
            anyhow::bail!(
                "Startup failed with {} error(s), refusing to serve: {}",
                errors.len(),
                state.startup_errors().join("; ")
            );
        }
        tracing::warn!(
            errors = errors.len(),
            "Serving in degraded mode, detection requests will be rejected"
        );
    }

    run_server(&settings, state).await
}
