use std::sync::Arc;

use lumishade_mock::run;
use lumishade_mock::settings::Settings;

#[tokio::main]
async fn main() {
    let settings = Arc::new(Settings::new().expect("Failed to load settings."));

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = settings.logger.level.as_str();

            format!("lumishade_core={level},lumishade_mock={level}").into()
        }))
        .init();

    if let Err(err) = run(&settings).await {
        tracing::error!("Simulation failed: {}", err);
    }
}
