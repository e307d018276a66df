use std::process::ExitCode;
use steamid_core::{Driver, HttpNotifier, Settings};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let notifier = match HttpNotifier::from_settings(&settings) {
        Ok(notifier) => notifier,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut driver = Driver::new(notifier, settings.delay());
    match driver.run_file(&settings.ids_file).await {
        Ok(summary) => {
            println!("\n{}\n\nProcessing complete!", summary);
            ExitCode::SUCCESS
        }
        // Already logged by the driver; nothing was sent.
        Err(_) => ExitCode::FAILURE,
    }
}
