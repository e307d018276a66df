use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Instant;
use steamid_core::{Driver, HttpNotifier, Settings};
use tokio::time::sleep;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod routes;

use routes::{status_router, StatusState};

#[tokio::main]
async fn main() -> ExitCode {
    let process_started = Instant::now();
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
    let app = status_router(StatusState::new(driver.subscribe(), process_started));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Could not bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Steam ID Processor service running on port {}", settings.port);
    info!("Health check: http://localhost:{}/health", settings.port);
    info!("Status: http://localhost:{}/status", settings.port);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Status server stopped: {}", e);
        }
    });

    info!(
        "Starting processing in {} ms...",
        settings.start_delay().as_millis()
    );
    let ids_file = settings.ids_file.clone();
    let start_delay = settings.start_delay();
    let finished = tokio::select! {
        result = async {
            sleep(start_delay).await;
            driver.run_file(&ids_file).await
        } => Some(result),
        signal = shutdown_signal() => {
            info!("Received {}, shutting down...", signal);
            None
        }
    };

    if let Some(result) = finished {
        match result {
            Ok(summary) => {
                println!("\n{}\n", summary);
                info!("Processing complete; still serving health checks");
            }
            // Logged and recorded by the driver; keep serving status.
            Err(_) => info!("Processing aborted; still serving health checks"),
        }
        let signal = shutdown_signal().await;
        info!("Received {}, shutting down...", signal);
    }

    // An interrupted run left its counters mid-item; freeze them.
    driver.abort();
    ExitCode::SUCCESS
}

async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
