use anyhow::Context;
use facewatch::{utils::config::Config, Application};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::new().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&config);

    info!("Starting Facewatch v{}", env!("CARGO_PKG_VERSION"));

    // Initialize application
    let app = Application::new(config).await.map_err(|e| {
        error!("Failed to initialize application: {}", e);
        e
    })?;

    // Start the application
    app.start().await.map_err(|e| {
        error!("Failed to start application: {}", e);
        e
    })?;

    info!("Application started successfully");

    // Handle shutdown signals
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                let _ = shutdown_tx.send(());
            }
            Err(err) => {
                error!("Failed to listen for shutdown signal: {}", err);
            }
        }
    });

    // Wait for shutdown signal
    let _ = shutdown_rx.await;

    // Perform graceful shutdown
    if let Err(e) = app.shutdown().await {
        error!("Error during shutdown: {}", e);
    }

    info!("Application shutdown complete");
    Ok(())
}

fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.node.log_level));

    let stdout = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true);

    match &config.node.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "facewatch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stdout).init();
            None
        }
    }
}
