use anyhow::Result;
use tokio::signal;

/// Wait for termination signals (Ctrl+C, SIGTERM).
pub async fn wait_for_shutdown() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await };

    #[cfg(unix)]
    let terminate = async {
        let mut handler = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        handler.recv().await;
        Ok::<(), std::io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<(), std::io::Error>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            tracing::info!("Received Ctrl+C signal");
        }
        result = terminate => {
            result?;
            tracing::info!("Received SIGTERM signal");
        }
    }

    tracing::info!("Shutdown signal received, initiating graceful shutdown");
    Ok(())
}
