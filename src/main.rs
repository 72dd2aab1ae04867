use xdr_agent::{
    config::AppConfig,
    logging::init_tracing,
    pipeline::{sinks::build_sink, Pipeline},
    signal::shutdown_signal,
    sources::build_producers,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;

    tracing::info!(agent = %config.agent_id, "XDR agent starting");

    let sink = build_sink(&config.sink, &config.agent_id)?;
    let producers = build_producers(&config.producers)?;

    let coordinator = Pipeline::new(config.pipeline.clone(), sink)
        .with_producers(producers)
        .start()?;

    let report = coordinator.run_until(shutdown_signal()).await?;

    if report.grace_exceeded {
        tracing::warn!(
            shutdown_ms = report.shutdown_duration.as_millis() as u64,
            "Shutdown took longer than the configured grace period"
        );
    }

    tracing::info!(
        delivered = report.delivered,
        failed = report.failed,
        "Agent exited gracefully"
    );

    Ok(())
}
