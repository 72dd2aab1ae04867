use xdr_agent::{
    config::ServerConfig,
    logging::init_tracing,
    server::run_server,
    signal::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::from_env();

    run_server(config, shutdown_signal()).await?;

    Ok(())
}
