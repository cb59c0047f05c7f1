use processor::server::{self, ServerError};
use processor::{Processor, ProcessorConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Default level INFO, overridable via RUST_LOG
    {
        use tracing_subscriber::{EnvFilter, fmt};
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt().with_env_filter(env_filter).try_init();
    }

    let config = ProcessorConfig::from_env().map_err(ServerError::from)?;
    let processor = Arc::new(Processor::new(config));

    let listener = server::bind(&processor).await?;
    tracing::info!(
        failure_rate = processor.config().failure_rate,
        "{} listening on port {}",
        processor.name(),
        processor.config().port
    );

    Ok(server::serve(listener, processor).await?)
}
