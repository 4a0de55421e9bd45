use mimalloc::MiMalloc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hello_runtimeclass::application::ServerConfig;
use hello_runtimeclass::infrastructure::server_impl::server::serve;
use hello_runtimeclass::AnyResult;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// one connection at a time, so a single thread is all the runtime needs
#[tokio::main(flavor = "current_thread")]
async fn main() -> AnyResult<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hello_runtimeclass=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let listener = config.bind().await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    serve(listener).await;
    Ok(())
}
