//! Demo server: loads model definitions from MODELS_PATH and serves GraphQL CRUD for them.
//!
//! DATABASE_URL defaults to `memory://`; PORT to 4000; MODELS_PATH to `demos/models`.

use dryer::{load_definitions_from_dir, BoxError, Dryer, StartupConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dryer=info".parse()?))
        .init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "memory://".into());
    let port: u16 = std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(4000);
    let models_path = std::env::var("MODELS_PATH").unwrap_or_else(|_| "demos/models".into());

    let definitions = load_definitions_from_dir(&models_path).await?;
    let handle = Dryer::init(StartupConfig::new(definitions, database_url, port))
        .before_application_init(|| async {
            tracing::info!("starting");
            Ok::<(), BoxError>(())
        })
        .after_application_init(|| async {
            tracing::info!("graphql playground at /graphql");
            Ok::<(), BoxError>(())
        })
        .start()
        .await?;
    tracing::info!("listening on {}", handle.local_addr());

    tokio::select! {
        served = handle.wait() => served?,
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }
    Ok(())
}
