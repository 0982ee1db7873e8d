//! Server entry point.
//!
//! Environment variables are documented in [`community_hub::config`]. With
//! arguments, runs a maintenance command instead of the server (see
//! [`community_hub::cli`]).

use community_hub::config::Settings;
use community_hub::{build, cli};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rocket=warn,mongodb=warn"));

    // A second init (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = Settings::from_env();

    if std::env::args().len() > 1 {
        return cli::handle_cli(&settings).await;
    }

    let _rocket = build(settings)?.launch().await?;
    Ok(())
}
