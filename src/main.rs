use anyhow::Result;
use env_logger::Target;
use log::info;

use node_sidecar::{launch, InstallLayout, LaunchConfig};

// Stdout carries exactly one line, the URL the shell should load.
// Everything else goes to stderr.
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();

    let layout = InstallLayout::from_env();
    let config = LaunchConfig::new(layout.clone());

    let mut result = launch(&config).await;
    println!("{}", result.url);
    info!(
        "launch complete: {}",
        serde_json::to_string(&result.info(layout.is_packaged()))?
    );

    if let Some(server) = result.server.as_mut() {
        tokio::signal::ctrl_c().await?;
        info!("shutting down server");
        server.shutdown().await;
    }

    Ok(())
}
