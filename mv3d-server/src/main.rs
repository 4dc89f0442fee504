use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mv3d_server::{app, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr: SocketAddr = std::env::var("MV3D_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3100".to_string())
        .parse()
        .context("MV3D_ADDR must be a socket address")?;
    let upload_dir =
        PathBuf::from(std::env::var("MV3D_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()));
    let public_base = std::env::var("MV3D_PUBLIC_URL")
        .unwrap_or_else(|_| format!("http://localhost:{}", addr.port()));

    std::fs::create_dir_all(&upload_dir)
        .with_context(|| format!("creating upload directory {}", upload_dir.display()))?;

    info!("serving {} on {addr}", upload_dir.display());

    let router = app(ServerConfig {
        upload_dir,
        public_base,
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, router).await?;

    Ok(())
}
