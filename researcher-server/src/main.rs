//! Research server - HTTP and SSE front end for research missions.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use researcher::{Researcher, logging};
use researcher::io::config::load_config;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "researcher-server")]
#[command(about = "HTTP and SSE front end for research missions")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Config file (missing file means defaults)
    #[arg(long, default_value = ".researcher/config.toml")]
    config: PathBuf,

    /// Directory containing UI static files (defaults to ./ui/dist)
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eprintln!("warning: failed to load .env: {err}");
    }

    logging::init(logging::SERVER_FILTER);

    let args = Args::parse();

    let config = load_config(&args.config)?;
    let researcher = tokio::task::spawn_blocking(move || Researcher::from_config(&config))
        .await
        .context("researcher setup task")??;
    info!(
        config = %args.config.display(),
        documents = researcher.store().len(),
        "starting researcher-server"
    );

    let state = AppState::new(researcher);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .layer(cors)
        .with_state(state);

    let ui_dir = args
        .ui_dir
        .unwrap_or_else(|| PathBuf::from("ui").join("dist"));
    if ui_dir.exists() {
        info!(ui_dir = %ui_dir.display(), "serving static UI files");
        app = app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
    } else {
        warn!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_args() {
        let args = Args::parse_from(["researcher-server"]);
        assert_eq!(args.bind, "127.0.0.1");
        assert_eq!(args.port, 8000);
        assert_eq!(args.config, PathBuf::from(".researcher/config.toml"));
        assert!(args.ui_dir.is_none());
    }
}
