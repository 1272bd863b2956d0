//! HTTP front end for the EPD grid.
//!
//! `POST /rows` answers server-side row model requests, `GET /rows` loads the
//! whole table for the client-side row model. Configuration comes from the
//! environment (and a `.env` file, if present).

mod routes;

use std::convert::Infallible;
use std::sync::Arc;

use epd_grid_lib::config::GridConfig;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use tokio::net::TcpListener;

use crate::routes::AppState;

const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    let level = std::env::var("EPD_LOG")
        .ok()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    if let Err(e) = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    if let Ok(path) = dotenv {
        log::debug!("Loaded environment from {}", path.display());
    }

    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = GridConfig::from_env()?;
    log::info!("Serving table '{}' from {:?}", config.table, config.source);

    let backend = config.backend()?;
    if config.strict_columns {
        config.column_map.validate(&backend, &config.table).await?;
    }
    let state = Arc::new(AppState::new(config.datasource(backend)));

    let bind = std::env::var("EPD_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let listener = TcpListener::bind(&bind).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(routes::handle(&state, req).await) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                log::debug!("Connection from {} closed: {}", peer, e);
            }
        });
    }
}
