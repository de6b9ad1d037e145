//! The imgFS HTTP server binary: opens a store file and serves it over
//! HTTP until interrupted.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use imgfs::http::{self, dispatch::AppState};
use imgfs::store::StoreFile;

const DEFAULT_PORT: u16 = 8000;

#[derive(Parser)]
#[command(name = "imgfs_server", about = "Serve an imgFS store over HTTP")]
struct Args {
    /// Path to an existing imgFS store file.
    imgfs_filename: String,

    /// Port to listen on.
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let store = match StoreFile::open(&args.imgfs_filename) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, file = %args.imgfs_filename, "failed to open imgFS store");
            return ExitCode::from(e.kind.exit_code() as u8);
        }
    };
    info!(
        name = store.header.name_str(),
        files = store.header.nb_files,
        max_files = store.header.max_files,
        "opened imgFS store"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build Tokio runtime");

    runtime.block_on(async move {
        let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) => {
                error!(error = %e, %addr, "failed to bind listening socket");
                return ExitCode::from(imgfs::ErrorKind::Io.exit_code() as u8);
            }
        };

        let state = Arc::new(AppState::new(store));
        http::run(listener, state).await;
        info!("server shutdown complete");
        ExitCode::SUCCESS
    })
}
