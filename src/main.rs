use std::io;

use actix_web::{web, App, HttpServer};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use paillier_pet::paillier::keys::{Keypair, DEFAULT_KEY_SIZE};
use paillier_pet::protocol::{ProtocolOptions, DEFAULT_KAPPA};
use paillier_pet::server::{routes, ServerState};

/// Paillier encryption and private equality test over HTTP.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1:8085")]
    listen: String,

    /// Modulus size in bits, for the host key and as the default for equality sessions.
    #[arg(long, default_value_t = DEFAULT_KEY_SIZE)]
    keysize: usize,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let keypair = Keypair::generate(cli.keysize).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let state = web::Data::new(ServerState {
        keypair,
        session_options: ProtocolOptions { kappa: DEFAULT_KAPPA, keysize: cli.keysize },
    });

    info!(listen = %cli.listen, keysize = cli.keysize, "starting server");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind(cli.listen.as_str())?
        .run()
        .await
}
