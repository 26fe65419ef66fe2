use clap::Parser;
use log::info;

use webd::cli::{self, Args};
use webd::{shutdown_signal, HttpServer, LogSinks};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.version {
        println!("{}", cli::version_text());
        return;
    }

    let logs = LogSinks::stdio();
    let deadline = args.timeout;
    let config = args.into_config(logs.clone());

    let server = match HttpServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            logs.error(format!("error starting server: {e}"));
            return;
        }
    };
    let handle = server.spawn();

    match shutdown_signal().await {
        Ok(name) => info!("Received {name}, initiating graceful shutdown"),
        Err(e) => logs.error(format!("error waiting for shutdown signal: {e}")),
    }

    if let Err(e) = handle.shutdown(deadline).await {
        logs.error(format!("error shutting down server: {e}"));
    }
}
