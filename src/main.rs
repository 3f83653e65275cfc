use shrike::config;
use shrike::fs::DiskFs;
use shrike::registry::{register_builtin_handlers, Router};
use shrike::server::{shutdown_signal, Server};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt().init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "shrike".to_string());
    let config_path = match (args.next(), args.next()) {
        (Some(path), None) => path,
        _ => {
            eprintln!("usage: {} <config_path>", program);
            std::process::exit(1);
        }
    };

    if let Err(err) = run(&config_path) {
        tracing::error!(%err, "startup failed");
        std::process::exit(1);
    }
}

fn run(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    register_builtin_handlers();

    let root = config::parse_file(config_path)?;
    let port = config::listen_port(&root)?;
    let router = Arc::new(Router::from_config(&root, Arc::new(DiskFs))?);

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(2);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let server = Server::bind(addr, router).await?;
        tracing::info!(port, "server listening");
        server.run(shutdown_signal()).await;
        Ok::<(), std::io::Error>(())
    })?;

    tracing::info!("server shutdown complete");
    Ok(())
}
