use crate::registry::Router;
use crate::session::Session;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinSet;

/// TCP acceptor: one session task per accepted connection.
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
}

impl Server {
    pub async fn bind(addr: SocketAddr, router: Arc<Router>) -> io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Server { listener, router })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts until `shutdown` resolves, then drains in-flight sessions.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let _ = stream.set_nodelay(true);
                            let router = self.router.clone();
                            sessions.spawn(Session::new(stream, peer, router).run());
                        }
                        Err(err) => {
                            tracing::warn!(%err, "accept failed");
                            continue;
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received, stopping server");
                    break;
                }
            }
            // Reap finished sessions so the set stays bounded.
            while sessions.try_join_next().is_some() {}
        }

        while sessions.join_next().await.is_some() {}
    }
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
