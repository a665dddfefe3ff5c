use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::ServerConfig;
use crate::error::Fault;
use crate::protocol;

mod connection;

/// How long an accepted connection may wait for a free slot before it is
/// turned away.
const PERMIT_GRACE: Duration = Duration::from_secs(2);

/// Opens the catalog, binds the port, and serves until SIGINT/SIGTERM.
pub async fn run(config: ServerConfig) -> Result<(), Fault> {
    let server = Server::bind(config).await?;
    server.serve().await
}

pub struct Server {
    listener: TcpListener,
    catalog: Arc<Catalog>,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Opens the read-only catalog and binds the listener. Either failing
    /// is a startup fault that should end the process.
    pub async fn bind(config: ServerConfig) -> Result<Server, Fault> {
        let catalog = Catalog::open(&config.database, config.max_clients as u32).await?;
        info!("opened catalog {}", config.database.display());

        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let server = Server {
            listener,
            catalog: Arc::new(catalog),
            config: Arc::new(config),
        };
        info!("listening on {}", server.local_addr()?);
        Ok(server)
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn serve(self) -> Result<(), Fault> {
        self.serve_until(shutdown_signal()).await
    }

    /// Accept loop. Each connection runs in its own task holding one of
    /// `max_clients` permits; a connection that cannot get a permit within
    /// the grace window is sent a best-effort sentinel and dropped. Once
    /// `shutdown` completes the listener closes, in-flight handlers are
    /// aborted, and this returns when every permit is back.
    pub async fn serve_until(self, shutdown: impl Future<Output = ()>) -> Result<(), Fault> {
        let Server {
            listener,
            catalog,
            config,
        } = self;
        let semaphore = Arc::new(Semaphore::new(config.max_clients));
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("accept failed: {e}");
                            continue;
                        }
                    };

                    let permit = match timeout(PERMIT_GRACE, semaphore.clone().acquire_owned()).await {
                        Ok(Ok(permit)) => permit,
                        Ok(Err(_)) => unreachable!("semaphore closed"),
                        Err(_) => {
                            warn!(
                                "refusing {addr}: {} connections already in flight",
                                config.max_clients
                            );
                            let _ = stream.try_write(format!("{}\n", protocol::SYSTEM_ERROR).as_bytes());
                            continue;
                        }
                    };

                    info!("accepted connection from {addr}");
                    let catalog = Arc::clone(&catalog);
                    let config = Arc::clone(&config);
                    let mut aborted = shutdown_tx.subscribe();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = connection::handle_connection(stream, catalog, config) => {
                                info!("closed connection from {addr}");
                            }
                            _ = aborted.recv() => {
                                info!("dropped connection from {addr} for shutdown");
                            }
                        }
                        drop(permit);
                    });
                }
            }
        }

        drop(listener);
        let _ = shutdown_tx.send(());
        // every handler holds one permit; getting them all back means the
        // last connection is gone
        let _ = semaphore.acquire_many(config.max_clients as u32).await;
        info!("all connections closed");
        Ok(())
    }
}

/// Completes on SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
