//! Traffic server
//!
//! Ties the fan-out core to HTTP: binds the listener, runs the periodic
//! poller for the lifetime of the server and serves the router.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;

use super::config::ServerConfig;
use super::routes;
use super::state::AppState;
use crate::broadcast::Broadcaster;
use crate::error::Result;
use crate::ingest::Ingestor;
use crate::poller::Poller;
use crate::registry::SubscriberRegistry;
use crate::store::TrafficStore;

/// Traffic update server
pub struct TrafficServer {
    config: ServerConfig,
    store: Arc<dyn TrafficStore>,
    registry: Arc<SubscriberRegistry>,
    broadcaster: Arc<Broadcaster>,
    ingestor: Ingestor,
}

impl TrafficServer {
    /// Create a new server backed by `store`
    pub fn new(config: ServerConfig, store: Arc<dyn TrafficStore>) -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = Arc::new(Broadcaster::with_config(
            Arc::clone(&registry),
            config.broadcast.clone(),
        ));
        let ingestor = Ingestor::new(Arc::clone(&store), Arc::clone(&broadcaster));

        Self {
            config,
            store,
            registry,
            broadcaster,
            ingestor,
        }
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get a reference to the broadcaster
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Get the ingestion hook
    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Build the router without serving it
    ///
    /// WebSocket connections end when `closing` flips to `true` or its
    /// sender is dropped.
    pub fn router(&self, closing: watch::Receiver<bool>) -> Router {
        let state = AppState::new(
            Arc::clone(&self.registry),
            self.ingestor.clone(),
            self.config.latest_default_limit,
            self.config.max_connections,
            closing,
        );
        routes::router(state)
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.run_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// The poller runs for exactly as long as the listener does. On shutdown
    /// every WebSocket subscriber is told to close before in-flight requests
    /// are drained.
    pub async fn run_on<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Traffic server listening");

        let mut poller = Poller::new(
            Arc::clone(&self.store),
            Arc::clone(&self.broadcaster),
            self.config.poller.clone(),
        );
        poller.start();

        let (closing_tx, closing_rx) = watch::channel(false);
        let app = self.router(closing_rx);

        let signal_tx = closing_tx.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
                let _ = signal_tx.send(true);
            })
            .await;

        poller.stop().await;
        drop(closing_tx);

        tracing::info!(
            subscribers = self.registry.len(),
            "Traffic server stopped"
        );

        result.map_err(Into::into)
    }
}

impl std::fmt::Debug for TrafficServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficServer")
            .field("config", &self.config)
            .field("subscribers", &self.registry.len())
            .finish()
    }
}
