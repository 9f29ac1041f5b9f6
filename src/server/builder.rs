// src/server/builder.rs
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use hyper::{server::conn::Http, Body, Request, Response};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower::Service;

/// Builder so `main.rs` can inject the request handler and shutdown signal.
pub struct ServerBuilder<H>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    addr: SocketAddr,
    handler: Option<H>,
    shutdown: Option<BoxFuture<'static, ()>>,
    drain_timeout: Duration,
}

impl<H> ServerBuilder<H>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            handler: None,
            shutdown: None,
            drain_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Stop accepting connections once `signal` resolves.
    pub fn with_shutdown<F>(mut self, signal: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shutdown = Some(Box::pin(signal));
        self
    }

    /// How long open connections may take to finish after shutdown.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Bind the TCP listener and serve until shutdown.
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        let handler = self
            .handler
            .context("handler must be set via with_handler()")?;
        let mut shutdown = self
            .shutdown
            .unwrap_or_else(|| Box::pin(futures::future::pending()));

        tracing::info!("HTTP server listening on {}", listener.local_addr()?);

        let (drain_tx, drain_rx) = watch::channel(());
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    let svc = handler.clone();
                    let mut drain = drain_rx.clone();

                    // One task per connection.
                    connections.spawn(async move {
                        let conn = Http::new().serve_connection(stream, svc);
                        tokio::pin!(conn);

                        let result = tokio::select! {
                            res = conn.as_mut() => res,
                            _ = drain.changed() => {
                                // Finish the in-flight response, then close.
                                conn.as_mut().graceful_shutdown();
                                conn.as_mut().await
                            }
                        };
                        if let Err(err) = result {
                            tracing::warn!(%peer, %err, "connection error");
                        }
                    });
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = &mut shutdown => break,
            }
        }

        drop(listener);
        tracing::info!(
            open = connections.len(),
            "HTTP server stopped accepting connections, draining"
        );
        let _ = drain_tx.send(());

        let drained = tokio::time::timeout(self.drain_timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = connections.len(),
                "drain timeout elapsed, aborting open connections"
            );
            connections.abort_all();
        }
        Ok(())
    }
}
