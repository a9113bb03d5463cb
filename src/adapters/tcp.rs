//! TCP accept-loop service.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::adapters::BoundAddr;
use crate::framework::{Service, ServiceContext, ServiceError};

type Handler =
    Arc<dyn Fn(TcpStream, SocketAddr) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Binds in `on_init`, accepts in a spawned loop during `serve`, and hands
/// every connection to the handler on its own task. `close` stops accepting;
/// connections already handed off are not tracked.
pub struct TcpService {
    name: String,
    addr: SocketAddr,
    handler: Handler,
    bound: BoundAddr,
    accepted: Arc<AtomicU64>,
    listener: Option<TcpListener>,
    ctx: Option<ServiceContext>,
    stop: Option<oneshot::Sender<()>>,
}

impl TcpService {
    pub fn new<H, Fut>(name: impl Into<String>, addr: SocketAddr, handler: H) -> Self
    where
        H: Fn(TcpStream, SocketAddr) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            addr,
            handler: Arc::new(
                move |stream: TcpStream, peer: SocketAddr| -> Pin<Box<dyn Future<Output = ()> + Send>> {
                    Box::pin(handler(stream, peer))
                },
            ),
            bound: BoundAddr::default(),
            accepted: Arc::new(AtomicU64::new(0)),
            listener: None,
            ctx: None,
            stop: None,
        }
    }

    pub fn bound_addr(&self) -> BoundAddr {
        self.bound.clone()
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Service for TcpService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_init(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServiceError::Bind {
                addr: self.addr,
                source,
            })?;
        let local = listener.local_addr()?;
        self.bound.set(local);
        info!(service = %self.name, address = %local, "Listening");

        self.listener = Some(listener);
        self.ctx = Some(ctx.clone());
        Ok(())
    }

    async fn serve(&mut self) -> Result<(), ServiceError> {
        let (Some(listener), Some(ctx)) = (self.listener.take(), self.ctx.as_ref()) else {
            return Err(ServiceError::NotInitialized("tcp listener not bound"));
        };

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        self.stop = Some(stop_tx);

        let name = self.name.clone();
        let handler = self.handler.clone();
        let accepted = self.accepted.clone();
        ctx.spawn(format!("{}-accept", self.name), async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    res = listener.accept() => match res {
                        Ok((stream, peer)) => {
                            accepted.fetch_add(1, Ordering::Relaxed);
                            debug!(service = %name, %peer, "Accepted connection");
                            tokio::spawn(handler(stream, peer));
                        }
                        Err(e) => warn!(service = %name, error = %e, "Accept failed"),
                    }
                }
            }
            debug!(service = %name, "Accept loop stopped");
            Ok(())
        });
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    async fn on_fini(&mut self) -> Result<(), ServiceError> {
        // Never served: drop the bound socket here.
        self.listener = None;
        info!(service = %self.name, accepted = self.accepted(), "Listener released");
        Ok(())
    }
}
