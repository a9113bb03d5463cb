//! HTTP service on top of axum.
//!
//! The router is either supplied up front or built during `on_init`, when the
//! process identity is known. Serving runs `axum::serve` with graceful
//! shutdown on a spawned task; `close` fires the graceful shutdown and the
//! App's wait phase drains once in-flight requests finish.

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

use crate::adapters::BoundAddr;
use crate::framework::{Service, ServiceContext, ServiceError};

type RouterBuilder = Box<dyn FnOnce(&ServiceContext) -> Result<Router, ServiceError> + Send + Sync>;

enum Routes {
    Ready(Router),
    Deferred(RouterBuilder),
}

pub struct HttpService {
    name: String,
    addr: SocketAddr,
    routes: Option<Routes>,
    router: Option<Router>,
    listener: Option<TcpListener>,
    bound: BoundAddr,
    ctx: Option<ServiceContext>,
    stop: Option<oneshot::Sender<()>>,
}

impl HttpService {
    pub fn new(name: impl Into<String>, addr: SocketAddr, router: Router) -> Self {
        Self::with_routes_source(name.into(), addr, Routes::Ready(router))
    }

    /// Builds the router in `on_init`; an error aborts the init phase.
    pub fn with_routes<F>(name: impl Into<String>, addr: SocketAddr, build: F) -> Self
    where
        F: FnOnce(&ServiceContext) -> Result<Router, ServiceError> + Send + Sync + 'static,
    {
        Self::with_routes_source(name.into(), addr, Routes::Deferred(Box::new(build)))
    }

    fn with_routes_source(name: String, addr: SocketAddr, routes: Routes) -> Self {
        Self {
            name,
            addr,
            routes: Some(routes),
            router: None,
            listener: None,
            bound: BoundAddr::default(),
            ctx: None,
            stop: None,
        }
    }

    pub fn bound_addr(&self) -> BoundAddr {
        self.bound.clone()
    }
}

#[async_trait]
impl Service for HttpService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_init(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError> {
        let router = match self.routes.take() {
            Some(Routes::Ready(router)) => router,
            Some(Routes::Deferred(build)) => build(ctx)?,
            None => return Err(ServiceError::Custom("routes already consumed".into())),
        };

        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServiceError::Bind {
                addr: self.addr,
                source,
            })?;
        let local = listener.local_addr()?;
        self.bound.set(local);
        info!(service = %self.name, address = %local, "HTTP listening");

        self.router = Some(router);
        self.listener = Some(listener);
        self.ctx = Some(ctx.clone());
        Ok(())
    }

    async fn serve(&mut self) -> Result<(), ServiceError> {
        let (Some(listener), Some(router), Some(ctx)) =
            (self.listener.take(), self.router.take(), self.ctx.as_ref())
        else {
            return Err(ServiceError::NotInitialized("http listener not bound"));
        };

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        self.stop = Some(stop_tx);

        ctx.spawn(format!("{}-http", self.name), async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.await;
                })
                .await
                .map_err(ServiceError::from)
        });
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    async fn on_fini(&mut self) -> Result<(), ServiceError> {
        self.listener = None;
        self.router = None;
        info!(service = %self.name, "HTTP service finalized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ActiveWaiters, Shutdown};
    use axum::routing::get;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn get_root(addr: SocketAddr) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_deferred_routes_see_context() {
        let waiters = ActiveWaiters::new();
        let ctx = ServiceContext::new("world", 2, "web2", Shutdown::new(), waiters.clone());
        let mut svc = HttpService::with_routes("web", "127.0.0.1:0".parse().unwrap(), |ctx| {
            let body = format!("hello from {}", ctx.process_name());
            Ok(Router::new().route("/", get(move || async move { body })))
        });
        let bound = svc.bound_addr();

        svc.on_init(&ctx).await.unwrap();
        svc.serve().await.unwrap();

        let response = get_root(bound.get().unwrap()).await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.ends_with("hello from web2"), "{response}");

        svc.close().await;
        tokio::time::timeout(Duration::from_secs(5), waiters.drained())
            .await
            .expect("server should shut down");
        svc.on_fini().await.unwrap();
    }

    #[tokio::test]
    async fn test_router_builder_error_fails_init() {
        let ctx = ServiceContext::new("world", 2, "web2", Shutdown::new(), ActiveWaiters::new());
        let mut svc = HttpService::with_routes("web", "127.0.0.1:0".parse().unwrap(), |_| {
            Err(ServiceError::Custom("no routes".into()))
        });
        assert!(svc.on_init(&ctx).await.is_err());
        assert!(svc.bound_addr().get().is_none());
    }
}
