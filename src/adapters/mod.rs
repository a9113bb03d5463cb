//! Concrete [`Service`](crate::framework::Service) adapters.
//!
//! - [`HookService`] - setup/teardown closures, no transport.
//! - [`TcpService`] - TCP accept loop handing connections to a handler.
//! - [`HttpService`] - axum router served with graceful shutdown.

pub mod hooks;
pub mod http;
pub mod tcp;

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

pub use hooks::HookService;
pub use http::HttpService;
pub use tcp::TcpService;

/// The address a listener actually bound to, published during `on_init`.
///
/// Useful when binding to port 0: keep a clone before handing the service
/// to the App.
#[derive(Debug, Clone, Default)]
pub struct BoundAddr(Arc<OnceLock<SocketAddr>>);

impl BoundAddr {
    pub fn get(&self) -> Option<SocketAddr> {
        self.0.get().copied()
    }

    pub(crate) fn set(&self, addr: SocketAddr) {
        let _ = self.0.set(addr);
    }
}
