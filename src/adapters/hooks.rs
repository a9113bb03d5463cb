//! Closure-backed service.
//!
//! For programs whose "service" is just some setup and teardown code:
//!
//! ```ignore
//! let svc = HookService::new("cache", |ctx| {
//!         info!(cluster = ctx.cluster(), "warming cache");
//!         Ok(())
//!     })
//!     .on_fini(|| { flush(); Ok(()) });
//! ```

use async_trait::async_trait;

use crate::framework::{Service, ServiceContext, ServiceError};

type ContextHook = Box<dyn FnMut(&ServiceContext) -> Result<(), ServiceError> + Send + Sync>;
type CloseHook = Box<dyn FnMut() + Send + Sync>;
type FiniHook = Box<dyn FnMut() -> Result<(), ServiceError> + Send + Sync>;

pub struct HookService {
    name: String,
    init: ContextHook,
    serve: Option<ContextHook>,
    close: Option<CloseHook>,
    fini: Option<FiniHook>,
    ctx: Option<ServiceContext>,
    closed: bool,
}

impl HookService {
    /// The init hook is mandatory; every other hook defaults to a no-op.
    pub fn new<F>(name: impl Into<String>, init: F) -> Self
    where
        F: FnMut(&ServiceContext) -> Result<(), ServiceError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            init: Box::new(init),
            serve: None,
            close: None,
            fini: None,
            ctx: None,
            closed: false,
        }
    }

    /// Runs during the serve phase. Use [`ServiceContext::spawn`] for long work.
    pub fn on_serve<F>(mut self, serve: F) -> Self
    where
        F: FnMut(&ServiceContext) -> Result<(), ServiceError> + Send + Sync + 'static,
    {
        self.serve = Some(Box::new(serve));
        self
    }

    /// Runs at most once, however many times the service is closed.
    pub fn on_close<F>(mut self, close: F) -> Self
    where
        F: FnMut() + Send + Sync + 'static,
    {
        self.close = Some(Box::new(close));
        self
    }

    pub fn on_fini<F>(mut self, fini: F) -> Self
    where
        F: FnMut() -> Result<(), ServiceError> + Send + Sync + 'static,
    {
        self.fini = Some(Box::new(fini));
        self
    }
}

#[async_trait]
impl Service for HookService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_init(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError> {
        (self.init)(ctx)?;
        self.ctx = Some(ctx.clone());
        Ok(())
    }

    async fn serve(&mut self) -> Result<(), ServiceError> {
        let Some(serve) = self.serve.as_mut() else {
            return Ok(());
        };
        let ctx = self
            .ctx
            .as_ref()
            .ok_or(ServiceError::NotInitialized("serve before on_init"))?;
        serve(ctx)
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(close) = self.close.as_mut() {
            close();
        }
    }

    async fn on_fini(&mut self) -> Result<(), ServiceError> {
        match self.fini.as_mut() {
            Some(fini) => fini(),
            None => Ok(()),
        }
    }
}
