use std::path::Path;
use std::sync::OnceLock;

use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, Instrument};

use crate::config::AppConfig;
use crate::framework::{AppError, Service, ServiceContext};
use crate::lifecycle::tracing::AppLogger;
use crate::lifecycle::{spawn_signal_listener, ActiveWaiters, PidFile, Shutdown};

/// The lifecycle orchestrator.
///
/// `App` turns a list of independently initializable [`Service`]s into a
/// single long-running process:
///
/// 1. **Init** - `on_init` on every service in registration order; the first error aborts.
/// 2. **Serve** - `serve` on every service in registration order; the first error aborts.
/// 3. **Wait** - write the pid marker, install the signal bridge, block until shutdown fires.
/// 4. **Finalize** - `close` on every service in reverse order, wait for active
///    waiters to drain, `on_fini` in reverse order, remove the pid marker.
///
/// Failures in phases 1 and 2 are returned as-is. No rollback is performed:
/// services that already initialized (or already serve) are left as they are,
/// and the caller is expected to exit the process.
///
/// # Example
///
/// ```ignore
/// let mut app = App::new();
/// app.init(AppConfig::new().with_cluster("world100").with_index(1))?;
/// app.register(HookService::new("db", |ctx| connect(ctx.cluster())));
/// app.run(Vec::new()).await?;
/// ```
///
/// # Misuse
///
/// Calling [`init`](App::init) twice, calling [`run`](App::run) before `init`,
/// or reading the accessors before `init` panics: these are coding mistakes,
/// not runtime conditions. `run` consumes the App, so it cannot be reused.
pub struct App {
    identity: Option<(String, u32)>,
    config: AppConfig,
    logger: AppLogger,
    shutdown: Shutdown,
    waiters: ActiveWaiters,
    services: Vec<Box<dyn Service>>,
    process_name: OnceLock<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            identity: None,
            config: AppConfig::default(),
            logger: AppLogger::default(),
            shutdown: Shutdown::new(),
            waiters: ActiveWaiters::new(),
            services: Vec::new(),
            process_name: OnceLock::new(),
        }
    }

    /// Applies `config` and validates cluster and index.
    ///
    /// # Panics
    /// If the App was already initialized.
    pub fn init(&mut self, config: AppConfig) -> Result<(), AppError> {
        if self.identity.is_some() {
            panic!("App already initialized");
        }

        self.logger = AppLogger::new(config.sink.clone());
        self.logger.info(format_args!("App start..."));

        let (cluster, index) = config.validate()?;
        info!(%cluster, index, pid_dir = %config.pid_dir.display(), "Configuration applied");

        self.config = config;
        self.identity = Some((cluster, index));
        self.logger.info(format_args!("App init ok."));
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.identity.is_some()
    }

    /// # Panics
    /// Before [`init`](App::init).
    pub fn cluster(&self) -> &str {
        &self.identity().0
    }

    /// # Panics
    /// Before [`init`](App::init).
    pub fn index(&self) -> u32 {
        self.identity().1
    }

    /// Executable base name, suffixed with the index. Computed once.
    ///
    /// Empty if the executable name cannot be determined.
    ///
    /// # Panics
    /// Before [`init`](App::init).
    pub fn process_name(&self) -> &str {
        let index = self.index();
        self.process_name.get_or_init(|| {
            let base = self
                .config
                .process_base
                .clone()
                .or_else(executable_base_name)
                .unwrap_or_default();
            process_name_for(&base, index)
        })
    }

    /// Handle to the shutdown signal; triggering it ends the wait phase.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Appends a service. Registered services run before those passed to `run`.
    pub fn register(&mut self, service: impl Service) -> &mut Self {
        self.services.push(Box::new(service));
        self
    }

    /// Runs the four-phase protocol to completion.
    ///
    /// # Panics
    /// Before [`init`](App::init).
    pub async fn run(mut self, services: Vec<Box<dyn Service>>) -> Result<(), AppError> {
        let (cluster, index) = self.identity().clone();
        let mut all = std::mem::take(&mut self.services);
        all.extend(services);

        let span = info_span!("app", %cluster, index);
        self.run_phases(all).instrument(span).await
    }

    /// Builds a tokio runtime (honoring `worker_threads`) and blocks on [`run`](App::run).
    ///
    /// # Panics
    /// Before [`init`](App::init).
    pub fn run_blocking(self, services: Vec<Box<dyn Service>>) -> Result<(), AppError> {
        self.identity();

        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all();
        if let Some(threads) = self.config.worker_threads.filter(|n| *n > 0) {
            builder.worker_threads(threads);
        }
        let runtime = builder.build().map_err(AppError::Runtime)?;
        runtime.block_on(self.run(services))
    }

    async fn run_phases(self, mut services: Vec<Box<dyn Service>>) -> Result<(), AppError> {
        let ctx = ServiceContext::new(
            self.cluster(),
            self.index(),
            self.process_name(),
            self.shutdown.clone(),
            self.waiters.clone(),
        );

        // Phase 1: init, forward
        for service in services.iter_mut() {
            let name = service.name().to_string();
            debug!(service = %name, phase = "init", "Initializing service");
            if let Err(source) = service.on_init(&ctx).await {
                self.logger
                    .error(format_args!("service {name} init failed: {source}"));
                return Err(AppError::ServiceInit {
                    service: name,
                    source,
                });
            }
        }
        info!(count = services.len(), "All services initialized");

        // Phase 2: serve, forward
        for service in services.iter_mut() {
            let name = service.name().to_string();
            debug!(service = %name, phase = "serve", "Starting service");
            if let Err(source) = service.serve().await {
                self.logger
                    .error(format_args!("service {name} serve failed: {source}"));
                return Err(AppError::ServiceServe {
                    service: name,
                    source,
                });
            }
        }
        info!(count = services.len(), "All services serving");

        // Phase 3: wait
        let pid_written = self.write_pid();
        let listener = self
            .config
            .handle_signals
            .then(|| spawn_signal_listener(self.shutdown.clone(), &self.waiters));

        self.shutdown.wait().await;
        self.logger.info(format_args!(
            "graceful shutdown... ({})",
            self.shutdown
                .reason()
                .map(|r| r.to_string())
                .unwrap_or_default()
        ));

        // Phase 4: finalize, reverse
        for service in services.iter_mut().rev() {
            debug!(service = %service.name(), phase = "close", "Closing service");
            service.close().await;
        }

        self.waiters.drained().await;
        if let Some(handle) = listener {
            join_listener(&self.logger, handle).await;
        }

        for service in services.iter_mut().rev() {
            let name = service.name().to_string();
            debug!(service = %name, phase = "fini", "Finalizing service");
            if let Err(e) = service.on_fini().await {
                self.logger
                    .error(format_args!("service {name} fini failed: {e}"));
            }
        }

        if pid_written {
            self.remove_pid();
        }
        self.logger.info(format_args!("App stopped."));
        Ok(())
    }

    fn write_pid(&self) -> bool {
        let name = self.process_name();
        if name.is_empty() {
            self.logger
                .warn(format_args!("process name unavailable, pid marker skipped"));
            return false;
        }
        match self.pid_file().write(name) {
            Ok(path) => {
                self.logger
                    .info(format_args!("write pid to {}", path.display()));
                true
            }
            Err(e) => {
                self.logger
                    .warn(format_args!("failed to write pid marker for {name}: {e}"));
                false
            }
        }
    }

    fn remove_pid(&self) {
        let name = self.process_name();
        if let Err(e) = self.pid_file().remove(name) {
            self.logger
                .warn(format_args!("failed to remove pid marker for {name}: {e}"));
        }
    }

    fn pid_file(&self) -> PidFile {
        PidFile::new(self.config.pid_dir.clone())
    }

    fn identity(&self) -> &(String, u32) {
        match &self.identity {
            Some(identity) => identity,
            None => panic!("App not initialized: call App::init first"),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

async fn join_listener(logger: &AppLogger, handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        logger.warn(format_args!("signal listener ended abnormally: {e}"));
    }
}

/// `base` for index 0, otherwise `base` immediately followed by the index.
pub fn process_name_for(base: &str, index: u32) -> String {
    if index > 0 {
        format!("{base}{index}")
    } else {
        base.to_string()
    }
}

fn executable_base_name() -> Option<String> {
    let from_args = std::env::args_os().next().and_then(|arg0| {
        Path::new(&arg0)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    });
    from_args
        .or_else(|| {
            std::env::current_exe().ok().and_then(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
        })
        .filter(|name| !name.is_empty())
}
