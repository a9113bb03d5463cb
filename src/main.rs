//! # Service Lifecycle Demo
//!
//! Runs a small process under the orchestrator:
//!
//! - a hook service that logs its identity on init and a farewell on fini
//! - an HTTP service answering `GET /` with a greeting and the process name
//!
//! ```bash
//! RUST_LOG=info cargo run -- --cluster world100 --index 1 --port 8080 --greeting hi
//! kill -TERM $(cat /tmp/service-lifecycle-demo1.pid)
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;

use axum::routing::get;
use axum::Router;
use service_lifecycle::adapters::{HookService, HttpService};
use service_lifecycle::config::{AppConfig, ArgSpec, ArgsParser};
use service_lifecycle::framework::{AppError, ConfigError, ServiceError};
use service_lifecycle::lifecycle::setup_tracing;
use service_lifecycle::App;
use tracing::{error, info};

fn main() -> ExitCode {
    let parser = ArgsParser::new("service-lifecycle-demo")
        .with_arg(ArgSpec::string("greeting", "hello", "Greeting served on GET /"))
        .with_arg(ArgSpec::int("port", 8080, "HTTP listen port"))
        .with_arg(ArgSpec::bool("signals", true, "Handle SIGINT/SIGTERM"));

    let args = match parser.parse() {
        Ok(args) => args,
        Err(ConfigError::Args(e)) => e.exit(),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let config = match AppConfig::from_args(&args) {
        Ok(config) => config.with_signal_handling(args.get_bool("signals").unwrap_or(true)),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    setup_tracing(&config.log_filter);

    let mut app = App::new();
    if let Err(e) = app.init(config) {
        error!(error = %e, "Startup aborted");
        return ExitCode::FAILURE;
    }
    info!(
        cluster = app.cluster(),
        index = app.index(),
        process = app.process_name(),
        "Identity resolved"
    );

    let greeting = args.get_string("greeting").unwrap_or("hello").to_string();
    let port = match u16::try_from(args.get_int("port").unwrap_or(8080)) {
        Ok(port) => port,
        Err(_) => {
            error!("--port must be between 0 and 65535");
            return ExitCode::FAILURE;
        }
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    app.register(
        HookService::new("identity", |ctx| {
            info!(cluster = ctx.cluster(), index = ctx.index(), "Demo init");
            Ok(())
        })
        .on_fini(|| {
            info!("Demo fini");
            Ok::<(), ServiceError>(())
        }),
    );
    app.register(HttpService::with_routes("http", addr, move |ctx| {
        let body = format!("{greeting} from {}\n", ctx.process_name());
        Ok(Router::new().route("/", get(move || async move { body })))
    }));

    match app.run_blocking(Vec::new()) {
        Ok(()) => {
            info!("Process exiting");
            ExitCode::SUCCESS
        }
        Err(e @ AppError::ServiceInit { .. }) | Err(e @ AppError::ServiceServe { .. }) => {
            error!(service = e.service().unwrap_or_default(), error = %e, "Service failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
