use axum::routing::get;
use clap::{Parser, ValueHint};
use log::LevelFilter;
use std::num::{NonZeroU16, NonZeroU64};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;

#[cfg_attr(not(feature = "hardware"), allow(dead_code))] // the driver needs `hardware`
mod dht11;
mod pages;
mod process;
mod routes;
mod sensor;

#[tokio::main(flavor = "current_thread")] // single-threaded
async fn main() -> std::io::Result<()> {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .filter(Some("tower_http"), LevelFilter::Debug)
        .filter(Some("remote_lab_server"), LevelFilter::Debug)
        .parse_default_env()
        .init();

    let CliArgs {
        host,
        port,
        python_path,
        timeout,
        sensor_pin,
        simulate_sensor,
    } = CliArgs::parse();

    log::info!(
        version = env!("CARGO_PKG_VERSION"),
        api_version = remote_lab_api::api::VERSION;
        "Initializing server"
    );

    // Create the server working directory
    tokio::fs::create_dir_all(process::working_directory()).await?;

    let lab = routes::Lab {
        interpreter: process::Interpreter {
            program: python_path,
            timeout: timeout.map(|secs| Duration::from_secs(secs.get())),
        },
        sensor: sensor::connect(sensor_pin, simulate_sensor),
    };
    log::info!(interpreter:debug = lab.interpreter; "lab configured");

    let router = routes::routes(Arc::new(lab))
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!(
        addr:display = host,
        port = port;
        "listening to TCP"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

#[derive(Parser)]
struct CliArgs {
    /// The host address for the remote lab server.
    #[arg(
        long,
        value_name = "URI",
        value_hint = ValueHint::Hostname,
        default_value = "0.0.0.0",
        env = "REMOTE_LAB_HOST",
    )]
    host: String,
    /// The host port for the remote lab server.
    #[arg(
        short,
        long,
        value_name = "PORT",
        value_hint = ValueHint::Other,
        default_value = "8080",
        env = "REMOTE_LAB_PORT",
    )]
    port: NonZeroU16,
    /// The python interpreter submitted code is run with.
    #[arg(
        long,
        value_name = "PATH",
        value_hint = ValueHint::CommandName,
        default_value = "python3",
        env = "REMOTE_LAB_PYTHON",
    )]
    python_path: PathBuf,
    /// Kill submitted code after this many seconds. Runs unbounded if unset.
    #[arg(long, value_name = "SECONDS", env = "REMOTE_LAB_TIMEOUT")]
    timeout: Option<NonZeroU64>,
    /// BCM number of the GPIO pin the DHT11 data line is wired to.
    #[arg(long, value_name = "PIN", default_value = "4", env = "REMOTE_LAB_SENSOR_PIN")]
    sensor_pin: u8,
    /// Answer temperature requests with a fixed reading instead of asking the sensor.
    #[arg(long, env = "REMOTE_LAB_SIMULATE_SENSOR")]
    simulate_sensor: bool,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT (ctrl+c) handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => log::info!("received SIGINT (ctrl+c), shutting down"),
        () = terminate => log::info!("received SIGTERM, shutting down"),
    }
}
