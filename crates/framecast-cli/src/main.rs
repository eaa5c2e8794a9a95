//! Frame server executable.
//!
//! Binds the configured port over a virtual camera and serves until
//! Ctrl-C. Exit code 0 on clean shutdown, 1 on startup failure.

use anyhow::Context;
use argh::FromArgs;
use framecast_camera::{Camera, CameraMonitor};
use framecast_core::constants::DEFAULT_PORT;
use framecast_server::{App, ServerConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs, Debug)]
/// TCP frame server exposing an industrial camera to multiple clients.
struct Args {
    /// port to listen on (default 15099)
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// address to bind (default 0.0.0.0)
    #[argh(option, default = "String::from(\"0.0.0.0\")")]
    bind: String,

    /// socket read timeout in seconds, 0 waits forever (default 0)
    #[argh(option, default = "0")]
    read_timeout: u64,

    /// camera status log interval in seconds, 0 disables (default 0)
    #[argh(option, default = "0")]
    monitor_interval: u64,

    /// log filter in RUST_LOG syntax (default "info")
    #[argh(option, default = "String::from(\"info\")")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bind_addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .context("invalid bind address")?;
    let config = ServerConfig {
        bind_addr,
        read_timeout: (args.read_timeout > 0).then(|| Duration::from_secs(args.read_timeout)),
    };

    let camera = Camera::virtual_camera();
    info!(camera = %camera.status_summary().await, "camera ready");

    let monitor = (args.monitor_interval > 0).then(|| {
        CameraMonitor::start(
            camera.clone(),
            Duration::from_secs(args.monitor_interval),
        )
    });

    let app = App::start_with_camera(config, camera)
        .await
        .context("server startup failed")?;
    info!(addr = %app.local_addr(), "serving, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to install shutdown signal handler")?;
    info!("shutdown requested");

    app.stop().await;
    if let Some(monitor) = monitor {
        monitor.stop().await;
    }
    Ok(())
}
