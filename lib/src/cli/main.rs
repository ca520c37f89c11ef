// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Hardware wallet daemon, serving the REST API for USB and emulator devices

use std::{net::SocketAddr, sync::Arc, time::Duration};

use clap::Parser;
use log::{debug, error, info, warn, LevelFilter};
use tokio::net::TcpListener;

use hw_daemon::{
    api::{self, ApiState, ServerConfig},
    csrf::CsrfTokens,
    transport::{EmulatorConnector, GenericConnector, UsbConnector, EMULATOR_PORT},
    GenericHandle, Gateway,
};

/// Hardware wallet daemon
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Address to listen on
    #[clap(long, env = "HW_DAEMON_LISTEN", default_value = api::DEFAULT_LISTEN)]
    listen: SocketAddr,

    /// Disable CSRF token checks on state-changing requests
    #[clap(long, env = "HW_DAEMON_DISABLE_CSRF")]
    disable_csrf: bool,

    /// Disable Host, Origin and Referer header checks
    #[clap(long, env = "HW_DAEMON_DISABLE_HEADER_CHECK")]
    disable_header_check: bool,

    /// Additional hosts to accept in Host, Origin and Referer headers
    #[clap(long, env = "HW_DAEMON_HOST_WHITELIST", value_delimiter = ',')]
    host_whitelist: Vec<String>,

    /// Emulator UDP address
    #[clap(long, env = "HW_DAEMON_EMULATOR_ADDR", default_value_t = SocketAddr::from(([127, 0, 0, 1], EMULATOR_PORT)))]
    emulator_addr: SocketAddr,

    /// Timeout for the device to yield after a cancellation
    #[clap(long, default_value = "10")]
    user_timeout_s: u64,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    debug!("Options: {:?}", args);

    // Setup device sessions, these connect on first use
    let user_timeout = Duration::from_secs(args.user_timeout_s);
    let usb = GenericHandle::from(GenericConnector::Usb(UsbConnector))
        .with_user_timeout(user_timeout);
    let emulator = GenericHandle::from(GenericConnector::Emulator(EmulatorConnector {
        addr: args.emulator_addr,
    }))
    .with_user_timeout(user_timeout);

    let csrf = match args.disable_csrf {
        true => {
            warn!("CSRF check disabled");
            None
        }
        false => Some(Arc::new(CsrfTokens::new())),
    };

    if args.disable_header_check {
        warn!("Host, Origin and Referer header checks disabled");
    }

    let state = ApiState {
        usb: Gateway::new(Arc::new(usb)),
        emulator: Gateway::new(Arc::new(emulator)),
        csrf,
    };

    let config = ServerConfig {
        host: args.listen.to_string(),
        host_whitelist: args.host_whitelist,
        header_check: !args.disable_header_check,
    };

    let app = api::router(config, state);

    // Start HTTP server
    let listener = TcpListener::bind(args.listen).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Daemon stopped");

    Ok(())
}

/// Resolves on ctrl-c
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    info!("Shutting down");
}
