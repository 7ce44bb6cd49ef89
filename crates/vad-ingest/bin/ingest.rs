//! Ingestion binary entry point.
//!
//! Binds the configured transport, runs the pipeline until interrupted,
//! and exits 0 on clean shutdown / non-zero on startup failure.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vad_ingest::{Config, Pipeline, Shutdown};

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    let shutdown = Shutdown::new();
    install_signal_handler(&shutdown);

    let mut pipeline = Pipeline::bind(config)?;
    if let Some(addr) = pipeline.local_addr() {
        info!(%addr, "listening");
    }

    pipeline.run(&shutdown)?;
    info!("clean shutdown");
    Ok(())
}

#[cfg(unix)]
fn install_signal_handler(shutdown: &Shutdown) {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    // Signal handlers cannot capture state, so a static flag bridges the
    // handler to the pipeline's shutdown handle via a watcher thread.
    static SIGNALLED: AtomicBool = AtomicBool::new(false);

    extern "C" fn on_signal(_sig: libc::c_int) {
        SIGNALLED.store(true, Ordering::Release);
    }

    let handler = on_signal as extern "C" fn(libc::c_int);
    // SAFETY: on_signal is async-signal-safe (a single atomic store).
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }

    let shutdown = shutdown.clone();
    std::thread::spawn(move || {
        while !SIGNALLED.load(Ordering::Acquire) {
            if shutdown.is_requested() {
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        info!("signal received, shutting down");
        shutdown.request();
    });
}

#[cfg(not(unix))]
fn install_signal_handler(_shutdown: &Shutdown) {}
