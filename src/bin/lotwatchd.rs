//! lotwatchd - web demo daemon for parking-spot detection
//!
//! This daemon:
//! 1. Loads the demo configuration
//! 2. Serves the demo page and its processing endpoints
//! 3. Runs detection only when asked to via the page

use anyhow::Result;
use std::sync::mpsc;

use lotwatch::{source_available, DemoConfig, DemoServer};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DemoConfig::load()?;
    if !source_available(&config.video_path) {
        log::warn!(
            "video {} not found; the page will show an error until it appears",
            config.video_path
        );
    }

    let video_path = config.video_path.clone();
    let handle = DemoServer::new(config).spawn()?;
    log::info!("demo page listening on http://{}", handle.addr);
    log::info!("lotwatchd running. serving {}", video_path);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("lotwatchd waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping demo server...");
    handle.stop()?;

    Ok(())
}
