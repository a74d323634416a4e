//! primerd - background host for the interactive explainer widgets
//!
//! Serves the self-consistency reveal, the chain-of-thought typewriter, the
//! tree-of-thoughts view and the grid-world RL loop over newline-delimited
//! JSON on TCP (127.0.0.1:9877 by default).
//!
//! Config locations:
//! - Linux: ~/.local/share/primer/primerd.json
//! - Windows: %APPDATA%\primer\primerd.json
//! - MacOS: ~/Library/Application Support/primer/primerd.json

use primerd::config::DaemonConfig;
use primerd::paths::AppPaths;
use primerd::server;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let paths = AppPaths::new()?;
    let config = DaemonConfig::load(&paths)?;
    info!(
        "Config: listen={} reveal_delay_ms={} typewriter_tick_ms={} (data dir {:?})",
        config.listen_addr,
        config.reveal_delay_ms,
        config.typewriter_tick_ms,
        paths.data_dir()
    );

    tokio::select! {
        res = server::run(config) => {
            if let Err(e) = &res {
                error!("Server stopped: {}", e);
            }
            res?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C: shutting down");
        }
    }

    Ok(())
}
