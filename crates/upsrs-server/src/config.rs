//! Server configuration.

use clap::Parser;

/// UPSRS worklist server command line arguments.
#[derive(Debug, Parser)]
#[command(name = "upsrs-server")]
#[command(about = "DICOM UPS-RS worklist server")]
pub struct Args {
    /// Address to listen on for HTTP and WebSocket requests.
    #[arg(short, long, env = "UPSRS_LISTEN", default_value = "0.0.0.0:8104")]
    pub listen: String,

    /// Per-subscriber cap on queued events while no channel is open.
    #[arg(long, env = "UPSRS_PENDING_CAP", default_value_t = 1024)]
    pub pending_cap: usize,

    /// Announce a cold-start restart to each subscriber on first connect.
    #[arg(long, env = "UPSRS_ANNOUNCE_RESTART", default_value_t = false)]
    pub announce_restart: bool,

    /// Enable permissive CORS for browser clients.
    #[arg(long, env = "UPSRS_CORS", default_value_t = false)]
    pub cors: bool,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub listen_addr: String,
    /// Per-subscriber pending-event cap.
    pub pending_cap: usize,
    /// Whether to emit an SCP status-change event on first connect.
    pub announce_restart: bool,
    /// Whether to enable permissive CORS.
    pub cors: bool,
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            listen_addr: args.listen.clone(),
            pending_cap: args.pending_cap,
            announce_restart: args.announce_restart,
            cors: args.cors,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8104".to_string(),
            pending_cap: 1024,
            announce_restart: false,
            cors: false,
        }
    }
}
