//! Backend layer: HTTP and websocket adapters for the platform API.

pub mod http;
pub mod realtime;
pub mod wire;

pub use http::HttpBackend;
pub use realtime::{MonitorSignal, RealtimeMonitor};

/// Returns the backend module name for smoke checks.
pub fn module_name() -> &'static str {
    "backend"
}
