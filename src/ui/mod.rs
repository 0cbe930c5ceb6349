//! UI layer: HTML rendering and the local dashboard server.

pub mod render;
pub mod server;

/// Returns the ui module name for smoke checks.
pub fn module_name() -> &'static str {
    "ui"
}
