//! Use case layer: synchronization workflows and the view controller.

pub mod bootstrap;
pub mod bridge;
pub mod channel_sync;
pub mod context;
pub mod contracts;
pub mod controller;
pub mod dm_sync;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
