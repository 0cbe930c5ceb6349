//! Domain layer: core entities and view-state machines.

pub mod directory;
pub mod dm_list;
pub mod events;
pub mod message;
pub mod navigation;
pub mod stream;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
