//! The `hub` module owns the registry of connected clients, the fan-out
//! primitives and the event router.
//!
//! - `event`: the wire envelope and the `Event` sum type
//! - `engine`: the `Hub` registry, its serializing task and `HubHandle`
//! - `router`: per-event state transitions

pub mod engine;
pub mod event;
pub mod router;

pub use engine::{ClientSnapshot, Command, Hub, HubHandle};
pub use event::Event;
