//! World-state save core: snapshot capture, encrypted persistence, and
//! reconciliation of a saved snapshot against a freshly loaded scene.

pub mod clock;
pub mod codec;
pub mod collaborator;
pub mod config;
pub mod coordinator;
pub mod crypto;
pub mod error;
pub mod event;
pub mod memory_world;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod types;
