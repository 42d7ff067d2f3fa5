//! ModelStore integration tests.
//!
//! - CRUD and snapshot queries
//! - Last-writer-wins merge
//! - Flush/reload sync cycles against a recording database
//! - Background worker, file persistence and change events

mod support;
mod crud;
#[cfg(feature = "emitter")]
mod events;
mod merge;
