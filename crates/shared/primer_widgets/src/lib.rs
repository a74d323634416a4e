//! Scripted simulation widgets for the interactive explainers.
//!
//! Every widget here is a plain state machine over author-supplied data:
//! callers feed it commands (or timer ticks) and read back snapshots. Nothing
//! in this crate sleeps, spawns or touches I/O; scheduling is the host's job
//! (see `primerd`), and the host proves tick freshness with [`schedule::Epoch`].

pub mod grid_world;
pub mod reveal;
pub mod schedule;
pub mod scripted;
pub mod stats;
pub mod thought_tree;
pub mod typewriter;
