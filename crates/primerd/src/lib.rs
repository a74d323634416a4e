//! primerd - widget host for the interactive explainers
//!
//! Each connected UI client gets its own [`session::WidgetSession`]: a private
//! copy of every scripted widget plus the timers that drive the self-consistency
//! reveal and the chain-of-thought typewriter. Nothing is shared between
//! clients and nothing is persisted; disconnecting tears the session down and
//! cancels its timers.
//!
//! Wire format is newline-delimited JSON (see [`protocol`]).

pub mod config;
pub mod error;
pub mod paths;
pub mod protocol;
pub mod server;
pub mod session;
pub mod timers;
