//! Drivers for the interaction protocol.
//!
//! Each driver is a small state machine over a [`Session`](crate::channel::Session)
//! built on the same ordered prompt race. They are used strictly in
//! sequence for one host: handshake, configuration, capture.

pub mod config_mode;
pub mod handshake;
mod output;
pub mod pager;

pub use config_mode::{Ack, ConfigPlan, StatementResult, apply_config};
pub use handshake::connect;
pub use output::{CapturedOutput, CleanedOutput};
pub use pager::execute;
