//! Channel layer: prompt classification over the live byte stream.
//!
//! This module handles the interactive session state, including
//! ordered prompt racing with timeouts and end-of-stream detection.

mod buffer;
mod patterns;
mod session;

pub use buffer::{Hit, PatternBuffer};
pub use patterns::{PromptConfig, PromptKind, PromptPattern, PromptSet};
pub use session::{ExecMode, Expect, PromptMatch, Session};
