//! agentdeck Render
//!
//! Turns unified-diff text and shell command strings into classified,
//! displayable tokens for human safety review. Purely presentational:
//! nothing here ever decides whether an approval is required.

pub mod command;
pub mod diff;

pub use command::{command_hint, highlight_command, CommandToken};
pub use diff::{gutter_width, parse_unified_diff, DiffLine, DiffLineKind};
