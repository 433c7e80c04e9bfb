//! agentdeck Protocol
//!
//! Shared types for the session streaming channel. Every frame is JSON
//! with a required `type` discriminator; the codec is deliberately
//! permissive — frames it cannot understand are dropped, never errors.

pub mod codec;
pub mod event;
pub mod types;

pub use codec::{decode, encode, encode_control};
pub use event::{ControlFrame, StreamEvent};
pub use types::*;
