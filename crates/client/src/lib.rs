//! agentdeck Client
//!
//! Maintains a live event channel to one coding-agent session, degrades
//! to a one-way fallback stream when that channel keeps failing, folds
//! the event stream into a small lifecycle state machine, and correlates
//! human approve/deny decisions to the exact tool invocation that
//! requested them.

pub mod api;
pub mod approvals;
pub mod config;
pub mod connection;
pub mod error;
pub mod projector;
pub mod sse;

pub use api::{ApprovalService, SessionApi};
pub use approvals::{ApprovalCorrelator, Decision, ResolveOutcome};
pub use config::ClientConfig;
pub use connection::{ConnectionManager, ConnectionState, StreamNotice};
pub use error::ClientError;
pub use projector::SessionProjection;
