//! Permissive frame codec
//!
//! The streaming channel is best-effort telemetry, not a transactional
//! log: malformed frames, unknown tags, and frames missing required
//! fields are all dropped. Nothing in here returns an error.

use crate::event::{ControlFrame, StreamEvent};

/// Decode a raw text frame into a [`StreamEvent`].
///
/// Returns `None` for anything that is not a well-formed frame with a
/// known tag and its required fields. Unknown extra fields on a known
/// tag are tolerated for forward compatibility.
pub fn decode(raw: &str) -> Option<StreamEvent> {
    serde_json::from_str(raw).ok()
}

/// Encode an event back to its wire form.
///
/// Serialization of these types cannot fail; used by tests and by
/// tooling that replays captured streams.
pub fn encode(event: &StreamEvent) -> String {
    serde_json::to_string(event).unwrap_or_default()
}

/// Encode an outbound control frame.
pub fn encode_control(frame: &ControlFrame) -> String {
    serde_json::to_string(frame).unwrap_or_default()
}
