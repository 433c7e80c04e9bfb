//! Stream envelope — server → client events and client → server commands
//!
//! Every server frame carries a required `type` discriminator and an
//! optional `timestamp` (ISO-8601, carried opaque, never parsed). Each
//! tag has a fixed field set; anything else on a frame is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{HistoryMessage, PendingApproval, SessionStatus};

/// Events delivered over the session streaming channel.
///
/// The identical envelope shape flows over both transports: the duplex
/// WebSocket and the one-way SSE fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Init {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Text {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    ToolUse {
        tool_name: String,
        #[serde(default)]
        tool_input: HashMap<String, Value>,
        tool_use_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    ToolResult {
        tool_result: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_use_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Result {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_cost_usd: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        num_turns: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_complete: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Error {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    User {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Status {
        status: SessionStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    History {
        messages: Vec<HistoryMessage>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    ApprovalRequired {
        #[serde(flatten)]
        approval: PendingApproval,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    ApprovalProcessed {
        approved: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feedback: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
}

/// Control frames sent client → server on the primary channel only.
///
/// The fallback stream is one-way; no client → server signaling exists
/// there (in particular, no ping).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlFrame {
    /// Liveness probe; the server must answer with a `pong` event.
    Ping,
    /// Interrupt the active agent turn.
    Interrupt,
    /// Re-subscribe to session updates after the agent restarts.
    Subscribe,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tool_use() {
        let json = r#"{
            "type": "tool_use",
            "tool_name": "Write",
            "tool_input": {"file_path": "/tmp/a.txt", "content": "hi"},
            "tool_use_id": "toolu_42",
            "timestamp": "2026-02-05T10:00:00Z"
        }"#;
        let event: StreamEvent = serde_json::from_str(json).expect("parse tool_use");
        match event {
            StreamEvent::ToolUse {
                tool_name,
                tool_input,
                tool_use_id,
                ..
            } => {
                assert_eq!(tool_name, "Write");
                assert_eq!(tool_use_id, "toolu_42");
                assert_eq!(
                    tool_input.get("file_path").and_then(|v| v.as_str()),
                    Some("/tmp/a.txt")
                );
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn deserializes_approval_required_with_flattened_fields() {
        let json = r#"{
            "type": "approval_required",
            "tool_name": "Bash",
            "tool_input": {"command": "rm -rf /tmp/x"},
            "tool_use_id": "toolu_7",
            "diff": "rm -rf /tmp/x",
            "diff_stats": {"additions": 0, "deletions": 0},
            "risk_level": "high",
            "diff_tier": "inline"
        }"#;
        let event: StreamEvent = serde_json::from_str(json).expect("parse approval_required");
        match event {
            StreamEvent::ApprovalRequired { approval, .. } => {
                assert_eq!(approval.tool_name, "Bash");
                assert_eq!(approval.tool_use_id, "toolu_7");
                assert_eq!(approval.risk_level, Some(crate::RiskLevel::High));
                assert_eq!(approval.diff_tier, crate::DiffTier::Inline);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn deserializes_result_with_partial_fields() {
        let json = r#"{"type":"result","total_cost_usd":0.042,"is_complete":true}"#;
        let event: StreamEvent = serde_json::from_str(json).expect("parse result");
        match event {
            StreamEvent::Result {
                total_cost_usd,
                is_complete,
                duration_ms,
                ..
            } => {
                assert_eq!(total_cost_usd, Some(0.042));
                assert_eq!(is_complete, Some(true));
                assert_eq!(duration_ms, None);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn control_frame_ping_matches_wire_shape() {
        let json = serde_json::to_string(&ControlFrame::Ping).expect("serialize");
        assert_eq!(json, r#"{"command":"ping"}"#);
        let back: ControlFrame = serde_json::from_str(r#"{"command":"ping"}"#).expect("parse");
        assert_eq!(back, ControlFrame::Ping);
    }

    #[test]
    fn control_frame_interrupt_and_subscribe_wire_shapes() {
        let json = serde_json::to_string(&ControlFrame::Interrupt).expect("serialize");
        assert_eq!(json, r#"{"command":"interrupt"}"#);
        let json = serde_json::to_string(&ControlFrame::Subscribe).expect("serialize");
        assert_eq!(json, r#"{"command":"subscribe"}"#);
    }

    #[test]
    fn history_messages_roundtrip() {
        let json = r#"{
            "type": "history",
            "messages": [
                {"role": "user", "content": "hello", "timestamp": "2026-02-05T10:00:00Z"},
                {"role": "assistant", "content": "hi"}
            ]
        }"#;
        let event: StreamEvent = serde_json::from_str(json).expect("parse history");
        match event {
            StreamEvent::History { messages, .. } => {
                assert_eq!(messages.len(), 2);
                assert_eq!(messages[0].role, "user");
                assert!(messages[1].timestamp.is_none());
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
