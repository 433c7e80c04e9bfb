//! Core types shared across the protocol

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    WaitingApproval,
    Completed,
    Error,
}

impl SessionStatus {
    /// Terminal states accept a new prompt but nothing else.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Error)
    }
}

/// Risk classification for a pending tool use. Advisory rendering
/// metadata only — never gates whether a resolution is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Whether the approval diff is carried in full or as a head+tail preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffTier {
    Inline,
    Truncated,
}

impl Default for DiffTier {
    fn default() -> Self {
        DiffTier::Inline
    }
}

/// Addition/deletion counts from a diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub additions: u64,
    pub deletions: u64,
    /// Older backends omit this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_changed: Option<u64>,
}

/// A tool use awaiting a human decision.
///
/// At most one exists per session. `tool_use_id` is the correlation key
/// binding the eventual approve/deny call to this exact invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub tool_name: String,
    pub tool_input: HashMap<String, Value>,
    pub tool_use_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_stats: Option<DiffStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub diff_tier: DiffTier,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub total_lines: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<String>,
}

/// Read-mostly projection of the authoritative session record.
///
/// The authoritative copy lives on the backend; this is what
/// `GET /api/sessions/{id}` returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_approval: Option<PendingApproval>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub total_cost_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// One entry in a `history` frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_status_snake_case_on_wire() {
        let json = serde_json::to_string(&SessionStatus::WaitingApproval).unwrap();
        assert_eq!(json, "\"waiting_approval\"");
        let back: SessionStatus = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(back, SessionStatus::Error);
    }

    #[test]
    fn terminal_states() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Error.is_terminal());
        assert!(!SessionStatus::WaitingApproval.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
    }

    #[test]
    fn risk_level_orders_low_to_high() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn diff_stats_tolerates_missing_files_changed() {
        let stats: DiffStats = serde_json::from_str(r#"{"additions":3,"deletions":1}"#).unwrap();
        assert_eq!(stats.additions, 3);
        assert_eq!(stats.deletions, 1);
        assert_eq!(stats.files_changed, None);
    }

    #[test]
    fn pending_approval_minimal_fields() {
        let json = r#"{
            "tool_name": "Bash",
            "tool_input": {"command": "ls"},
            "tool_use_id": "toolu_01"
        }"#;
        let pending: PendingApproval = serde_json::from_str(json).unwrap();
        assert_eq!(pending.tool_name, "Bash");
        assert_eq!(pending.tool_use_id, "toolu_01");
        assert_eq!(pending.diff_tier, DiffTier::Inline);
        assert!(pending.diff.is_none());
    }
}
