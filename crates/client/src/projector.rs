//! Session state projector
//!
//! Folds the event stream into the lifecycle state machine that drives
//! display and polling cadence. Pure and synchronous — no IO, no async,
//! no locking — so every transition is unit-testable in isolation.
//!
//! The stream is only a hint. The authoritative session record, fetched
//! through a separate query path, is ground truth: after a reconnect
//! gap the projector does not infer what happened, it waits for
//! [`SessionProjection::apply_authoritative`].

use agentdeck_protocol::{PendingApproval, Session, SessionStatus, StreamEvent};

/// Locally projected view of one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProjection {
    pub status: SessionStatus,
    pub pending_approval: Option<PendingApproval>,
    pub message_count: u64,
    pub total_cost_usd: f64,
    pub last_error: Option<String>,
}

impl Default for SessionProjection {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProjection {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            pending_approval: None,
            message_count: 0,
            total_cost_usd: 0.0,
            last_error: None,
        }
    }

    /// Fold one stream event into the projection.
    pub fn apply_event(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Status { status, .. } => {
                self.status = *status;
                if *status != SessionStatus::WaitingApproval {
                    self.pending_approval = None;
                }
            }
            StreamEvent::ApprovalRequired { approval, .. } => {
                self.status = SessionStatus::WaitingApproval;
                self.pending_approval = Some(approval.clone());
            }
            StreamEvent::ApprovalProcessed { .. } => {
                // Revert toward running; the next status-bearing signal
                // confirms where the session actually lands.
                self.pending_approval = None;
                if self.status == SessionStatus::WaitingApproval {
                    self.status = SessionStatus::Running;
                }
            }
            StreamEvent::Result {
                total_cost_usd,
                is_complete,
                ..
            } => {
                if let Some(cost) = total_cost_usd {
                    self.total_cost_usd = *cost;
                }
                if *is_complete == Some(true) {
                    self.status = SessionStatus::Completed;
                    self.pending_approval = None;
                }
            }
            StreamEvent::Error { content, .. } => {
                self.status = SessionStatus::Error;
                self.last_error = Some(content.clone());
            }
            StreamEvent::Text { .. }
            | StreamEvent::ToolUse { .. }
            | StreamEvent::ToolResult { .. }
            | StreamEvent::User { .. } => {
                self.message_count += 1;
            }
            StreamEvent::Init { .. } | StreamEvent::History { .. } | StreamEvent::Pong { .. } => {}
        }
    }

    /// Optimistic transition applied the moment a new prompt is sent,
    /// before any signal arrives — avoids the race where the backend
    /// has not yet persisted the change. Overwritten by the next
    /// authoritative read.
    pub fn note_prompt_sent(&mut self) {
        self.status = SessionStatus::Running;
        self.pending_approval = None;
    }

    /// Overwrite the projection from the authoritative session record.
    pub fn apply_authoritative(&mut self, session: &Session) {
        self.status = session.status;
        self.pending_approval = session.pending_approval.clone();
        self.message_count = session.message_count;
        self.total_cost_usd = session.total_cost_usd;
        if session.status != SessionStatus::Error {
            self.last_error = None;
        }
    }
}
