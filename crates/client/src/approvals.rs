//! Approval correlator
//!
//! Holds at most one pending approval per session, keyed by the tool
//! invocation id, and guarantees the external approve/deny service is
//! called exactly once per pending instance. A decision captured against
//! invocation X is discarded — never sent — if the pending approval has
//! since been replaced by invocation Y.

use agentdeck_protocol::PendingApproval;
use tracing::{debug, warn};

use crate::api::ApprovalService;
use crate::error::ClientError;

/// The human's verdict on a pending tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Deny,
}

/// What happened to a resolve attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The decision was accepted and handed to the service.
    Submitted,
    /// Nothing is pending; the decision was dropped.
    NoPending,
    /// The decision referenced a tool invocation that is no longer the
    /// pending one; it was discarded without any service call.
    StaleCorrelation,
    /// A resolve for the current pending approval is already in flight.
    AlreadyInFlight,
}

/// Per-session approval state
#[derive(Debug, Default)]
pub struct ApprovalCorrelator {
    pending: Option<PendingApproval>,
    draft_feedback: String,
    panel_expanded: bool,
    in_flight: bool,
}

impl ApprovalCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingApproval> {
        self.pending.as_ref()
    }

    pub fn draft_feedback(&self) -> &str {
        &self.draft_feedback
    }

    pub fn set_draft_feedback(&mut self, text: impl Into<String>) {
        self.draft_feedback = text.into();
    }

    pub fn panel_expanded(&self) -> bool {
        self.panel_expanded
    }

    pub fn toggle_panel(&mut self) {
        self.panel_expanded = !self.panel_expanded;
    }

    /// A new approval request arrived on the stream. Replaces whatever
    /// was pending; any draft feedback typed against the old request is
    /// reset so it can never attach to the new one.
    pub fn accept(&mut self, approval: PendingApproval) {
        if let Some(old) = &self.pending {
            if old.tool_use_id != approval.tool_use_id {
                debug!(
                    component = "approvals",
                    old = %old.tool_use_id,
                    new = %approval.tool_use_id,
                    "pending approval replaced"
                );
            }
        }
        self.pending = Some(approval);
        self.draft_feedback.clear();
        self.panel_expanded = false;
        self.in_flight = false;
    }

    /// The stream (or an authoritative read) confirmed the pending
    /// approval was processed elsewhere.
    pub fn clear(&mut self) {
        self.pending = None;
        self.draft_feedback.clear();
        self.panel_expanded = false;
        self.in_flight = false;
    }

    /// Validate a decision against the current pending approval and, if
    /// it correlates, mark the resolve in flight.
    ///
    /// Returns the feedback to send when the decision should proceed.
    /// The caller must follow up with [`complete_resolve`] once the
    /// service call finishes.
    ///
    /// [`complete_resolve`]: Self::complete_resolve
    pub fn begin_resolve(&mut self, tool_use_id: &str) -> Result<Option<String>, ResolveOutcome> {
        let Some(pending) = &self.pending else {
            return Err(ResolveOutcome::NoPending);
        };
        if pending.tool_use_id != tool_use_id {
            warn!(
                component = "approvals",
                decided = %tool_use_id,
                pending = %pending.tool_use_id,
                "stale decision discarded"
            );
            return Err(ResolveOutcome::StaleCorrelation);
        }
        if self.in_flight {
            return Err(ResolveOutcome::AlreadyInFlight);
        }
        self.in_flight = true;
        let feedback = if self.draft_feedback.trim().is_empty() {
            None
        } else {
            Some(self.draft_feedback.clone())
        };
        Ok(feedback)
    }

    /// Record the result of the in-flight service call. On success the
    /// pending approval and draft are cleared; on failure the pending
    /// approval is retained so the user can retry.
    pub fn complete_resolve(&mut self, succeeded: bool) {
        self.in_flight = false;
        if succeeded {
            self.pending = None;
            self.draft_feedback.clear();
            self.panel_expanded = false;
        }
    }

    /// Full resolve flow: correlate, call the service, settle state.
    pub async fn resolve<S: ApprovalService>(
        &mut self,
        service: &S,
        session_id: &str,
        tool_use_id: &str,
        decision: Decision,
    ) -> Result<ResolveOutcome, ClientError> {
        let feedback = match self.begin_resolve(tool_use_id) {
            Ok(feedback) => feedback,
            Err(outcome) => return Ok(outcome),
        };

        let result = match decision {
            Decision::Approve => service.approve(session_id, feedback).await,
            Decision::Deny => service.deny(session_id, feedback).await,
        };

        match result {
            Ok(()) => {
                self.complete_resolve(true);
                Ok(ResolveOutcome::Submitted)
            }
            Err(err) => {
                self.complete_resolve(false);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    fn approval(tool_use_id: &str) -> PendingApproval {
        PendingApproval {
            tool_name: "Edit".into(),
            tool_input: HashMap::new(),
            tool_use_id: tool_use_id.into(),
            file_path: Some("src/main.rs".into()),
            diff: None,
            diff_stats: None,
            risk_level: None,
            diff_tier: Default::default(),
            total_bytes: 0,
            total_lines: 0,
            requested_at: None,
        }
    }

    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<(String, String, Option<String>)>>,
        fail: bool,
    }

    impl ApprovalService for RecordingService {
        async fn approve(
            &self,
            session_id: &str,
            feedback: Option<String>,
        ) -> Result<(), ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(("approve".into(), session_id.into(), feedback));
            if self.fail {
                return Err(ClientError::ApprovalAction("backend 500".into()));
            }
            Ok(())
        }

        async fn deny(
            &self,
            session_id: &str,
            feedback: Option<String>,
        ) -> Result<(), ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(("deny".into(), session_id.into(), feedback));
            if self.fail {
                return Err(ClientError::ApprovalAction("backend 500".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn exactly_one_call_per_pending_instance() {
        let service = RecordingService::default();
        let mut correlator = ApprovalCorrelator::new();
        correlator.accept(approval("toolu_x"));

        let outcome = correlator
            .resolve(&service, "s1", "toolu_x", Decision::Approve)
            .await
            .unwrap();
        assert_eq!(outcome, ResolveOutcome::Submitted);

        // Second attempt against the same, now-resolved instance
        let outcome = correlator
            .resolve(&service, "s1", "toolu_x", Decision::Approve)
            .await
            .unwrap();
        assert_eq!(outcome, ResolveOutcome::NoPending);

        assert_eq!(service.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_decision_is_discarded_not_sent() {
        let service = RecordingService::default();
        let mut correlator = ApprovalCorrelator::new();
        correlator.accept(approval("toolu_x"));
        // Replacement arrives before the user decides
        correlator.accept(approval("toolu_y"));

        let outcome = correlator
            .resolve(&service, "s1", "toolu_x", Decision::Deny)
            .await
            .unwrap();
        assert_eq!(outcome, ResolveOutcome::StaleCorrelation);
        assert!(service.calls.lock().unwrap().is_empty());
        // The replacement is still pending and resolvable
        assert!(correlator.pending().is_some());
    }

    #[tokio::test]
    async fn draft_feedback_never_crosses_instances() {
        let service = RecordingService::default();
        let mut correlator = ApprovalCorrelator::new();
        correlator.accept(approval("toolu_x"));
        correlator.set_draft_feedback("please use a safer path");
        correlator.accept(approval("toolu_y"));

        assert_eq!(correlator.draft_feedback(), "");

        correlator
            .resolve(&service, "s1", "toolu_y", Decision::Deny)
            .await
            .unwrap();
        let calls = service.calls.lock().unwrap();
        assert_eq!(calls[0].2, None);
    }

    #[tokio::test]
    async fn feedback_attaches_to_matching_instance() {
        let service = RecordingService::default();
        let mut correlator = ApprovalCorrelator::new();
        correlator.accept(approval("toolu_x"));
        correlator.set_draft_feedback("looks good");

        correlator
            .resolve(&service, "s1", "toolu_x", Decision::Approve)
            .await
            .unwrap();
        let calls = service.calls.lock().unwrap();
        assert_eq!(calls[0].0, "approve");
        assert_eq!(calls[0].2.as_deref(), Some("looks good"));
    }

    #[tokio::test]
    async fn failed_call_retains_pending_for_retry() {
        let service = RecordingService {
            fail: true,
            ..Default::default()
        };
        let mut correlator = ApprovalCorrelator::new();
        correlator.accept(approval("toolu_x"));
        correlator.set_draft_feedback("hold on");

        let err = correlator
            .resolve(&service, "s1", "toolu_x", Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ApprovalAction(_)));

        // Still pending, draft intact, retry allowed
        assert!(correlator.pending().is_some());
        assert_eq!(correlator.draft_feedback(), "hold on");
        let outcome = correlator.begin_resolve("toolu_x");
        assert!(outcome.is_ok());
    }

    #[test]
    fn in_flight_resolve_suppresses_duplicates() {
        let mut correlator = ApprovalCorrelator::new();
        correlator.accept(approval("toolu_x"));

        assert!(correlator.begin_resolve("toolu_x").is_ok());
        assert_eq!(
            correlator.begin_resolve("toolu_x"),
            Err(ResolveOutcome::AlreadyInFlight)
        );

        correlator.complete_resolve(true);
        assert!(correlator.pending().is_none());
    }

    #[test]
    fn empty_draft_sends_no_feedback() {
        let mut correlator = ApprovalCorrelator::new();
        correlator.accept(approval("toolu_x"));
        correlator.set_draft_feedback("   ");
        assert_eq!(correlator.begin_resolve("toolu_x"), Ok(None));
    }

    #[test]
    fn panel_toggle_resets_on_new_request() {
        let mut correlator = ApprovalCorrelator::new();
        correlator.accept(approval("toolu_x"));
        correlator.toggle_panel();
        assert!(correlator.panel_expanded());
        correlator.accept(approval("toolu_y"));
        assert!(!correlator.panel_expanded());
    }
}
