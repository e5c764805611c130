//! # Edit Session Management
//!
//! One client's view of a project: local edits are applied optimistically
//! and queued as pending until the document store echoes them back, while
//! remote requests go through the conflict gate before they are folded in.

use crate::changes::{ChangePayload, ChangeRequest, RequestFactory};
use crate::conflict::{rejected_targets, RejectedTarget};
use crate::content::{ChangeReport, ProjectContents};
use crate::errors::EditorError;
use crate::inverter::invert_payloads;
use crate::undo_stack::UndoStack;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// How the document store reported a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteChangeKind {
    Added,
    Modified,
    Removed,
}

/// What happened to a remote request
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    /// Folded into the local contents
    Applied(ChangeReport),
    /// Echo of one of our own pending requests
    Acknowledged,
    /// Superseded by newer local state; nothing was applied
    Rejected(Vec<RejectedTarget>),
    /// Nothing to do
    Ignored,
}

/// Local request waiting for the store to confirm it
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub request: ChangeRequest,

    /// Takes the whole request back, project bump included (replay order)
    rollback: Vec<ChangePayload>,
}

impl PendingChange {
    pub fn marker_id(&self) -> &str {
        &self.request.change_marker.id
    }
}

/// Single edit session (one client in a multi-user project)
#[derive(Debug)]
pub struct EditSession {
    /// Unique session identifier
    pub id: String,

    factory: RequestFactory,
    contents: ProjectContents,
    pending: Vec<PendingChange>,
    history: UndoStack,
}

impl EditSession {
    pub fn new(id: impl Into<String>, factory: RequestFactory, contents: ProjectContents) -> Self {
        Self::with_history(id, factory, contents, UndoStack::new())
    }

    pub fn with_history(
        id: impl Into<String>,
        factory: RequestFactory,
        contents: ProjectContents,
        history: UndoStack,
    ) -> Self {
        Self {
            id: id.into(),
            factory,
            contents,
            pending: Vec::new(),
            history,
        }
    }

    pub fn contents(&self) -> &ProjectContents {
        &self.contents
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Access the history, e.g. to open or close a batch
    pub fn history_mut(&mut self) -> &mut UndoStack {
        &mut self.history
    }

    /// Apply a local edit immediately and queue it for the store.
    ///
    /// Returns the request to submit.
    pub fn apply_local(&mut self, payloads: Vec<ChangePayload>) -> Result<ChangeRequest, EditorError> {
        let request = self.factory.create(payloads)?;
        let inverse = invert_payloads(request.user_payloads(), &self.contents);
        self.submit(request.clone())?;
        self.history
            .record(request.user_payloads().cloned().collect(), inverse);
        Ok(request)
    }

    /// Undo the last local edit; returns the request to submit
    pub fn undo(&mut self) -> Result<Option<ChangeRequest>, EditorError> {
        let rollback_base = self.contents.clone();
        let request = self.history.undo(&mut self.contents, &self.factory)?;
        Ok(request.map(|request| self.queue(request, &rollback_base)))
    }

    /// Redo the last undone edit; returns the request to submit
    pub fn redo(&mut self) -> Result<Option<ChangeRequest>, EditorError> {
        let rollback_base = self.contents.clone();
        let request = self.history.redo(&mut self.contents, &self.factory)?;
        Ok(request.map(|request| self.queue(request, &rollback_base)))
    }

    /// The store accepted one of our requests
    pub fn confirm(&mut self, marker_id: &str) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.marker_id() != marker_id);
        before != self.pending.len()
    }

    /// The store refused one of our requests: drop it and roll its effects back
    pub fn reject(&mut self, marker_id: &str) -> Result<bool, EditorError> {
        let Some(index) = self.pending.iter().position(|p| p.marker_id() == marker_id) else {
            return Ok(false);
        };
        let change = self.pending.remove(index);

        let mut next = self.contents.clone();
        for payload in &change.rollback {
            next.apply_payload(payload)?;
        }
        self.contents = next;

        warn!(session = %self.id, marker = marker_id, "Local change rejected, rolled back");
        Ok(true)
    }

    /// Fold in a request reported by the document store
    pub fn receive_remote(
        &mut self,
        request: &ChangeRequest,
        kind: RemoteChangeKind,
    ) -> Result<RemoteOutcome, EditorError> {
        if kind == RemoteChangeKind::Removed {
            debug!(marker = %request.change_marker.id, "Ignoring removed change request");
            return Ok(RemoteOutcome::Ignored);
        }

        if self.confirm(&request.change_marker.id) {
            debug!(marker = %request.change_marker.id, "Acknowledged local change");
            return Ok(RemoteOutcome::Acknowledged);
        }

        let rejected = rejected_targets(request, &self.contents);
        if !rejected.is_empty() {
            return Ok(RemoteOutcome::Rejected(rejected));
        }

        let report = self.contents.apply_change_request(request)?;
        info!(session = %self.id, user = %request.user, "Applied remote change");
        Ok(RemoteOutcome::Applied(report))
    }

    /// Get number of pending requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> &[PendingChange] {
        &self.pending
    }

    fn submit(&mut self, request: ChangeRequest) -> Result<(), EditorError> {
        let rollback_base = self.contents.clone();
        self.contents.apply_change_request(&request)?;
        self.queue(request, &rollback_base);
        Ok(())
    }

    fn queue(&mut self, request: ChangeRequest, before: &ProjectContents) -> ChangeRequest {
        let mut rollback = invert_payloads(&request.payload, before);
        rollback.reverse();
        self.pending.push(PendingChange {
            request: request.clone(),
            rollback,
        });
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_marker::ChangeMarker;
    use crate::clock::{ManualClock, Timestamp};
    use crate::content::ContentSection;
    use crate::document::{fields, Document, EntityKind};
    use cord_common::Value;
    use std::sync::Arc;

    fn session() -> EditSession {
        let contents = ProjectContents::new()
            .with_section(
                EntityKind::Project,
                ContentSection::from_documents([Document::new("p1", EntityKind::Project)]),
            )
            .with_section(
                EntityKind::Element,
                ContentSection::from_documents([Document::new("root", EntityKind::Element)]),
            );
        let clock = Arc::new(ManualClock::new(Timestamp::new(1_000, 0)));
        EditSession::new("client-1", RequestFactory::new("alice", "p1", clock), contents)
    }

    fn add_child(id: &str) -> Vec<ChangePayload> {
        vec![ChangePayload::new(EntityKind::Element).set(
            Document::new(id, EntityKind::Element)
                .with(fields::PARENT_ID, "root")
                .with(fields::FRACTIONAL_INDEX, "V"),
        )]
    }

    fn remote(seconds: i64, payload: ChangePayload) -> ChangeRequest {
        ChangeRequest {
            user: "bob".to_string(),
            project_id: "p1".to_string(),
            change_marker: ChangeMarker {
                id: format!("remote-{}", seconds),
                timestamp: Timestamp::new(seconds, 0),
            },
            payload: vec![payload],
        }
    }

    fn root_children(session: &EditSession) -> Vec<String> {
        session
            .contents()
            .get(EntityKind::Element, "root")
            .map(Document::child_ids)
            .unwrap_or_default()
    }

    #[test]
    fn test_session_creation() {
        let session = session();
        assert_eq!(session.id, "client-1");
        assert_eq!(session.pending_count(), 0);
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_local_change_is_applied_and_pending() {
        let mut session = session();
        let request = session.apply_local(add_child("a")).unwrap();

        assert_eq!(root_children(&session), vec!["a".to_string()]);
        assert_eq!(session.pending_count(), 1);
        assert_eq!(session.pending()[0].marker_id(), request.change_marker.id);
        assert!(session.history().can_undo());
    }

    #[test]
    fn test_echo_is_acknowledged() {
        let mut session = session();
        let request = session.apply_local(add_child("a")).unwrap();

        let outcome = session.receive_remote(&request, RemoteChangeKind::Added).unwrap();
        assert_eq!(outcome, RemoteOutcome::Acknowledged);
        assert_eq!(session.pending_count(), 0);
        assert_eq!(root_children(&session), vec!["a".to_string()]);
    }

    #[test]
    fn test_reject_rolls_back() {
        let mut session = session();
        let before = session.contents().clone();
        let request = session.apply_local(add_child("a")).unwrap();

        assert!(session.reject(&request.change_marker.id).unwrap());
        assert_eq!(session.pending_count(), 0);
        assert!(session.contents().get(EntityKind::Element, "a").is_none());
        assert!(root_children(&session).is_empty());
        assert_eq!(
            session.contents().get(EntityKind::Project, "p1"),
            before.get(EntityKind::Project, "p1")
        );
        assert!(!session.reject("unknown").unwrap());
    }

    #[test]
    fn test_remote_change_is_gated() {
        let mut session = session();
        session.apply_local(add_child("a")).unwrap();

        let rename = ChangePayload::new(EntityKind::Element)
            .update("a", Value::object([(fields::NAME, Value::from("Stale"))]));

        let outcome = session
            .receive_remote(&remote(10, rename.clone()), RemoteChangeKind::Modified)
            .unwrap();
        assert!(matches!(outcome, RemoteOutcome::Rejected(ref targets) if targets[0].id == "a"));

        let outcome = session
            .receive_remote(&remote(5_000, rename), RemoteChangeKind::Added)
            .unwrap();
        assert!(matches!(outcome, RemoteOutcome::Applied(_)));
        let a = session.contents().get(EntityKind::Element, "a").unwrap();
        assert_eq!(a.get(fields::NAME), Some(&Value::from("Stale")));
    }

    #[test]
    fn test_removed_requests_are_ignored() {
        let mut session = session();
        let outcome = session
            .receive_remote(
                &remote(5_000, ChangePayload::new(EntityKind::Element).delete("root")),
                RemoteChangeKind::Removed,
            )
            .unwrap();

        assert_eq!(outcome, RemoteOutcome::Ignored);
        assert!(session.contents().get(EntityKind::Element, "root").is_some());
    }

    #[test]
    fn test_undo_redo_queue_requests() {
        let mut session = session();
        session.apply_local(add_child("a")).unwrap();

        let undo = session.undo().unwrap().unwrap();
        assert_eq!(undo.user_payloads().next().unwrap().deletes, vec!["a".to_string()]);
        assert!(root_children(&session).is_empty());

        session.redo().unwrap().unwrap();
        assert_eq!(root_children(&session), vec!["a".to_string()]);
        assert_eq!(session.pending_count(), 3);
    }
}
