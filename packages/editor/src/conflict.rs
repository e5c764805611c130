//! # Conflict Gate
//!
//! Last-writer-wins at document granularity: an incoming request may only
//! touch documents whose stored marker is older than the request's marker.

use crate::change_marker::{is_older, ChangeMarker};
use crate::changes::ChangeRequest;
use crate::content::ProjectContents;
use crate::document::{DocumentId, EntityKind};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectionReason {
    /// The stored document was written at or after the incoming marker
    NewerMarker,
    /// The update target no longer exists; a concurrent delete won
    MissingUpdateTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedTarget {
    pub kind: EntityKind,
    pub id: DocumentId,
    pub reason: RejectionReason,
}

/// Every target of `request` that fails the gate, in payload order.
///
/// Project payloads always pass.
pub fn rejected_targets(request: &ChangeRequest, contents: &ProjectContents) -> Vec<RejectedTarget> {
    let incoming = &request.change_marker;
    let mut rejected = Vec::new();

    for payload in &request.payload {
        if payload.kind == EntityKind::Project {
            continue;
        }
        let stored = |id: &str| contents.get(payload.kind, id);
        let mut reject = |id: &str, reason| {
            rejected.push(RejectedTarget {
                kind: payload.kind,
                id: id.to_string(),
                reason,
            })
        };

        let replaced = payload
            .sets
            .iter()
            .filter_map(|doc| doc.id())
            .chain(payload.deletes.iter().map(String::as_str));
        for id in replaced {
            if let Some(doc) = stored(id) {
                if !written_before(doc.change_marker().as_ref(), incoming) {
                    reject(id, RejectionReason::NewerMarker);
                }
            }
        }

        for change in &payload.updates {
            match stored(change.id.as_str()) {
                None => reject(change.id.as_str(), RejectionReason::MissingUpdateTarget),
                Some(doc) if !written_before(doc.change_marker().as_ref(), incoming) => {
                    reject(change.id.as_str(), RejectionReason::NewerMarker)
                }
                Some(_) => {}
            }
        }
    }

    if !rejected.is_empty() {
        debug!(marker = %incoming.id, rejected = rejected.len(), "Change request rejected");
    }
    rejected
}

/// Whether an incoming request should be applied at all
pub fn should_accept(request: &ChangeRequest, contents: &ProjectContents) -> bool {
    rejected_targets(request, contents).is_empty()
}

fn written_before(stored: Option<&ChangeMarker>, incoming: &ChangeMarker) -> bool {
    is_older(stored, Some(incoming))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangePayload;
    use crate::clock::Timestamp;
    use crate::content::ContentSection;
    use crate::document::{fields, Document};
    use cord_common::Value;

    fn marker(seconds: i64) -> ChangeMarker {
        ChangeMarker {
            id: format!("m{}", seconds),
            timestamp: Timestamp::new(seconds, 0),
        }
    }

    fn contents() -> ProjectContents {
        let stamped = |id: &str, seconds: i64| {
            Document::new(id, EntityKind::Asset).with(fields::CHANGE_MARKER, marker(seconds).to_value())
        };
        ProjectContents::new()
            .with_section(
                EntityKind::Asset,
                ContentSection::from_documents([
                    stamped("old", 10),
                    stamped("new", 30),
                    Document::new("unstamped", EntityKind::Asset),
                ]),
            )
            .with_section(
                EntityKind::Project,
                ContentSection::from_documents([Document::new("p1", EntityKind::Project)
                    .with(fields::CHANGE_MARKER, marker(99).to_value())]),
            )
    }

    fn request(seconds: i64, payload: ChangePayload) -> ChangeRequest {
        let bump = ChangePayload::new(EntityKind::Project)
            .update("p1", Value::object([(fields::UPDATED_AT, Timestamp::new(seconds, 0).to_value())]));
        ChangeRequest {
            user: "remote".to_string(),
            project_id: "p1".to_string(),
            change_marker: marker(seconds),
            payload: vec![payload, bump],
        }
    }

    fn update(id: &str) -> ChangePayload {
        ChangePayload::new(EntityKind::Asset).update(id, Value::object([("url", Value::from("u"))]))
    }

    #[test]
    fn test_accepts_newer_writes() {
        assert!(should_accept(&request(20, update("old")), &contents()));
        assert!(should_accept(&request(20, update("unstamped")), &contents()));
    }

    #[test]
    fn test_rejects_when_stored_marker_is_newer() {
        let rejected = rejected_targets(&request(20, update("new")), &contents());
        assert_eq!(
            rejected,
            vec![RejectedTarget {
                kind: EntityKind::Asset,
                id: "new".to_string(),
                reason: RejectionReason::NewerMarker
            }]
        );
    }

    #[test]
    fn test_equal_markers_are_rejected() {
        assert!(!should_accept(&request(30, update("new")), &contents()));
    }

    #[test]
    fn test_update_of_missing_document_is_rejected() {
        let rejected = rejected_targets(&request(50, update("gone")), &contents());
        assert_eq!(rejected[0].reason, RejectionReason::MissingUpdateTarget);
    }

    #[test]
    fn test_set_and_delete_of_missing_documents_pass() {
        let payload = ChangePayload::new(EntityKind::Asset)
            .set(Document::new("fresh", EntityKind::Asset))
            .delete("gone");
        assert!(should_accept(&request(1, payload), &contents()));
    }

    #[test]
    fn test_set_and_delete_respect_markers() {
        let payload = ChangePayload::new(EntityKind::Asset)
            .set(Document::new("new", EntityKind::Asset))
            .delete("old");
        let rejected = rejected_targets(&request(20, payload), &contents());

        let ids: Vec<_> = rejected.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[test]
    fn test_project_payload_always_passes() {
        // p1 carries a marker newer than the request
        assert!(should_accept(&request(20, ChangePayload::new(EntityKind::Asset)), &contents()));
    }
}
