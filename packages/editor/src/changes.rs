//! # Change Payloads and Requests
//!
//! A [`ChangePayload`] batches creates (`sets`), partial `updates` and
//! `deletes` against one entity collection. A [`ChangeRequest`] is the unit
//! handed to the document store: every payload of one user action, all
//! stamped with the same [`ChangeMarker`], plus a trailing payload that
//! bumps the project's `updatedAt`.

use crate::change_marker::ChangeMarker;
use crate::clock::Clock;
use crate::document::{fields, Document, DocumentId, EntityKind};
use crate::errors::EditorError;
use cord_common::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("{kind} document '{id}' is targeted more than once")]
    DuplicateTarget { kind: EntityKind, id: DocumentId },

    #[error("{kind} set is missing an id")]
    MissingId { kind: EntityKind },

    #[error("update for '{id}' is not an object")]
    UpdateNotAnObject { id: DocumentId },
}

/// Partial update of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateChange {
    pub id: DocumentId,
    pub update: Value,
}

impl UpdateChange {
    pub fn new(id: impl Into<String>, update: Value) -> Self {
        Self {
            id: id.into(),
            update,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePayload {
    #[serde(rename = "type")]
    pub kind: EntityKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sets: Vec<Document>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<UpdateChange>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletes: Vec<DocumentId>,
}

impl ChangePayload {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            sets: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }

    pub fn set(mut self, document: Document) -> Self {
        self.sets.push(document);
        self
    }

    pub fn update(mut self, id: impl Into<String>, update: Value) -> Self {
        self.updates.push(UpdateChange::new(id, update));
        self
    }

    pub fn delete(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.deletes.contains(&id) {
            self.deletes.push(id);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Every id this payload touches, in list order (sets, updates, deletes)
    pub fn target_ids(&self) -> impl Iterator<Item = &str> {
        self.sets
            .iter()
            .filter_map(Document::id)
            .chain(self.updates.iter().map(|u| u.id.as_str()))
            .chain(self.deletes.iter().map(String::as_str))
    }

    /// Check structural invariants: sets carry ids, updates are objects and
    /// no id appears in more than one of the three lists.
    pub fn validate(&self) -> Result<(), PayloadError> {
        let mut set_ids = BTreeSet::new();
        for doc in &self.sets {
            let id = doc.id().ok_or(PayloadError::MissingId { kind: self.kind })?;
            set_ids.insert(id);
        }

        let mut update_ids = BTreeSet::new();
        for change in &self.updates {
            if !change.update.is_object() {
                return Err(PayloadError::UpdateNotAnObject {
                    id: change.id.clone(),
                });
            }
            update_ids.insert(change.id.as_str());
        }

        let delete_ids: BTreeSet<&str> = self.deletes.iter().map(String::as_str).collect();

        let duplicate = set_ids
            .intersection(&update_ids)
            .chain(set_ids.intersection(&delete_ids))
            .chain(update_ids.intersection(&delete_ids))
            .next();

        match duplicate {
            Some(id) => Err(PayloadError::DuplicateTarget {
                kind: self.kind,
                id: id.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub user: String,
    pub project_id: DocumentId,
    pub change_marker: ChangeMarker,
    pub payload: Vec<ChangePayload>,
}

impl ChangeRequest {
    /// Payloads authored by the user, without the trailing project bump
    pub fn user_payloads(&self) -> impl Iterator<Item = &ChangePayload> {
        self.payload
            .iter()
            .filter(move |payload| !is_project_bump(payload, &self.project_id))
    }
}

fn is_project_bump(payload: &ChangePayload, project_id: &str) -> bool {
    if payload.kind != EntityKind::Project || !payload.sets.is_empty() || !payload.deletes.is_empty()
    {
        return false;
    }
    match payload.updates.as_slice() {
        [change] => {
            change.id == project_id
                && change.update.as_object().is_some_and(|fields| {
                    fields
                        .keys()
                        .all(|k| k == fields::UPDATED_AT || k == fields::CHANGE_MARKER)
                })
        }
        _ => false,
    }
}

fn project_bump(project_id: &str, marker: &ChangeMarker) -> ChangePayload {
    ChangePayload::new(EntityKind::Project).update(
        project_id,
        Value::object([
            (fields::UPDATED_AT, marker.timestamp.to_value()),
            (fields::CHANGE_MARKER, marker.to_value()),
        ]),
    )
}

/// Wrap payloads into a request.
///
/// Every set document and every update is stamped with one fresh marker.
/// Empty payloads are dropped and the project bump is appended last.
pub fn create_change_request<C: Clock + ?Sized>(
    user: &str,
    project_id: &str,
    payloads: Vec<ChangePayload>,
    clock: &C,
) -> Result<ChangeRequest, EditorError> {
    let marker = ChangeMarker::with_clock(clock);
    let marker_value = marker.to_value();

    let mut stamped = Vec::with_capacity(payloads.len() + 1);
    for mut payload in payloads.into_iter().filter(|p| !p.is_empty()) {
        payload.validate()?;
        for doc in &mut payload.sets {
            doc.set(fields::CHANGE_MARKER, marker_value.clone());
        }
        for change in &mut payload.updates {
            if let Value::Object(update) = &mut change.update {
                update.insert(fields::CHANGE_MARKER.to_string(), marker_value.clone());
            }
        }
        stamped.push(payload);
    }
    stamped.push(project_bump(project_id, &marker));

    debug!(user, project_id, payloads = stamped.len(), "Created change request");

    Ok(ChangeRequest {
        user: user.to_string(),
        project_id: project_id.to_string(),
        change_marker: marker,
        payload: stamped,
    })
}

/// Creates requests on behalf of one user editing one project
#[derive(Clone)]
pub struct RequestFactory {
    user: String,
    project_id: DocumentId,
    clock: Arc<dyn Clock>,
}

impl RequestFactory {
    pub fn new(user: impl Into<String>, project_id: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            user: user.into(),
            project_id: project_id.into(),
            clock,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn create(&self, payloads: Vec<ChangePayload>) -> Result<ChangeRequest, EditorError> {
        create_change_request(&self.user, &self.project_id, payloads, self.clock.as_ref())
    }
}

impl std::fmt::Debug for RequestFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestFactory")
            .field("user", &self.user)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}
