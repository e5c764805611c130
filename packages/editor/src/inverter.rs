//! # Change Inverter
//!
//! Computes the payload that takes a change back, measured against the
//! snapshot the change is about to be applied to.
//!
//! | forward                | inverse                              |
//! |------------------------|--------------------------------------|
//! | update `id`            | update restoring the touched paths   |
//! | set of an existing id  | update restoring the prior document  |
//! | set of a new id        | delete                               |
//! | delete of existing id  | set of the prior document            |
//! | delete of missing id   | nothing                              |

use crate::changes::{create_change_request, ChangePayload, ChangeRequest, UpdateChange};
use crate::clock::Clock;
use crate::content::{ContentSection, ProjectContents};
use crate::document::{flatten_options, Document};
use crate::errors::EditorError;
use cord_common::{expand, flatten_with, FlatMap, Value};
use tracing::{debug, instrument};

/// Inverse of a partial update, or `None` when the target does not exist
pub fn compute_update_inverse(change: &UpdateChange, content: &ContentSection) -> Option<UpdateChange> {
    let current = content.get(&change.id)?;
    let touched = flatten_with(&change.update, &flatten_options());
    Some(UpdateChange {
        id: change.id.clone(),
        update: restore_paths(current.as_value(), touched.keys().map(String::as_str)),
    })
}

/// What undoes a set
#[derive(Debug, Clone, PartialEq)]
pub enum SetInverse {
    /// The id existed: restore its previous state
    Update(UpdateChange),
    /// The id was created: remove it
    Delete(String),
}

/// Inverse of a whole-document set, or `None` when the document has no id
pub fn compute_set_inverse(doc: &Document, content: &ContentSection) -> Option<SetInverse> {
    let id = doc.id()?;
    let Some(prior) = content.get(id) else {
        return Some(SetInverse::Delete(id.to_string()));
    };

    let options = flatten_options();
    let incoming = flatten_with(doc.as_value(), &options);
    let previous = flatten_with(prior.as_value(), &options);
    let paths = incoming.keys().chain(previous.keys()).map(String::as_str);

    Some(SetInverse::Update(UpdateChange {
        id: id.to_string(),
        update: restore_paths(prior.as_value(), paths),
    }))
}

/// Inverse of one payload against its section of the snapshot
pub fn invert_payload(payload: &ChangePayload, content: &ContentSection) -> ChangePayload {
    let mut inverse = ChangePayload::new(payload.kind);

    for doc in &payload.sets {
        match compute_set_inverse(doc, content) {
            Some(SetInverse::Update(update)) => inverse.updates.push(update),
            Some(SetInverse::Delete(id)) => inverse.deletes.push(id),
            None => {}
        }
    }
    for change in &payload.updates {
        if let Some(update) = compute_update_inverse(change, content) {
            inverse.updates.push(update);
        }
    }
    for id in &payload.deletes {
        if let Some(prior) = content.get(id) {
            inverse.sets.push(prior.clone());
        }
    }

    inverse
}

/// Invert every payload independently against the same snapshot.
///
/// Output order matches input order; replaying an undo must walk it backwards.
pub fn invert_payloads<'a>(
    payloads: impl IntoIterator<Item = &'a ChangePayload>,
    contents: &ProjectContents,
) -> Vec<ChangePayload> {
    let empty = ContentSection::default();
    payloads
        .into_iter()
        .map(|payload| invert_payload(payload, contents.section(payload.kind).unwrap_or(&empty)))
        .collect()
}

/// Build the request that undoes `request`, stamped with a fresh marker.
///
/// The project bump is not inverted; the new request carries its own.
/// Payloads with nothing to undo are dropped.
#[instrument(skip_all, fields(marker = %request.change_marker.id))]
pub fn compute_change_request_inverse<C: Clock + ?Sized>(
    request: &ChangeRequest,
    contents: &ProjectContents,
    clock: &C,
) -> Result<ChangeRequest, EditorError> {
    let payloads: Vec<ChangePayload> = invert_payloads(request.user_payloads(), contents)
        .into_iter()
        .filter(|payload| !payload.is_empty())
        .collect();
    debug!(payloads = payloads.len(), "Inverted change request");

    create_change_request(&request.user, &request.project_id, payloads, clock)
}

fn restore_paths<'a>(prior: &Value, paths: impl Iterator<Item = &'a str>) -> Value {
    let mut inverse = FlatMap::new();
    for path in paths {
        let (path, value) = restore_entry(prior, path);
        inverse.insert(path, value);
    }
    expand(&inverse, false)
}

/// The entry that puts `path` back the way `prior` had it:
/// the prior value when present, the whole non-object ancestor when the
/// update wrote beneath a scalar, or `null` on the shortest missing prefix.
fn restore_entry(prior: &Value, path: &str) -> (String, Value) {
    let mut current = prior;
    let mut consumed = 0;

    for segment in path.split('.') {
        let end = if consumed == 0 {
            segment.len()
        } else {
            consumed + 1 + segment.len()
        };
        match current {
            Value::Object(fields) => match fields.get(segment) {
                Some(next) => {
                    current = next;
                    consumed = end;
                }
                None => return (path[..end].to_string(), Value::Null),
            },
            other if consumed > 0 => return (path[..consumed].to_string(), other.clone()),
            _ => return (path.to_string(), Value::Null),
        }
    }

    (path.to_string(), current.clone())
}
