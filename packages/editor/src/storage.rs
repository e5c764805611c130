//! Storage form of change requests.
//!
//! The document store never receives nested partial updates: every update
//! is sent as its dot-notation flat map, where `null` deletes the field.

use crate::change_marker::ChangeMarker;
use crate::changes::{ChangePayload, ChangeRequest, UpdateChange};
use crate::document::{flatten_options, Document, DocumentId, EntityKind};
use cord_common::{expand, flatten_with, FlatMap};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUpdate {
    pub id: DocumentId,
    pub update: FlatMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPayload {
    #[serde(rename = "type")]
    pub kind: EntityKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sets: Vec<Document>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<StoredUpdate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletes: Vec<DocumentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredChangeRequest {
    pub user: String,
    pub project_id: DocumentId,
    pub change_marker: ChangeMarker,
    pub payload: Vec<StoredPayload>,
}

impl ChangeRequest {
    pub fn to_storage(&self) -> StoredChangeRequest {
        let options = flatten_options();
        StoredChangeRequest {
            user: self.user.clone(),
            project_id: self.project_id.clone(),
            change_marker: self.change_marker.clone(),
            payload: self
                .payload
                .iter()
                .map(|payload| StoredPayload {
                    kind: payload.kind,
                    sets: payload.sets.clone(),
                    updates: payload
                        .updates
                        .iter()
                        .map(|change| StoredUpdate {
                            id: change.id.clone(),
                            update: flatten_with(&change.update, &options),
                        })
                        .collect(),
                    deletes: payload.deletes.clone(),
                })
                .collect(),
        }
    }
}

impl StoredChangeRequest {
    pub fn into_request(self) -> ChangeRequest {
        ChangeRequest {
            user: self.user,
            project_id: self.project_id,
            change_marker: self.change_marker,
            payload: self
                .payload
                .into_iter()
                .map(|payload| ChangePayload {
                    kind: payload.kind,
                    sets: payload.sets,
                    updates: payload
                        .updates
                        .into_iter()
                        .map(|stored| UpdateChange::new(stored.id, expand(&stored.update, false)))
                        .collect(),
                    deletes: payload.deletes,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::create_change_request;
    use crate::clock::{ManualClock, Timestamp};
    use crate::document::fields;
    use cord_common::Value;

    fn request() -> ChangeRequest {
        let clock = ManualClock::new(Timestamp::new(7, 0));
        let payload = ChangePayload::new(EntityKind::Element).update(
            "e1",
            Value::object([
                ("style", Value::object([("color", Value::Null), ("width", Value::from(3))])),
                ("props", Value::empty_object()),
            ]),
        );
        create_change_request("alice", "p1", vec![payload], &clock).unwrap()
    }

    #[test]
    fn test_updates_are_flattened_for_storage() {
        let stored = request().to_storage();
        let update = &stored.payload[0].updates[0].update;

        assert_eq!(update.get("style.color"), Some(&Value::Null));
        assert_eq!(update.get("style.width"), Some(&Value::from(3)));
        assert_eq!(update.get("props"), Some(&Value::empty_object()));
        // markers stay whole
        assert!(update.get(fields::CHANGE_MARKER).is_some());
        assert!(update.keys().all(|k| !k.starts_with("changeMarker.")));
    }

    #[test]
    fn test_storage_round_trip() {
        let request = request();
        let json = serde_json::to_string(&request.to_storage()).unwrap();
        let stored: StoredChangeRequest = serde_json::from_str(&json).unwrap();

        assert_eq!(stored.into_request(), request);
    }
}
