//! # Content Reconciler
//!
//! Applies a [`ChangePayload`] to a [`ContentSection`] and returns the next
//! section together with the ids it created, updated and deleted.
//!
//! ```text
//! payload ──► copy records ──► sets ──► updates (deep merge) ──► deletes
//!                                                                  │
//!                     element sections only: regenerate childIds ◄─┘
//! ```
//!
//! The input section is never modified. Records are `Arc`-shared, so the
//! copy is shallow and only written documents are cloned.

use crate::changes::ChangePayload;
use crate::content::ContentSection;
use crate::document::{fields, flatten_options, Document, DocumentId};
use crate::errors::EditorError;
use crate::ordering::compare_fractional_index;
use cord_common::{merge_with, FlattenOptions, Value};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Apply a payload, routing hierarchical kinds through the element reconciler
pub fn apply_change(
    payload: &ChangePayload,
    content: &ContentSection,
) -> Result<ContentSection, EditorError> {
    if payload.kind.is_hierarchical() {
        apply_change_to_element_content(payload, content)
    } else {
        apply_change_to_content(payload, content)
    }
}

/// Apply a payload to a flat (non-hierarchical) section
#[instrument(skip_all, fields(kind = %payload.kind))]
pub fn apply_change_to_content(
    payload: &ChangePayload,
    content: &ContentSection,
) -> Result<ContentSection, EditorError> {
    let mut pass = Reconciliation::start(content);

    for doc in &payload.sets {
        pass.set(doc.clone());
    }
    for change in &payload.updates {
        pass.update(&change.id, &change.update)?;
    }
    for id in &payload.deletes {
        pass.delete(id);
    }

    Ok(pass.finish())
}

/// Apply a payload to an element section, keeping `childIds` derived from
/// each child's `parentId` and `fractionalIndex`.
///
/// `childIds` coming from the payload are ignored: sets keep the derived
/// list already stored and updates have the field stripped.
#[instrument(skip_all, fields(kind = %payload.kind))]
pub fn apply_change_to_element_content(
    payload: &ChangePayload,
    content: &ContentSection,
) -> Result<ContentSection, EditorError> {
    let mut pass = Reconciliation::start(content);
    let mut hierarchy = HierarchyChanges::default();

    for doc in &payload.sets {
        let Some(id) = doc.id() else {
            warn!(kind = %payload.kind, "Skipping set without an id");
            continue;
        };
        let previous = pass.next.records.get(id).cloned();

        let mut incoming = doc.clone();
        incoming.set_child_ids(previous.as_ref().map(|p| p.child_ids()).unwrap_or_default());

        match previous.as_ref() {
            Some(previous) => {
                if let Some(parent) = previous.parent_id() {
                    hierarchy.touch(parent);
                }
            }
            // a new document may already have children pointing at it
            None => hierarchy.touch(id),
        }
        if let Some(parent) = incoming.parent_id() {
            hierarchy.add(parent, id);
        }

        pass.set(incoming);
    }

    for change in &payload.updates {
        let update = strip_child_ids(&change.update);
        let Some(previous) = pass.next.records.get(&change.id).cloned() else {
            warn!(id = %change.id, "Update target not found, skipping");
            continue;
        };
        let Some(merged) = pass.update(&change.id, &update)? else {
            continue;
        };

        let moved = previous.parent_id() != merged.parent_id();
        let reordered = previous.fractional_index() != merged.fractional_index();
        if moved {
            if let Some(parent) = previous.parent_id() {
                hierarchy.touch(parent);
            }
            if let Some(parent) = merged.parent_id() {
                hierarchy.add(parent, &change.id);
            }
        } else if reordered {
            if let Some(parent) = merged.parent_id() {
                hierarchy.touch(parent);
            }
        }
    }

    for id in &payload.deletes {
        if let Some(parent) = pass.next.records.get(id).and_then(|doc| doc.parent_id()) {
            hierarchy.touch(parent);
        }
        pass.delete(id);
    }

    hierarchy.regenerate(&mut pass.next);
    Ok(pass.finish())
}

fn strip_child_ids(update: &Value) -> Cow<'_, Value> {
    match update.as_object() {
        Some(fields) if fields.contains_key(fields::CHILD_IDS) => {
            let mut fields = fields.clone();
            fields.remove(fields::CHILD_IDS);
            Cow::Owned(Value::Object(fields))
        }
        _ => Cow::Borrowed(update),
    }
}

/// One apply call: a copy of the records plus the ids it touched
struct Reconciliation {
    next: ContentSection,
    options: FlattenOptions,
}

impl Reconciliation {
    fn start(content: &ContentSection) -> Self {
        Self {
            next: ContentSection {
                records: content.records.clone(),
                loaded: true,
                ..ContentSection::default()
            },
            options: flatten_options(),
        }
    }

    fn set(&mut self, doc: Document) {
        let Some(id) = doc.id().map(str::to_string) else {
            warn!("Skipping set without an id");
            return;
        };
        if self.next.records.contains_key(&id) {
            self.next.ids_updated_in_last_change.insert(id.clone());
        } else {
            self.next.ids_created_in_last_change.insert(id.clone());
        }
        self.next.records.insert(id, Arc::new(doc));
    }

    /// Merge an update into the stored document; `None` when the target is missing
    fn update(&mut self, id: &str, update: &Value) -> Result<Option<Arc<Document>>, EditorError> {
        let Some(current) = self.next.records.get(id) else {
            warn!(id, "Update target not found, skipping");
            return Ok(None);
        };

        let merged = merge_with(current.as_value(), update, &self.options)?;
        let merged = Arc::new(Document::from_value(merged)?);

        self.next.records.insert(id.to_string(), merged.clone());
        self.next.ids_updated_in_last_change.insert(id.to_string());
        Ok(Some(merged))
    }

    fn delete(&mut self, id: &str) {
        self.next.ids_deleted_in_last_change.insert(id.to_string());
        if self.next.records.remove(id).is_none() {
            debug!(id, "Deleted document was not present");
        }
    }

    fn finish(self) -> ContentSection {
        debug!(
            created = self.next.ids_created_in_last_change.len(),
            updated = self.next.ids_updated_in_last_change.len(),
            deleted = self.next.ids_deleted_in_last_change.len(),
            "Reconciled payload"
        );
        self.next
    }
}

/// Parents whose child lists must be regenerated, with the ids added under them
#[derive(Default)]
struct HierarchyChanges {
    parents: BTreeMap<DocumentId, Vec<DocumentId>>,
}

impl HierarchyChanges {
    fn touch(&mut self, parent: &str) {
        self.parents.entry(parent.to_string()).or_default();
    }

    fn add(&mut self, parent: &str, child: &str) {
        self.parents
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
    }

    /// Rebuild `childIds` for every touched parent: existing list plus added
    /// ids, restricted to records that still point at the parent, without
    /// duplicates, sorted by fractional index.
    fn regenerate(self, section: &mut ContentSection) {
        let created_parents = self
            .parents
            .keys()
            .any(|id| section.ids_created_in_last_change.contains(id));
        let children_by_parent = if created_parents {
            index_children(section)
        } else {
            BTreeMap::new()
        };

        for (parent_id, added) in self.parents {
            let Some(parent) = section.records.get(&parent_id) else {
                debug!(parent = %parent_id, "Parent not loaded, skipping childIds");
                continue;
            };

            let mut candidates = parent.child_ids();
            if let Some(children) = children_by_parent.get(&parent_id) {
                candidates.extend(children.iter().cloned());
            }
            candidates.extend(added);

            let mut seen = BTreeSet::new();
            let mut child_ids: Vec<DocumentId> = candidates
                .into_iter()
                .filter(|id| {
                    section
                        .records
                        .get(id)
                        .is_some_and(|child| child.parent_id() == Some(parent_id.as_str()))
                })
                .filter(|id| seen.insert(id.clone()))
                .collect();

            child_ids.sort_by(|a, b| {
                compare_fractional_index(
                    section.records.get(a).and_then(|doc| doc.fractional_index()),
                    section.records.get(b).and_then(|doc| doc.fractional_index()),
                )
            });

            if let Some(parent) = section.records.get_mut(&parent_id) {
                Arc::make_mut(parent).set_child_ids(child_ids);
            }
            if !section.ids_created_in_last_change.contains(&parent_id) {
                section.ids_updated_in_last_change.insert(parent_id);
            }
        }
    }
}

fn index_children(section: &ContentSection) -> BTreeMap<DocumentId, Vec<DocumentId>> {
    let mut index: BTreeMap<DocumentId, Vec<DocumentId>> = BTreeMap::new();
    for (id, doc) in &section.records {
        if let Some(parent) = doc.parent_id() {
            index.entry(parent.to_string()).or_default().push(id.clone());
        }
    }
    index
}
