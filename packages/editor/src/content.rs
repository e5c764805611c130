//! # Project Contents
//!
//! In-memory snapshot of a project: one [`ContentSection`] per entity kind.
//! Records are shared behind `Arc`, so copying a section before applying a
//! payload only clones pointers; a document is deep-copied when it is written.

use crate::changes::{ChangePayload, ChangeRequest};
use crate::document::{Document, DocumentId, EntityKind};
use crate::errors::EditorError;
use crate::reconciler::apply_change;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSection {
    #[serde(default)]
    pub records: BTreeMap<DocumentId, Arc<Document>>,

    #[serde(default)]
    pub loaded: bool,

    /// Diff report of the last apply, reset on every call
    #[serde(default)]
    pub ids_created_in_last_change: BTreeSet<DocumentId>,

    #[serde(default)]
    pub ids_updated_in_last_change: BTreeSet<DocumentId>,

    #[serde(default)]
    pub ids_deleted_in_last_change: BTreeSet<DocumentId>,
}

impl ContentSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loaded section holding the given documents; documents without an id are dropped
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let records = documents
            .into_iter()
            .filter_map(|doc| Some((doc.id()?.to_string(), Arc::new(doc))))
            .collect();
        Self {
            records,
            loaded: true,
            ..Self::default()
        }
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.records.get(id).map(Arc::as_ref)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.records.values().map(Arc::as_ref)
    }
}

/// Ids touched by one request, per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub created: BTreeSet<DocumentId>,
    pub updated: BTreeSet<DocumentId>,
    pub deleted: BTreeSet<DocumentId>,
}

impl SectionReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    pub sections: BTreeMap<EntityKind, SectionReport>,
}

impl ChangeReport {
    pub fn section(&self, kind: EntityKind) -> Option<&SectionReport> {
        self.sections.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(SectionReport::is_empty)
    }

    fn record(&mut self, kind: EntityKind, section: &ContentSection) {
        let report = self.sections.entry(kind).or_default();
        report.created.extend(section.ids_created_in_last_change.iter().cloned());
        report.updated.extend(section.ids_updated_in_last_change.iter().cloned());
        report.deleted.extend(section.ids_deleted_in_last_change.iter().cloned());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectContents {
    sections: BTreeMap<EntityKind, ContentSection>,
}

impl ProjectContents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, kind: EntityKind, section: ContentSection) -> Self {
        self.sections.insert(kind, section);
        self
    }

    pub fn section(&self, kind: EntityKind) -> Option<&ContentSection> {
        self.sections.get(&kind)
    }

    pub fn sections(&self) -> impl Iterator<Item = (EntityKind, &ContentSection)> {
        self.sections.iter().map(|(kind, section)| (*kind, section))
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&Document> {
        self.section(kind).and_then(|section| section.get(id))
    }

    /// Apply one payload to its section and return the updated section
    pub fn apply_payload(&mut self, payload: &ChangePayload) -> Result<&ContentSection, EditorError> {
        let next = match self.sections.get(&payload.kind) {
            Some(current) => apply_change(payload, current)?,
            None => apply_change(payload, &ContentSection::default())?,
        };
        let slot = self.sections.entry(payload.kind).or_default();
        *slot = next;
        Ok(&*slot)
    }

    /// Apply every payload of a request in order.
    ///
    /// All or nothing: when a payload fails, the contents are left untouched.
    #[instrument(skip_all, fields(user = %request.user, marker = %request.change_marker.id))]
    pub fn apply_change_request(&mut self, request: &ChangeRequest) -> Result<ChangeReport, EditorError> {
        let mut next = self.clone();
        let mut report = ChangeReport::default();
        for payload in &request.payload {
            let section = next.apply_payload(payload)?;
            report.record(payload.kind, section);
        }
        *self = next;
        Ok(report)
    }
}
