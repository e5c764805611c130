//! # Undo/Redo Stack
//!
//! Tracks change history and enables undo/redo.
//!
//! ## Design
//!
//! - Every recorded change carries the inverse computed before it was applied
//! - Undo applies the inverse as a fresh request and moves the entry to redo
//! - The opposite direction is recomputed against the live contents each time,
//!   so remote edits that landed in between are respected
//! - New changes clear the redo stack
//! - Batches group several changes into one undo step
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//!
//! let request = factory.create(payloads)?;
//! let inverse = invert_payloads(request.user_payloads(), &contents);
//! contents.apply_change_request(&request)?;
//! stack.record(request.user_payloads().cloned().collect(), inverse);
//!
//! stack.undo(&mut contents, &factory)?;
//! stack.redo(&mut contents, &factory)?;
//! ```

use crate::changes::{ChangePayload, ChangeRequest, RequestFactory};
use crate::content::ProjectContents;
use crate::errors::EditorError;
use crate::inverter::invert_payloads;
use tracing::debug;

/// A group of changes that is undone/redone together
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Payloads as applied (in application order)
    pub forward: Vec<ChangePayload>,

    /// Payloads that take them back (already in replay order)
    pub inverse: Vec<ChangePayload>,

    /// Optional description of this entry
    pub description: Option<String>,
}

impl HistoryEntry {
    /// Create an entry from payloads and their inverses as computed
    /// (same order as `forward`); the inverses are stored reversed.
    pub fn new(forward: Vec<ChangePayload>, mut inverse: Vec<ChangePayload>) -> Self {
        inverse.reverse();
        inverse.retain(|payload| !payload.is_empty());
        Self {
            forward,
            inverse,
            description: None,
        }
    }

    /// Add a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn is_noop(&self) -> bool {
        self.inverse.is_empty()
    }
}

/// Undo/redo stack for a project
#[derive(Debug)]
pub struct UndoStack {
    /// Applied entries (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// Undone entries (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Currently building a batch
    current_batch: Option<HistoryEntry>,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Record an applied change and its inverse.
    ///
    /// A change with nothing to undo is not recorded.
    pub fn record(&mut self, forward: Vec<ChangePayload>, inverse: Vec<ChangePayload>) {
        let entry = HistoryEntry::new(forward, inverse);

        if let Some(batch) = &mut self.current_batch {
            batch.forward.extend(entry.forward);
            // Later changes are undone first
            let mut inverse = entry.inverse;
            inverse.append(&mut batch.inverse);
            batch.inverse = inverse;
        } else if entry.is_noop() {
            debug!("Nothing to undo, change not recorded");
        } else {
            self.push_entry(entry);
        }
    }

    /// Start a batch of changes (will be undone/redone together)
    pub fn begin_batch(&mut self) {
        self.current_batch = Some(HistoryEntry {
            forward: Vec::new(),
            inverse: Vec::new(),
            description: None,
        });
    }

    /// End the current batch and push to undo stack
    pub fn end_batch(&mut self) {
        if let Some(batch) = self.current_batch.take() {
            if !batch.is_noop() {
                self.push_entry(batch);
            }
        }
    }

    /// Set description for current batch (if batching)
    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    pub fn is_batching(&self) -> bool {
        self.current_batch.is_some()
    }

    /// Push an entry to the undo stack
    pub fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);

        // Trim if exceeded max levels
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // New change invalidates the future
        self.redo_stack.clear();
    }

    /// Undo the most recent entry; returns the request that was applied
    pub fn undo(
        &mut self,
        contents: &mut ProjectContents,
        factory: &RequestFactory,
    ) -> Result<Option<ChangeRequest>, EditorError> {
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(None);
        };
        match revert(&entry, contents, factory) {
            Ok((request, reverted)) => {
                self.redo_stack.push(reverted);
                Ok(Some(request))
            }
            Err(error) => {
                self.undo_stack.push(entry);
                Err(error)
            }
        }
    }

    /// Redo the most recently undone entry; returns the request that was applied
    pub fn redo(
        &mut self,
        contents: &mut ProjectContents,
        factory: &RequestFactory,
    ) -> Result<Option<ChangeRequest>, EditorError> {
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(None);
        };
        match revert(&entry, contents, factory) {
            Ok((request, reverted)) => {
                self.undo_stack.push(reverted);
                Ok(Some(request))
            }
            Err(error) => {
                self.redo_stack.push(entry);
                Err(error)
            }
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the number of undo levels available
    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of redo levels available
    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply an entry's inverse and build the entry that takes the revert back
fn revert(
    entry: &HistoryEntry,
    contents: &mut ProjectContents,
    factory: &RequestFactory,
) -> Result<(ChangeRequest, HistoryEntry), EditorError> {
    let request = factory.create(entry.inverse.clone())?;
    let opposite = invert_payloads(request.user_payloads(), contents);
    contents.apply_change_request(&request)?;

    let mut reverted = HistoryEntry::new(request.user_payloads().cloned().collect(), opposite);
    reverted.description = entry.description.clone();
    Ok((request, reverted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, Timestamp};
    use crate::content::ContentSection;
    use crate::document::{fields, Document, EntityKind};
    use cord_common::Value;
    use std::sync::Arc;

    struct Fixture {
        contents: ProjectContents,
        factory: RequestFactory,
        stack: UndoStack,
    }

    impl Fixture {
        fn new(stack: UndoStack) -> Self {
            let contents = ProjectContents::new()
                .with_section(
                    EntityKind::Project,
                    ContentSection::from_documents([Document::new("p1", EntityKind::Project)]),
                )
                .with_section(
                    EntityKind::Asset,
                    ContentSection::from_documents([
                        Document::new("a1", EntityKind::Asset).with(fields::NAME, "Logo")
                    ]),
                );
            let clock = Arc::new(ManualClock::new(Timestamp::new(100, 0)));
            Self {
                contents,
                factory: RequestFactory::new("alice", "p1", clock),
                stack,
            }
        }

        fn apply(&mut self, payloads: Vec<ChangePayload>) {
            let request = self.factory.create(payloads).unwrap();
            let inverse = invert_payloads(request.user_payloads(), &self.contents);
            self.contents.apply_change_request(&request).unwrap();
            self.stack
                .record(request.user_payloads().cloned().collect(), inverse);
        }

        fn rename(&mut self, name: &str) {
            self.apply(vec![ChangePayload::new(EntityKind::Asset)
                .update("a1", Value::object([(fields::NAME, Value::from(name))]))]);
        }

        fn name(&self) -> Option<&Value> {
            self.contents
                .get(EntityKind::Asset, "a1")
                .and_then(|doc| doc.get(fields::NAME))
        }

        fn undo(&mut self) -> Option<ChangeRequest> {
            self.stack.undo(&mut self.contents, &self.factory).unwrap()
        }

        fn redo(&mut self) -> Option<ChangeRequest> {
            self.stack.redo(&mut self.contents, &self.factory).unwrap()
        }
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_apply_undo_redo() {
        let mut fx = Fixture::new(UndoStack::new());
        fx.rename("Brand");
        assert_eq!(fx.name(), Some(&Value::from("Brand")));

        let undone = fx.undo();
        assert!(undone.is_some());
        assert_eq!(fx.name(), Some(&Value::from("Logo")));
        assert!(fx.stack.can_redo());

        fx.redo().unwrap();
        assert_eq!(fx.name(), Some(&Value::from("Brand")));
        assert_eq!(fx.stack.undo_levels(), 1);
        assert_eq!(fx.stack.redo_levels(), 0);
    }

    #[test]
    fn test_undo_create_then_redo() {
        let mut fx = Fixture::new(UndoStack::new());
        fx.apply(vec![ChangePayload::new(EntityKind::Asset)
            .set(Document::new("a2", EntityKind::Asset).with(fields::NAME, "Icon"))]);

        fx.undo();
        assert!(fx.contents.get(EntityKind::Asset, "a2").is_none());

        fx.redo();
        let restored = fx.contents.get(EntityKind::Asset, "a2").unwrap();
        assert_eq!(restored.get(fields::NAME), Some(&Value::from("Icon")));
    }

    #[test]
    fn test_batched_changes() {
        let mut fx = Fixture::new(UndoStack::new());

        fx.stack.begin_batch();
        fx.stack.set_batch_description("Rename twice");
        fx.rename("First");
        fx.rename("Second");
        fx.stack.end_batch();

        assert_eq!(fx.stack.undo_levels(), 1);
        assert_eq!(fx.stack.undo_description(), Some("Rename twice"));

        fx.undo();
        assert_eq!(fx.name(), Some(&Value::from("Logo")));
        assert_eq!(fx.stack.redo_description(), Some("Rename twice"));

        fx.redo();
        assert_eq!(fx.name(), Some(&Value::from("Second")));
    }

    #[test]
    fn test_new_change_clears_redo() {
        let mut fx = Fixture::new(UndoStack::new());
        fx.rename("Brand");
        fx.undo();
        assert_eq!(fx.stack.redo_levels(), 1);

        fx.rename("Other");
        assert_eq!(fx.stack.redo_levels(), 0);
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut fx = Fixture::new(UndoStack::with_max_levels(2));
        for i in 0..3 {
            fx.rename(&format!("Name {}", i));
        }
        assert_eq!(fx.stack.undo_levels(), 2);
    }

    #[test]
    fn test_nothing_to_undo_is_not_recorded() {
        let mut fx = Fixture::new(UndoStack::new());
        fx.apply(vec![ChangePayload::new(EntityKind::Asset).delete("ghost")]);

        assert!(!fx.stack.can_undo());
        assert!(fx.undo().is_none());
    }
}
