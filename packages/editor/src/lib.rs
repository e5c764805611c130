//! # Cord Editor
//!
//! Change engine for Cord projects: applies batches of document changes to
//! an in-memory snapshot, computes their inverses for undo/redo and decides
//! which remote changes win.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ editor UI / store client                    │
//! │  - builds ChangePayloads from user edits    │
//! │  - pulls remote ChangeRequests              │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: ChangeRequest lifecycle             │
//! │  - stamp change markers, bump the project   │
//! │  - conflict gate (last writer wins)         │
//! │  - reconcile payloads into ContentSections  │
//! │  - invert changes for undo/redo             │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ common: Value + dot-notation merge          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are values**: applying a payload returns a new section
//! 2. **Markers only order**: change markers never carry business meaning
//! 3. **Derived hierarchy**: `childIds` is always rebuilt, never trusted
//! 4. **Null deletes, absent keeps**: the two never collapse
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cord_editor::{ChangePayload, EditSession, EntityKind, RequestFactory};
//!
//! let factory = RequestFactory::new("alice", project_id, Arc::new(HybridClock::new()));
//! let mut session = EditSession::new("client-1", factory, contents);
//!
//! // Apply locally, then send to the store
//! let request = session.apply_local(vec![
//!     ChangePayload::new(EntityKind::Element).update(id, update),
//! ])?;
//!
//! // Fold in what the store reports
//! session.receive_remote(&remote, RemoteChangeKind::Added)?;
//! ```

mod change_marker;
mod changes;
mod clock;
mod conflict;
mod content;
mod document;
mod errors;
mod inverter;
mod ordering;
mod reconciler;
mod session;
mod storage;
mod undo_stack;

pub use change_marker::{is_older, ChangeMarker};
pub use changes::{
    create_change_request, ChangePayload, ChangeRequest, PayloadError, RequestFactory,
    UpdateChange,
};
pub use clock::{Clock, HybridClock, ManualClock, SystemClock, Timestamp};
pub use conflict::{rejected_targets, should_accept, RejectedTarget, RejectionReason};
pub use content::{ChangeReport, ContentSection, ProjectContents, SectionReport};
pub use document::{
    create_asset_document, create_code_component_document, create_dataset_document,
    create_design_system_document, create_document, create_element_document,
    create_project_document, fields, flatten_options, Document, DocumentId, EntityKind,
    ATOMIC_FIELDS,
};
pub use errors::EditorError;
pub use inverter::{
    compute_change_request_inverse, compute_set_inverse, compute_update_inverse, invert_payload,
    invert_payloads, SetInverse,
};
pub use ordering::{compare_fractional_index, key_between, keys_between, OrderingError};
pub use reconciler::{apply_change, apply_change_to_content, apply_change_to_element_content};
pub use session::{EditSession, PendingChange, RemoteChangeKind, RemoteOutcome};
pub use storage::{StoredChangeRequest, StoredPayload, StoredUpdate};
pub use undo_stack::{HistoryEntry, UndoStack};

// Re-export common types for convenience
pub use cord_common::{Map, Value};
