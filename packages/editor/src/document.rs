//! # Documents
//!
//! A document is a schemaless object keyed by `id`. Documents live in one
//! content section per [`EntityKind`] and are only changed by applying a
//! [`ChangePayload`](crate::ChangePayload).

use crate::change_marker::ChangeMarker;
use crate::clock::{Clock, SystemClock};
use cord_common::{CommonError, FlattenOptions, Map, Value};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type DocumentId = String;

/// Well-known field names
pub mod fields {
    pub const ID: &str = "id";
    pub const TYPE: &str = "type";
    pub const NAME: &str = "name";
    pub const CHANGE_MARKER: &str = "changeMarker";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const PARENT_ID: &str = "parentId";
    pub const CHILD_IDS: &str = "childIds";
    pub const FRACTIONAL_INDEX: &str = "fractionalIndex";
    pub const STYLE: &str = "style";
}

/// Fields that are written and replaced as a whole, never path by path
pub const ATOMIC_FIELDS: [&str; 3] = [fields::CHANGE_MARKER, fields::UPDATED_AT, fields::CREATED_AT];

/// Flatten options every document update goes through
pub fn flatten_options() -> FlattenOptions {
    FlattenOptions::with_no_expand(ATOMIC_FIELDS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Project,
    Element,
    Asset,
    DesignSystem,
    CodeComponent,
    Dataset,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Project,
        EntityKind::Element,
        EntityKind::Asset,
        EntityKind::DesignSystem,
        EntityKind::CodeComponent,
        EntityKind::Dataset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Element => "element",
            EntityKind::Asset => "asset",
            EntityKind::DesignSystem => "designSystem",
            EntityKind::CodeComponent => "codeComponent",
            EntityKind::Dataset => "dataset",
        }
    }

    /// Kinds whose documents form a parent/child tree
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, EntityKind::Element)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown entity kind '{}'", s))
    }
}

/// A stored document. Always an object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Document(Value);

static EMPTY_FIELDS: Map = Map::new();

impl Document {
    /// Bare document with an id and a kind tag
    pub fn new(id: impl Into<String>, kind: EntityKind) -> Self {
        Self(Value::object([
            (fields::ID, Value::string(id)),
            (fields::TYPE, Value::from(kind.as_str())),
        ]))
    }

    pub fn from_value(value: Value) -> Result<Self, CommonError> {
        match value {
            Value::Object(_) => Ok(Self(value)),
            other => Err(CommonError::NotAnObject {
                found: other.kind_name(),
            }),
        }
    }

    pub fn from_fields(fields: Map) -> Self {
        Self(Value::Object(fields))
    }

    /// Builder-style field assignment
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value.into());
        self
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn fields(&self) -> &Map {
        self.0.as_object().unwrap_or(&EMPTY_FIELDS)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn id(&self) -> Option<&str> {
        self.get(fields::ID).and_then(Value::as_str)
    }

    pub fn kind(&self) -> Option<EntityKind> {
        self.get(fields::TYPE)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    pub fn change_marker(&self) -> Option<ChangeMarker> {
        self.get(fields::CHANGE_MARKER)
            .and_then(ChangeMarker::from_value)
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.get(fields::PARENT_ID).and_then(Value::as_str)
    }

    pub fn fractional_index(&self) -> Option<&str> {
        self.get(fields::FRACTIONAL_INDEX).and_then(Value::as_str)
    }

    /// Derived child list; non-string entries are ignored
    pub fn child_ids(&self) -> Vec<DocumentId> {
        self.get(fields::CHILD_IDS)
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn set(&mut self, field: &str, value: Value) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(field.to_string(), value);
        }
    }

    pub(crate) fn set_child_ids(&mut self, ids: Vec<DocumentId>) {
        self.set(
            fields::CHILD_IDS,
            Value::Array(ids.into_iter().map(Value::String).collect()),
        );
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl TryFrom<Value> for Document {
    type Error = CommonError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Document::from_value(value)
    }
}

/// Create a new document of any kind with a fresh id and change marker.
///
/// `extra` fields are applied first; identity fields always win.
pub fn create_document<C: Clock + ?Sized>(kind: EntityKind, extra: Map, clock: &C) -> Document {
    let marker = ChangeMarker::with_clock(clock);
    let mut doc = Document::from_fields(extra);
    doc.set(fields::ID, Value::string(Uuid::new_v4().to_string()));
    doc.set(fields::TYPE, Value::from(kind.as_str()));
    doc.set(fields::CREATED_AT, marker.timestamp.to_value());
    doc.set(fields::CHANGE_MARKER, marker.to_value());
    doc
}

fn named(name: &str) -> Map {
    Map::from([(fields::NAME.to_string(), Value::from(name))])
}

pub fn create_project_document(name: &str) -> Document {
    let doc = create_document(EntityKind::Project, named(name), &SystemClock);
    let created = doc.get(fields::CREATED_AT).cloned().unwrap_or(Value::Null);
    doc.with(fields::UPDATED_AT, created)
}

/// New element under `parent_id` (or a root when `None`)
pub fn create_element_document(
    name: &str,
    parent_id: Option<&str>,
    fractional_index: Option<&str>,
) -> Document {
    let mut extra = named(name);
    extra.insert(fields::STYLE.to_string(), Value::empty_object());
    extra.insert(fields::CHILD_IDS.to_string(), Value::Array(Vec::new()));
    if let Some(parent_id) = parent_id {
        extra.insert(fields::PARENT_ID.to_string(), Value::from(parent_id));
    }
    if let Some(index) = fractional_index {
        extra.insert(fields::FRACTIONAL_INDEX.to_string(), Value::from(index));
    }
    create_document(EntityKind::Element, extra, &SystemClock)
}

pub fn create_asset_document(name: &str, url: &str) -> Document {
    create_document(EntityKind::Asset, named(name), &SystemClock).with("url", url)
}

pub fn create_design_system_document(name: &str) -> Document {
    create_document(EntityKind::DesignSystem, named(name), &SystemClock)
        .with("tokens", Value::empty_object())
}

pub fn create_code_component_document(name: &str) -> Document {
    create_document(EntityKind::CodeComponent, named(name), &SystemClock)
        .with("props", Value::empty_object())
}

pub fn create_dataset_document(name: &str) -> Document {
    create_document(EntityKind::Dataset, named(name), &SystemClock)
        .with("rows", Value::Array(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_wire_names() {
        for kind in EntityKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<EntityKind>(), Ok(kind));
        }
        assert!("widget".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_document_must_be_object() {
        assert!(Document::from_value(Value::from(3)).is_err());
        assert!(serde_json::from_str::<Document>("[1, 2]").is_err());

        let doc: Document = serde_json::from_str(r#"{"id": "a", "type": "asset"}"#).unwrap();
        assert_eq!(doc.id(), Some("a"));
        assert_eq!(doc.kind(), Some(EntityKind::Asset));
    }

    #[test]
    fn test_child_ids_ignores_garbage() {
        let doc = Document::new("p", EntityKind::Element).with(
            fields::CHILD_IDS,
            Value::Array(vec![Value::from("a"), Value::from(1), Value::from("b")]),
        );
        assert_eq!(doc.child_ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_element_factory() {
        let doc = create_element_document("Frame", Some("root"), Some("V"));

        assert_eq!(doc.kind(), Some(EntityKind::Element));
        assert_eq!(doc.parent_id(), Some("root"));
        assert_eq!(doc.fractional_index(), Some("V"));
        assert!(doc.child_ids().is_empty());
        assert!(doc.change_marker().is_some());
        assert!(doc.id().is_some());
    }

    #[test]
    fn test_project_factory_stamps_times() {
        let doc = create_project_document("Landing page");

        assert_eq!(doc.get(fields::NAME), Some(&Value::from("Landing page")));
        assert_eq!(doc.get(fields::UPDATED_AT), doc.get(fields::CREATED_AT));
        assert!(doc.get(fields::CREATED_AT).is_some());
    }

    #[test]
    fn test_factory_identity_fields_win() {
        let extra = Map::from([(fields::ID.to_string(), Value::from("forced"))]);
        let doc = create_document(EntityKind::Dataset, extra, &SystemClock);
        assert_ne!(doc.id(), Some("forced"));
    }

    #[test]
    fn test_atomic_fields_are_not_expanded() {
        let marker = ChangeMarker::create();
        let update = Value::object([(fields::CHANGE_MARKER, marker.to_value())]);
        let flat = cord_common::flatten_with(&update, &flatten_options());

        assert_eq!(flat.len(), 1);
        assert_eq!(flat.get(fields::CHANGE_MARKER), Some(&marker.to_value()));
    }
}
