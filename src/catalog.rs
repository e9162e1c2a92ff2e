use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Map, Value};

use crate::errors::RoomError;
use crate::models;
use crate::parts::PartNode;

/// Future returned by a composite builder, resolving to the model's part
/// tree.
pub type ModelFuture = BoxFuture<'static, Result<PartNode>>;

/// Asynchronous constructor for a composite kind. The instance record is
/// forwarded verbatim, so builders can read any field the document carried.
#[derive(Clone)]
pub struct CompositeBuilder {
    build: Arc<dyn Fn(Value) -> ModelFuture + Send + Sync>,
}

impl CompositeBuilder {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(Value) -> ModelFuture + Send + Sync + 'static,
    {
        Self { build: Arc::new(build) }
    }

    /// Wraps a synchronous build function; the built-in models resolve
    /// immediately but still go through the async contract.
    pub fn blocking<F>(build: F) -> Self
    where
        F: Fn(&Value) -> Result<PartNode> + Send + Sync + 'static,
    {
        Self::new(move |record| futures::future::ready(build(&record)).boxed())
    }

    pub fn build(&self, record: Value) -> ModelFuture {
        (self.build)(record)
    }
}

impl fmt::Debug for CompositeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompositeBuilder")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveShape {
    Box,
    Sphere,
}

/// How instances of a kind are constructed: primitives synchronously from
/// geometry fields, composites through their async builder.
#[derive(Debug, Clone)]
pub enum KindBuilder {
    Primitive(PrimitiveShape),
    Composite(CompositeBuilder),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Number,
}

#[derive(Debug, Clone)]
pub struct PropertySpec {
    pub name: String,
    pub label: String,
    pub kind: PropertyKind,
    pub default_value: f64,
}

impl PropertySpec {
    pub fn number(name: &str, label: &str, default_value: f64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: PropertyKind::Number,
            default_value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectKindDescriptor {
    pub kind_id: String,
    pub display_name: String,
    pub property_schema: Vec<PropertySpec>,
    pub builder: KindBuilder,
    /// Record a freshly spawned instance starts from.
    pub default_record: Value,
}

impl ObjectKindDescriptor {
    pub fn is_composite(&self) -> bool {
        matches!(self.builder, KindBuilder::Composite(_))
    }

    /// Properties of `record` with schema defaults filled in for anything the
    /// record left out. The record itself is not modified.
    pub fn resolved_properties(&self, record: &Value) -> Map<String, Value> {
        let mut properties = record
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for spec in &self.property_schema {
            if !properties.contains_key(&spec.name) {
                properties.insert(spec.name.clone(), Value::from(spec.default_value));
            }
        }
        properties
    }
}

/// Static registry of everything that can be placed in a room. Fully
/// populated at startup; `resolve` is the only lookup path, so an unknown
/// kind always surfaces as an error rather than a silent default.
#[derive(Default)]
pub struct ObjectCatalog {
    entries: HashMap<String, ObjectKindDescriptor>,
    order: Vec<String>,
}

impl ObjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the stock kinds: the seven composite models followed by
    /// the box and sphere primitives.
    pub fn with_builtin_kinds() -> Self {
        let mut catalog = Self::new();
        models::register_builtin(&mut catalog);
        catalog.register_primitive(
            "box",
            "Box",
            PrimitiveShape::Box,
            json!({ "type": "box", "width": 1, "height": 1, "depth": 1, "color": 16711680 }),
        );
        catalog.register_primitive(
            "sphere",
            "Sphere",
            PrimitiveShape::Sphere,
            json!({ "type": "sphere", "radius": 0.5, "color": 65280 }),
        );
        catalog
    }

    pub fn register_primitive(
        &mut self,
        kind_id: &str,
        display_name: &str,
        shape: PrimitiveShape,
        default_record: Value,
    ) {
        self.insert(ObjectKindDescriptor {
            kind_id: kind_id.to_string(),
            display_name: display_name.to_string(),
            property_schema: Vec::new(),
            builder: KindBuilder::Primitive(shape),
            default_record,
        });
    }

    pub fn register_composite(
        &mut self,
        kind_id: &str,
        display_name: &str,
        property_schema: Vec<PropertySpec>,
        builder: CompositeBuilder,
    ) {
        let default_record =
            json!({ "type": kind_id, "selected": false, "properties": { "size": 1 } });
        self.insert(ObjectKindDescriptor {
            kind_id: kind_id.to_string(),
            display_name: display_name.to_string(),
            property_schema,
            builder: KindBuilder::Composite(builder),
            default_record,
        });
    }

    fn insert(&mut self, descriptor: ObjectKindDescriptor) {
        let kind_id = descriptor.kind_id.clone();
        if self.entries.insert(kind_id.clone(), descriptor).is_none() {
            self.order.push(kind_id);
        }
    }

    pub fn resolve(&self, kind_id: &str) -> Result<&ObjectKindDescriptor, RoomError> {
        self.entries
            .get(kind_id)
            .ok_or_else(|| RoomError::CatalogLookup { kind: kind_id.to_string() })
    }

    pub fn contains(&self, kind_id: &str) -> bool {
        self.entries.contains_key(kind_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All kinds in browsing order: composites in registration order, then
    /// primitives in registration order.
    pub fn list_all(&self) -> Vec<&ObjectKindDescriptor> {
        let ordered = || self.order.iter().filter_map(|kind_id| self.entries.get(kind_id));
        let mut kinds: Vec<&ObjectKindDescriptor> =
            ordered().filter(|descriptor| descriptor.is_composite()).collect();
        kinds.extend(ordered().filter(|descriptor| !descriptor.is_composite()));
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_lists_composites_before_primitives() {
        let catalog = ObjectCatalog::with_builtin_kinds();
        let ids: Vec<&str> = catalog.list_all().iter().map(|d| d.kind_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "cauSign",
                "chair",
                "hellokitty",
                "seatbank",
                "table2",
                "trashbin",
                "whiteboard",
                "box",
                "sphere"
            ]
        );
    }

    #[test]
    fn primitives_stay_last_even_when_registered_first() {
        let mut catalog = ObjectCatalog::new();
        catalog.register_primitive("box", "Box", PrimitiveShape::Box, json!({ "type": "box" }));
        catalog.register_composite(
            "crate",
            "Crate",
            Vec::new(),
            CompositeBuilder::blocking(|_| {
                Ok(crate::parts::PartNode::group(Vec::new()))
            }),
        );
        let ids: Vec<&str> = catalog.list_all().iter().map(|d| d.kind_id.as_str()).collect();
        assert_eq!(ids, vec!["crate", "box"]);
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let catalog = ObjectCatalog::with_builtin_kinds();
        let err = catalog.resolve("tabel").unwrap_err();
        assert!(matches!(err, RoomError::CatalogLookup { kind } if kind == "tabel"));
    }

    #[test]
    fn trash_bin_has_no_schema_but_a_sized_default_record() {
        let catalog = ObjectCatalog::with_builtin_kinds();
        let descriptor = catalog.resolve("trashbin").unwrap();
        assert_eq!(descriptor.display_name, "trash bin");
        assert!(descriptor.property_schema.is_empty());
        assert_eq!(descriptor.default_record.pointer("/properties/size"), Some(&Value::from(1)));
    }

    #[test]
    fn resolved_properties_fill_schema_defaults() {
        let catalog = ObjectCatalog::with_builtin_kinds();
        let descriptor = catalog.resolve("chair").unwrap();

        let bare = json!({ "type": "chair" });
        let properties = descriptor.resolved_properties(&bare);
        assert_eq!(properties.get("size"), Some(&Value::from(1.0)));

        let sized = json!({ "type": "chair", "properties": { "size": 3 } });
        let properties = descriptor.resolved_properties(&sized);
        assert_eq!(properties.get("size"), Some(&Value::from(3)));
    }
}
