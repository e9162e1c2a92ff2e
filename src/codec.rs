//! Room document serialization. The on-disk format is a JSON array of
//! records; each record keeps whatever fields its author wrote, and the
//! runtime only interprets `type`, geometry fields, `position` and
//! `rotation`. Angles are degrees on disk and radians in memory; the
//! conversion happens here and nowhere else.

use anyhow::{Context, Result};
use glam::DVec3;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::{KindBuilder, ObjectCatalog, PrimitiveShape};
use crate::errors::RoomError;
use crate::parts::{MaterialSpec, PartNode, PartShape};
use crate::store::{EntitySeed, PlacedEntity};

/// Substitute for a zero or absent color field.
pub const FALLBACK_COLOR: u32 = 0x00ff00;

const COLOR_MAX: f64 = 0xffffff as f64;

/// Wire form of a position vector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vec3Data {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<DVec3> for Vec3Data {
    fn from(v: DVec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vec3Data> for DVec3 {
    fn from(v: Vec3Data) -> Self {
        DVec3::new(v.x, v.y, v.z)
    }
}

/// Wire form of a rotation, degrees per axis. Axes may be omitted
/// independently; a missing axis reads as zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RotationData {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// Degrees to radians, the storage-to-runtime boundary.
pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees * (std::f64::consts::PI / 180.0)
}

/// Radians to degrees, the runtime-to-storage boundary. Inverse of
/// [`degrees_to_radians`] up to floating-point rounding.
pub fn radians_to_degrees(radians: f64) -> f64 {
    radians * (180.0 / std::f64::consts::PI)
}

/// One record the import could not place, with the reason it was skipped.
#[derive(Debug)]
pub struct SkippedEntity {
    pub index: usize,
    pub error: RoomError,
}

/// Outcome of deserializing a room document. Primitives arrive ready with
/// a built node; composites come back as seeds for the async build
/// pipeline; per-entity failures are collected, not fatal.
#[derive(Debug, Default)]
pub struct RoomImport {
    pub ready: Vec<(EntitySeed, PartNode)>,
    pub pending: Vec<EntitySeed>,
    pub skipped: Vec<SkippedEntity>,
}

/// Parses a room document. Fails only when the document itself is
/// malformed (invalid JSON, or the top-level value is not an array);
/// every per-record problem downgrades to a logged skip so one bad entity
/// cannot block the rest of the room.
pub fn deserialize_room(catalog: &ObjectCatalog, raw: &str) -> Result<RoomImport, RoomError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|err| RoomError::parse(err.to_string()))?;
    let Some(records) = document.as_array() else {
        return Err(RoomError::parse("top-level value is not an array"));
    };

    let mut import = RoomImport::default();
    for (index, record) in records.iter().enumerate() {
        match interpret_record(catalog, record) {
            Ok(InterpretedRecord::Ready(seed, node)) => import.ready.push((seed, node)),
            Ok(InterpretedRecord::Pending(seed)) => import.pending.push(seed),
            Err(error) => {
                warn!("[codec] skipping entity {index}: {error}");
                import.skipped.push(SkippedEntity { index, error });
            }
        }
    }
    Ok(import)
}

enum InterpretedRecord {
    Ready(EntitySeed, PartNode),
    Pending(EntitySeed),
}

fn interpret_record(
    catalog: &ObjectCatalog,
    record: &Value,
) -> Result<InterpretedRecord, RoomError> {
    let kind_value = record.get("type");
    let Some(kind_id) = kind_value.and_then(Value::as_str) else {
        return Err(RoomError::CatalogLookup {
            kind: kind_value.map_or_else(|| "(none)".to_string(), Value::to_string),
        });
    };
    let descriptor = catalog.resolve(kind_id)?;

    let seed = EntitySeed {
        kind_id: kind_id.to_string(),
        position: position_from_record(kind_id, record)?,
        rotation: rotation_from_record(kind_id, record)?,
        properties: descriptor.resolved_properties(record),
        original: record.clone(),
    };
    match &descriptor.builder {
        KindBuilder::Primitive(shape) => {
            let node = build_primitive(kind_id, *shape, record)?;
            Ok(InterpretedRecord::Ready(seed, node))
        }
        KindBuilder::Composite(_) => Ok(InterpretedRecord::Pending(seed)),
    }
}

fn position_from_record(kind: &str, record: &Value) -> Result<DVec3, RoomError> {
    match record.get("position") {
        None | Some(Value::Null) => Ok(DVec3::ZERO),
        Some(value) => serde_json::from_value::<Vec3Data>(value.clone())
            .map(DVec3::from)
            .map_err(|err| RoomError::invalid_geometry(kind, format!("bad position: {err}"))),
    }
}

fn rotation_from_record(kind: &str, record: &Value) -> Result<DVec3, RoomError> {
    match record.get("rotation") {
        None | Some(Value::Null) => Ok(DVec3::ZERO),
        // Older documents persisted a single y-axis angle.
        Some(value @ Value::Number(_)) => {
            let degrees = value.as_f64().unwrap_or(0.0);
            Ok(DVec3::new(0.0, degrees_to_radians(degrees), 0.0))
        }
        Some(value) => {
            let data: RotationData = serde_json::from_value(value.clone())
                .map_err(|err| RoomError::invalid_geometry(kind, format!("bad rotation: {err}")))?;
            Ok(DVec3::new(
                degrees_to_radians(data.x),
                degrees_to_radians(data.y),
                degrees_to_radians(data.z),
            ))
        }
    }
}

/// Builds a primitive's render node straight from its record. Geometry
/// fields are required; color falls back to green when zero or absent.
pub fn build_primitive(
    kind: &str,
    shape: PrimitiveShape,
    record: &Value,
) -> Result<PartNode, RoomError> {
    let color = color_from_record(kind, record)?;
    let shape = match shape {
        PrimitiveShape::Box => PartShape::Box {
            width: required_number(kind, record, "width")? as f32,
            height: required_number(kind, record, "height")? as f32,
            depth: required_number(kind, record, "depth")? as f32,
        },
        PrimitiveShape::Sphere => {
            PartShape::Sphere { radius: required_number(kind, record, "radius")? as f32 }
        }
    };
    Ok(PartNode::mesh(shape, MaterialSpec::standard(color)))
}

fn required_number(kind: &str, record: &Value, field: &str) -> Result<f64, RoomError> {
    record.get(field).and_then(Value::as_f64).ok_or_else(|| {
        RoomError::invalid_geometry(kind, format!("`{field}` must be present and numeric"))
    })
}

fn color_from_record(kind: &str, record: &Value) -> Result<u32, RoomError> {
    let value = match record.get("color") {
        None | Some(Value::Null) => return Ok(FALLBACK_COLOR),
        Some(value) => value,
    };
    let Some(color) = value.as_f64() else {
        return Err(RoomError::invalid_geometry(kind, "`color` must be a number"));
    };
    if color == 0.0 {
        return Ok(FALLBACK_COLOR);
    }
    if color.fract() != 0.0 || !(0.0..=COLOR_MAX).contains(&color) {
        return Err(RoomError::invalid_geometry(
            kind,
            format!("`color` {color} is outside the 24-bit range"),
        ));
    }
    Ok(color as u32)
}

/// Serializes placed entities back to the document format, insertion order.
/// Each record is the entity's original data with the live transform written
/// over `position` and `rotation` (converted back to degrees), so fields the
/// runtime never interpreted survive the round trip.
pub fn serialize_room(entities: &[PlacedEntity]) -> Result<String> {
    let records: Vec<Value> = entities.iter().map(export_record).collect();
    serde_json::to_string_pretty(&Value::Array(records)).context("serializing room document")
}

pub fn export_record(entity: &PlacedEntity) -> Value {
    let mut record = entity.original.as_object().cloned().unwrap_or_default();
    record.insert("position".to_string(), vec3_value(entity.position));
    record.insert("rotation".to_string(), degrees_value(entity.rotation));
    Value::Object(record)
}

fn vec3_value(v: DVec3) -> Value {
    json!({ "x": json_number(v.x), "y": json_number(v.y), "z": json_number(v.z) })
}

fn degrees_value(radians: DVec3) -> Value {
    json!({
        "x": json_number(radians_to_degrees(radians.x)),
        "y": json_number(radians_to_degrees(radians.y)),
        "z": json_number(radians_to_degrees(radians.z)),
    })
}

/// Integral values print as JSON integers, fractional ones keep their float
/// form. Keeps re-exported documents looking like their hand-written inputs.
fn json_number(value: f64) -> Value {
    const MAX_INTEGRAL: f64 = 9_007_199_254_740_992.0;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_INTEGRAL {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn catalog() -> ObjectCatalog {
        ObjectCatalog::with_builtin_kinds()
    }

    #[test]
    fn degree_radian_boundary_round_trips() {
        for degrees in [0.0, 37.5, 90.0, 180.0, -450.0] {
            let radians = degrees_to_radians(degrees);
            assert!((radians_to_degrees(radians) - degrees).abs() < 1e-9);
        }
        assert_eq!(degrees_to_radians(0.0), 0.0);
        assert!((degrees_to_radians(180.0) - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn color_zero_or_absent_falls_back_to_green() {
        let bare = json!({ "type": "box", "width": 1, "height": 1, "depth": 1 });
        assert_eq!(color_from_record("box", &bare).unwrap(), FALLBACK_COLOR);

        let zeroed = json!({ "color": 0 });
        assert_eq!(color_from_record("box", &zeroed).unwrap(), FALLBACK_COLOR);

        let red = json!({ "color": 16711680 });
        assert_eq!(color_from_record("box", &red).unwrap(), 0xff0000);
    }

    #[test]
    fn out_of_range_colors_are_rejected() {
        for bad in [json!({ "color": -5 }), json!({ "color": 16777216 }), json!({ "color": "red" })]
        {
            assert!(matches!(
                color_from_record("box", &bad),
                Err(RoomError::InvalidGeometry { .. })
            ));
        }
    }

    #[test]
    fn legacy_scalar_rotation_reads_as_y_degrees() {
        let record = json!({ "rotation": 90 });
        let rotation = rotation_from_record("chair", &record).unwrap();
        assert_eq!(rotation.x, 0.0);
        assert!((rotation.y - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(rotation.z, 0.0);
    }

    #[test]
    fn partial_rotation_defaults_missing_axes() {
        let record = json!({ "rotation": { "y": 180 } });
        let rotation = rotation_from_record("chair", &record).unwrap();
        assert_eq!(rotation.x, 0.0);
        assert!((rotation.y - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(rotation.z, 0.0);
    }

    #[test]
    fn top_level_must_be_an_array() {
        let err = deserialize_room(&catalog(), "{\"objects\": []}").unwrap_err();
        assert!(matches!(err, RoomError::Parse { .. }));
        let err = deserialize_room(&catalog(), "not json").unwrap_err();
        assert!(matches!(err, RoomError::Parse { .. }));
    }

    #[test]
    fn unknown_kind_is_skipped_not_fatal() {
        let raw = json!([
            { "type": "box", "width": 1, "height": 1, "depth": 1, "color": 255 },
            { "type": "tabel" },
            { "missing": "type" }
        ])
        .to_string();
        let import = deserialize_room(&catalog(), &raw).unwrap();
        assert_eq!(import.ready.len(), 1);
        assert_eq!(import.pending.len(), 0);
        assert_eq!(import.skipped.len(), 2);
        assert_eq!(import.skipped[0].index, 1);
        assert_eq!(import.skipped[1].index, 2);
    }

    #[test]
    fn primitive_missing_geometry_is_skipped() {
        let raw = json!([{ "type": "box", "width": 1, "height": 1 }]).to_string();
        let import = deserialize_room(&catalog(), &raw).unwrap();
        assert!(import.ready.is_empty());
        assert_eq!(import.skipped.len(), 1);
        assert!(matches!(import.skipped[0].error, RoomError::InvalidGeometry { .. }));
    }

    #[test]
    fn composite_records_come_back_pending_with_resolved_size() {
        let raw = json!([chair_record()]).to_string();
        let import = deserialize_room(&catalog(), &raw).unwrap();
        assert!(import.ready.is_empty());
        assert_eq!(import.pending.len(), 1);
        let seed = &import.pending[0];
        assert_eq!(seed.kind_id, "chair");
        assert_eq!(seed.properties.get("size"), Some(&Value::from(2.5)));
        assert!((seed.rotation.y - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    fn chair_record() -> Value {
        json!({
            "type": "chair",
            "properties": { "size": 2.5 },
            "position": { "x": 1.0, "y": 0.0, "z": -2.0 },
            "rotation": { "x": 0, "y": 90, "z": 0 }
        })
    }

    #[test]
    fn export_overwrites_transform_and_keeps_everything_else() {
        let entity = PlacedEntity {
            handle: bevy_ecs::entity::Entity::from_raw(7),
            kind_id: "box".to_string(),
            position: DVec3::new(1.5, 0.0, -3.0),
            rotation: DVec3::ZERO,
            properties: Map::new(),
            original: json!({
                "type": "box",
                "width": 2,
                "height": 1,
                "depth": 1,
                "color": 255,
                "label": "crate",
                "position": { "x": 0, "y": 0, "z": 0 }
            }),
        };
        let record = export_record(&entity);
        assert_eq!(record["label"], "crate");
        assert_eq!(record["width"], 2);
        assert_eq!(record["position"], json!({ "x": 1.5, "y": 0, "z": -3 }));
        assert_eq!(record["rotation"], json!({ "x": 0, "y": 0, "z": 0 }));
    }

    #[test]
    fn integral_exports_print_as_integers() {
        assert_eq!(json_number(0.0), Value::from(0));
        assert_eq!(json_number(-3.0), Value::from(-3));
        assert_eq!(json_number(0.5), Value::from(0.5));
    }
}
