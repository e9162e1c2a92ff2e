//! Built-in composite models. Each builder reads the instance record it was
//! handed (uniform `size`, plus quirks like the trash bin's altitude), builds
//! a part tree, and recenters it so the model pivots around its visual
//! center.

use anyhow::Result;
use serde_json::Value;
use std::f32::consts::{FRAC_PI_2, PI};

use crate::catalog::{CompositeBuilder, ObjectCatalog, PropertySpec};
use crate::parts::{LodLevel, MaterialSpec, PartNode, PartShape};

const WOOD: u32 = 0x9b8c75;
const STEEL: u32 = 0xd9d7d7;
const LOD_NEAR: f32 = 200.0;
const LOD_FAR: f32 = 900.0;

/// Registers the seven built-in composite kinds in their canonical order.
pub fn register_builtin(catalog: &mut ObjectCatalog) {
    catalog.register_composite("cauSign", "CAUSign", size_schema(), CompositeBuilder::blocking(cau_sign));
    catalog.register_composite("chair", "chair", size_schema(), CompositeBuilder::blocking(chair));
    catalog.register_composite(
        "hellokitty",
        "helloKitty",
        size_schema(),
        CompositeBuilder::blocking(hello_kitty),
    );
    catalog.register_composite("seatbank", "seatbank", size_schema(), CompositeBuilder::blocking(seatbank));
    catalog.register_composite("table2", "table2", size_schema(), CompositeBuilder::blocking(table2));
    catalog.register_composite("trashbin", "trash bin", Vec::new(), CompositeBuilder::blocking(trashbin));
    catalog.register_composite(
        "whiteboard",
        "whiteboard",
        size_schema(),
        CompositeBuilder::blocking(whiteboard),
    );
}

fn size_schema() -> Vec<PropertySpec> {
    vec![PropertySpec::number("size", "Size", 1.0)]
}

/// `properties.size`, with zero and absent both falling back to 1.
fn scale_factor(record: &Value) -> f32 {
    record
        .pointer("/properties/size")
        .and_then(Value::as_f64)
        .filter(|size| *size != 0.0)
        .map(|size| size as f32)
        .unwrap_or(1.0)
}

/// The trash bin reads its altitude as the *length* of an optional string or
/// list property; any other value means ground level.
fn altitude_length(record: &Value) -> f32 {
    match record.pointer("/properties/altitude") {
        Some(Value::String(text)) => text.chars().count() as f32,
        Some(Value::Array(items)) => items.len() as f32,
        _ => 0.0,
    }
}

fn box_part(width: f32, height: f32, depth: f32, material: MaterialSpec) -> PartNode {
    PartNode::mesh(PartShape::Box { width, height, depth }, material)
}

fn cylinder_part(radius: f32, height: f32, radial_segments: u32, material: MaterialSpec) -> PartNode {
    PartNode::mesh(
        PartShape::Cylinder {
            radius_top: radius,
            radius_bottom: radius,
            height,
            radial_segments,
            open_ended: false,
        },
        material,
    )
}

fn two_level_lod(node: PartNode) -> PartNode {
    PartNode::lod(vec![
        LodLevel { draw_distance: LOD_NEAR, node: node.clone() },
        LodLevel { draw_distance: LOD_FAR, node },
    ])
}

fn cau_sign(record: &Value) -> Result<PartNode> {
    let panel = box_part(0.9, 0.3, 0.05, MaterialSpec::lambert(0xcccccc)).at(0.0, 0.5, 0.0);
    Ok(panel.centered().with_scale(scale_factor(record)))
}

fn chair(record: &Value) -> Result<PartNode> {
    let mut parts = vec![
        box_part(0.5, 0.05, 0.5, MaterialSpec::lambert(WOOD)).at(0.0, 0.25, 0.0),
        box_part(0.5, 0.5, 0.05, MaterialSpec::lambert(WOOD)).at(0.0, 0.5, -0.225),
    ];
    for (x, z) in [(-0.2, 0.2), (0.2, 0.2), (-0.2, -0.2), (0.2, -0.2)] {
        parts.push(cylinder_part(0.02, 0.25, 8, MaterialSpec::lambert(STEEL)).at(x, 0.125, z));
    }
    let lod = two_level_lod(PartNode::group(parts)).with_scale(scale_factor(record));
    Ok(lod.centered())
}

fn hello_kitty(record: &Value) -> Result<PartNode> {
    let white = MaterialSpec::lambert(0xffffff);
    let ink = MaterialSpec::unlit(0x000000);
    let pink = MaterialSpec::lambert(0xffb6c1);
    let bow_pink = MaterialSpec::lambert(0xff69b4);

    let eye = |x: f32| {
        PartNode::mesh(PartShape::Sphere { radius: 0.05 }, ink)
            .at(x, 0.6, 0.46)
            .rotated(-FRAC_PI_2, 0.0, 0.0)
    };
    let whisker = |direction: f32| {
        PartNode::mesh(
            PartShape::Polyline {
                points: vec![
                    glam::Vec3::new(0.1 * direction, 0.55, 0.44),
                    glam::Vec3::new(0.3 * direction, 0.55, 0.44),
                ],
            },
            MaterialSpec::line(0x000000),
        )
    };
    let ear = |x: f32, tilt: f32| {
        PartNode::mesh(PartShape::Cone { radius: 0.1, height: 0.2, radial_segments: 32 }, white)
            .at(x, 1.0, 0.0)
            .rotated(0.0, 0.0, tilt)
    };

    let bow = PartNode::group(vec![
        box_part(0.12, 0.06, 0.02, bow_pink).at(-0.55, 0.65, 0.2),
        box_part(0.12, 0.06, 0.02, bow_pink).at(-0.35, 0.65, 0.2),
        PartNode::mesh(PartShape::Sphere { radius: 0.04 }, bow_pink).at(-0.45, 0.65, 0.22),
    ]);

    let kitty = PartNode::group(vec![
        PartNode::mesh(PartShape::Sphere { radius: 0.5 }, white).at(0.0, 0.5, 0.0),
        eye(-0.15),
        eye(0.15),
        PartNode::mesh(PartShape::Disc { radius: 0.03, segments: 16 }, pink)
            .at(0.0, 0.55, 0.45)
            .rotated(-FRAC_PI_2, 0.0, 0.0),
        whisker(-1.0),
        whisker(1.0),
        ear(-0.35, PI / 10.0),
        ear(0.35, -PI / 10.0),
        bow,
    ]);
    Ok(kitty.centered().with_scale(scale_factor(record)))
}

fn seatbank(record: &Value) -> Result<PartNode> {
    let mut table = vec![box_part(3.0, 0.05, 1.2, MaterialSpec::lambert(WOOD)).at(0.0, 1.0, 0.0)];
    for (x, z) in [(-1.45, -0.55), (1.45, -0.55), (-1.45, 0.55), (1.45, 0.55)] {
        table.push(cylinder_part(0.02, 0.8, 16, MaterialSpec::lambert(STEEL)).at(x, 0.6, z));
    }

    let bench_wood = MaterialSpec::lambert(0x403b3b);
    let bench = PartNode::group(vec![
        box_part(3.0, 0.15, 0.4, bench_wood).at(0.0, 0.5, 0.0),
        box_part(3.0, 0.3, 0.1, bench_wood).at(0.0, 0.65, -0.15),
        cylinder_part(0.04, 0.5, 16, MaterialSpec::lambert(0xaaaaaa)).at(-1.45, 0.25, 0.15),
        cylinder_part(0.04, 0.5, 16, MaterialSpec::lambert(0xaaaaaa)).at(1.45, 0.25, 0.15),
    ])
    .at(0.0, 0.0, -0.8);

    let model = PartNode::group(vec![PartNode::group(table), bench]);
    Ok(model.centered().with_scale(scale_factor(record)))
}

fn table2(record: &Value) -> Result<PartNode> {
    let mut parts = vec![box_part(2.0, 0.05, 0.8, MaterialSpec::lambert(WOOD)).at(0.0, 1.0, 0.0)];
    for (x, z) in [(-0.9, -0.35), (0.9, -0.35), (-0.9, 0.35), (0.9, 0.35)] {
        parts.push(cylinder_part(0.02, 0.8, 16, MaterialSpec::lambert(STEEL)).at(x, 0.6, z));
    }
    Ok(PartNode::group(parts).centered().with_scale(scale_factor(record)))
}

fn trashbin(record: &Value) -> Result<PartNode> {
    let gray = MaterialSpec::lambert(0xdddddd).double_sided();
    let wall = PartNode::mesh(
        PartShape::Cylinder {
            radius_top: 0.3,
            radius_bottom: 0.25,
            height: 0.5,
            radial_segments: 80,
            open_ended: true,
        },
        gray,
    )
    .at(0.0, 0.3, 0.0);
    let base = cylinder_part(0.25, 0.1, 80, gray).with_child(wall);

    let lod = two_level_lod(PartNode::group(vec![base])).with_scale(scale_factor(record));
    let rest_height = 1.25 + altitude_length(record);
    Ok(lod.centered().at(0.0, rest_height, 0.0))
}

fn whiteboard(record: &Value) -> Result<PartNode> {
    let board = box_part(5.0, 2.0, 0.1, MaterialSpec::lambert(0xffffff)).at(0.0, 2.5, 0.0);
    Ok(board.centered().with_scale(scale_factor(record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use serde_json::json;

    fn bare_record(kind: &str) -> Value {
        json!({ "type": kind })
    }

    fn assert_centered(node: &PartNode) {
        let center = node.bounds().expect("model should have bounds").center();
        assert!(center.abs().max_element() < 1e-4, "model center {center:?} not at origin");
    }

    #[test]
    fn chair_has_seat_back_and_four_legs_per_level() {
        let node = chair(&bare_record("chair")).unwrap();
        // Two LOD levels, each with seat + back + 4 legs.
        assert_eq!(node.part_count(), 12);
        assert_centered(&node);
    }

    #[test]
    fn table2_spans_two_meters() {
        let node = table2(&bare_record("table2")).unwrap();
        let size = node.bounds().unwrap().size();
        assert!((size.x - 2.0).abs() < 1e-4);
        assert!((size.z - 0.8).abs() < 1e-4);
        assert_centered(&node);
    }

    #[test]
    fn size_property_scales_the_model() {
        let record = json!({ "type": "whiteboard", "properties": { "size": 2.0 } });
        let node = whiteboard(&record).unwrap();
        let size = node.bounds().unwrap().size();
        assert!((size.x - 10.0).abs() < 1e-3);
        assert!((size.y - 4.0).abs() < 1e-3);
    }

    #[test]
    fn zero_size_falls_back_to_one() {
        let record = json!({ "type": "whiteboard", "properties": { "size": 0 } });
        let node = whiteboard(&record).unwrap();
        let size = node.bounds().unwrap().size();
        assert!((size.x - 5.0).abs() < 1e-4);
    }

    #[test]
    fn trashbin_rests_above_the_floor() {
        let node = trashbin(&bare_record("trashbin")).unwrap();
        let center = node.bounds().unwrap().center();
        assert!((center.y - 1.25).abs() < 1e-4);
        assert!(center.x.abs() < 1e-4 && center.z.abs() < 1e-4);
    }

    #[test]
    fn trashbin_altitude_reads_length_of_string() {
        let record = json!({ "type": "trashbin", "properties": { "altitude": "abcd" } });
        let node = trashbin(&record).unwrap();
        let center = node.bounds().unwrap().center();
        assert!((center.y - 5.25).abs() < 1e-4);

        let numeric = json!({ "type": "trashbin", "properties": { "altitude": 3 } });
        let grounded = trashbin(&numeric).unwrap();
        assert!((grounded.bounds().unwrap().center().y - 1.25).abs() < 1e-4);
    }

    #[test]
    fn hello_kitty_keeps_whiskers_and_bow() {
        let node = hello_kitty(&bare_record("hellokitty")).unwrap();
        // head + 2 eyes + nose + 2 whiskers + 2 ears + 3 bow parts
        assert_eq!(node.part_count(), 11);
        assert_centered(&node);
    }

    #[test]
    fn seatbank_bench_sits_beside_the_table() {
        let node = seatbank(&bare_record("seatbank")).unwrap();
        let size = node.bounds().unwrap().size();
        assert!((size.x - 3.0).abs() < 1e-4);
        // Table spans z -0.6..0.6, the bench pushes the near edge to -1.0.
        assert!(size.z > 1.5);
        assert_centered(&node);
    }

    #[test]
    fn whiteboard_is_wall_sized() {
        let node = whiteboard(&bare_record("whiteboard")).unwrap();
        let size = node.bounds().unwrap().size();
        assert_eq!(size, Vec3::new(5.0, 2.0, 0.1));
    }

    #[test]
    fn every_builtin_model_recenters_to_the_origin() {
        let builders: [(&str, fn(&Value) -> Result<PartNode>); 6] = [
            ("cauSign", cau_sign),
            ("chair", chair),
            ("hellokitty", hello_kitty),
            ("seatbank", seatbank),
            ("table2", table2),
            ("whiteboard", whiteboard),
        ];
        for (kind, build) in builders {
            let node = build(&bare_record(kind)).unwrap();
            let center = node.bounds().expect("model should have bounds").center();
            assert!(center.abs().max_element() < 1e-4, "{kind} center {center:?} not at origin");
        }
        // The trash bin floats at its rest height but stays centered on x/z.
        let bin = trashbin(&bare_record("trashbin")).unwrap();
        let center = bin.bounds().unwrap().center();
        assert!(center.x.abs() < 1e-4 && center.z.abs() < 1e-4);
    }
}
