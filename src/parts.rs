use glam::{EulerRot, Quat, Vec3};

/// How a part's flat color reacts to lighting. Mirrors the material split the
/// built-in models rely on: primitives render `Standard`, model surfaces
/// `Lambert`, inked details `Unlit`, and wire details `Line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    Standard,
    Lambert,
    Unlit,
    Line,
}

/// Flat 24-bit color plus shading mode for one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialSpec {
    pub color: u32,
    pub shading: Shading,
    pub double_sided: bool,
}

impl MaterialSpec {
    pub fn standard(color: u32) -> Self {
        Self { color, shading: Shading::Standard, double_sided: false }
    }

    pub fn lambert(color: u32) -> Self {
        Self { color, shading: Shading::Lambert, double_sided: false }
    }

    pub fn unlit(color: u32) -> Self {
        Self { color, shading: Shading::Unlit, double_sided: false }
    }

    pub fn line(color: u32) -> Self {
        Self { color, shading: Shading::Line, double_sided: false }
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }
}

#[derive(Debug, Clone)]
pub enum PartShape {
    Box { width: f32, height: f32, depth: f32 },
    Sphere { radius: f32 },
    Cylinder { radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32, open_ended: bool },
    Cone { radius: f32, height: f32, radial_segments: u32 },
    Disc { radius: f32, segments: u32 },
    Polyline { points: Vec<Vec3> },
    Group,
    Lod { levels: Vec<LodLevel> },
}

/// One level-of-detail entry: `node` is drawn once the camera distance
/// reaches `draw_distance`.
#[derive(Debug, Clone)]
pub struct LodLevel {
    pub draw_distance: f32,
    pub node: PartNode,
}

/// One node of a renderable model: a shape with an optional material and a
/// local transform, plus child nodes. The rendering engine walks this tree;
/// nothing here depends on any particular renderer.
#[derive(Debug, Clone)]
pub struct PartNode {
    pub shape: PartShape,
    pub material: Option<MaterialSpec>,
    pub translation: Vec3,
    /// Euler angles in radians, applied X then Y then Z.
    pub rotation: Vec3,
    pub scale: Vec3,
    pub children: Vec<PartNode>,
}

impl PartNode {
    pub fn mesh(shape: PartShape, material: MaterialSpec) -> Self {
        Self {
            shape,
            material: Some(material),
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            children: Vec::new(),
        }
    }

    pub fn group(children: Vec<PartNode>) -> Self {
        Self {
            shape: PartShape::Group,
            material: None,
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            children,
        }
    }

    pub fn lod(levels: Vec<LodLevel>) -> Self {
        Self {
            shape: PartShape::Lod { levels },
            material: None,
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            children: Vec::new(),
        }
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.translation = Vec3::new(x, y, z);
        self
    }

    /// Radians, X/Y/Z order.
    pub fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Vec3::new(x, y, z);
        self
    }

    pub fn with_scale(mut self, factor: f32) -> Self {
        self.scale = Vec3::splat(factor);
        self
    }

    pub fn with_child(mut self, child: PartNode) -> Self {
        self.children.push(child);
        self
    }

    /// World-space bounding box of this node and everything below it, with the
    /// node's own transform applied. Conservative for rotated parts (the box
    /// of the rotated box). `None` for empty groups.
    pub fn bounds(&self) -> Option<Aabb> {
        let mut merged = self.shape.local_bounds();
        for child in &self.children {
            if let Some(child_bounds) = child.bounds() {
                merged = Some(match merged {
                    Some(aabb) => aabb.union(child_bounds),
                    None => child_bounds,
                });
            }
        }
        merged.map(|aabb| aabb.transformed(self.translation, self.rotation, self.scale))
    }

    /// Wraps this node in a group, shifted so its bounding-box center lands on
    /// the group origin. Builders use this to make models pivot around their
    /// visual center rather than their authored coordinates.
    pub fn centered(mut self) -> PartNode {
        if let Some(aabb) = self.bounds() {
            self.translation -= aabb.center();
        }
        PartNode::group(vec![self])
    }

    /// Number of drawable leaf parts (meshes and polylines), all LOD levels
    /// counted.
    pub fn part_count(&self) -> usize {
        let own = match &self.shape {
            PartShape::Group => 0,
            PartShape::Lod { levels } => levels.iter().map(|level| level.node.part_count()).sum(),
            _ => 1,
        };
        own + self.children.iter().map(PartNode::part_count).sum::<usize>()
    }
}

impl PartShape {
    fn local_bounds(&self) -> Option<Aabb> {
        match self {
            PartShape::Box { width, height, depth } => {
                Some(Aabb::from_half_extents(Vec3::new(width / 2.0, height / 2.0, depth / 2.0)))
            }
            PartShape::Sphere { radius } => Some(Aabb::from_half_extents(Vec3::splat(*radius))),
            PartShape::Cylinder { radius_top, radius_bottom, height, .. } => {
                let radius = radius_top.max(*radius_bottom);
                Some(Aabb::from_half_extents(Vec3::new(radius, height / 2.0, radius)))
            }
            PartShape::Cone { radius, height, .. } => {
                Some(Aabb::from_half_extents(Vec3::new(*radius, height / 2.0, *radius)))
            }
            PartShape::Disc { radius, .. } => {
                Some(Aabb::from_half_extents(Vec3::new(*radius, *radius, 0.0)))
            }
            PartShape::Polyline { points } => {
                let first = *points.first()?;
                let mut aabb = Aabb { min: first, max: first };
                for point in &points[1..] {
                    aabb.min = aabb.min.min(*point);
                    aabb.max = aabb.max.max(*point);
                }
                Some(aabb)
            }
            PartShape::Group => None,
            PartShape::Lod { levels } => {
                let mut merged: Option<Aabb> = None;
                for level in levels {
                    if let Some(level_bounds) = level.node.bounds() {
                        merged = Some(match merged {
                            Some(aabb) => aabb.union(level_bounds),
                            None => level_bounds,
                        });
                    }
                }
                merged
            }
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    fn from_half_extents(half: Vec3) -> Self {
        Self { min: -half, max: half }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn union(self, other: Aabb) -> Aabb {
        Aabb { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    fn transformed(&self, translation: Vec3, rotation: Vec3, scale: Vec3) -> Aabb {
        let rot = Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for corner in self.corners() {
            let point = rot * (corner * scale) + translation;
            min = min.min(point);
            max = max.max(point);
        }
        Aabb { min, max }
    }
}
