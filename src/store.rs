use bevy_ecs::prelude::*;
use glam::DVec3;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::errors::RoomError;
use crate::events::{EventBus, RoomEvent};
use crate::parts::PartNode;

// ---------- Components ----------

#[derive(Component, Clone)]
pub struct Kind(pub String);

/// World placement at document precision. Part geometry below the placed
/// node stays f32; the transform is f64 so import/export round-trips hold.
#[derive(Component, Clone, Copy)]
pub struct Transform3D {
    pub position: DVec3,
    /// Euler angles in radians. Files carry degrees; the codec converts.
    pub rotation: DVec3,
}

impl Default for Transform3D {
    fn default() -> Self {
        Self { position: DVec3::ZERO, rotation: DVec3::ZERO }
    }
}

/// Kind-specific parameters with schema defaults already applied.
#[derive(Component, Clone)]
pub struct Properties(pub Map<String, Value>);

/// The verbatim record this entity was constructed from. Export merges the
/// live transform into this, so fields the store never interprets survive a
/// round trip.
#[derive(Component, Clone)]
pub struct SourceRecord(pub Value);

/// Built render node. Every stored entity has one; composites only enter the
/// store once their build resolves.
#[derive(Component, Clone)]
pub struct Model(pub Arc<PartNode>);

/// Everything needed to place one entity. Produced by the codec (import) or
/// the session (spawn); carried through async builds for composites.
#[derive(Debug, Clone)]
pub struct EntitySeed {
    pub kind_id: String,
    pub position: DVec3,
    /// Radians.
    pub rotation: DVec3,
    pub properties: Map<String, Value>,
    pub original: Value,
}

/// Read-only snapshot of one placed entity.
#[derive(Debug, Clone)]
pub struct PlacedEntity {
    pub handle: Entity,
    pub kind_id: String,
    pub position: DVec3,
    /// Radians.
    pub rotation: DVec3,
    pub properties: Map<String, Value>,
    pub original: Value,
}

// ---------- World container ----------

/// The single source of truth for what is in the room. Entities live in a
/// `bevy_ecs` world so handles are generational; a separate insertion-order
/// index keeps `all()` and export stable. `generation` advances on every
/// `clear`, letting the session discard async build results that belong to a
/// previous room.
pub struct RoomWorld {
    pub world: World,
    order: Vec<Entity>,
    generation: u64,
}

impl Default for RoomWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomWorld {
    pub fn new() -> Self {
        let mut world = World::new();
        world.insert_resource(EventBus::default());
        Self { world, order: Vec::new(), generation: 0 }
    }

    pub fn place(&mut self, seed: EntitySeed, node: PartNode) -> Entity {
        let EntitySeed { kind_id, position, rotation, properties, original } = seed;
        let entity = self
            .world
            .spawn((
                Kind(kind_id.clone()),
                Transform3D { position, rotation },
                Properties(properties),
                SourceRecord(original),
                Model(Arc::new(node)),
            ))
            .id();
        self.order.push(entity);
        self.emit(RoomEvent::EntityPlaced { entity, kind: kind_id });
        entity
    }

    /// Removes an entity. Idempotent: removing an absent or stale handle is a
    /// no-op returning false.
    pub fn remove(&mut self, entity: Entity) -> bool {
        if !self.contains(entity) {
            return false;
        }
        self.order.retain(|&stored| stored != entity);
        self.world.despawn(entity);
        self.emit(RoomEvent::EntityRemoved { entity });
        true
    }

    /// Deep-copies an entity, offset by +0.5 on x and z. The copy is a new
    /// entity with its own handle; the built model is shared.
    pub fn duplicate(&mut self, entity: Entity) -> Result<Entity, RoomError> {
        let Some((kind, transform, properties, record, model)) = self.components(entity) else {
            return Err(RoomError::EntityNotFound { index: entity.index() });
        };
        let offset_transform = Transform3D {
            position: transform.position + DVec3::new(0.5, 0.0, 0.5),
            rotation: transform.rotation,
        };
        let copy = self
            .world
            .spawn((kind.clone(), offset_transform, properties, record, model))
            .id();
        self.order.push(copy);
        self.emit(RoomEvent::EntityPlaced { entity: copy, kind: kind.0 });
        Ok(copy)
    }

    /// Removes every entity and advances the generation, so build results
    /// still in flight for the old room never land in the new one.
    pub fn clear(&mut self) -> usize {
        let entities = std::mem::take(&mut self.order);
        let count = entities.len();
        for entity in entities {
            self.world.despawn(entity);
            self.emit(RoomEvent::EntityRemoved { entity });
        }
        self.generation += 1;
        self.emit(RoomEvent::RoomCleared { count });
        count
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.world.get_entity(entity).is_ok()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Handles in insertion order.
    pub fn handles(&self) -> &[Entity] {
        &self.order
    }

    /// Snapshots of every entity, insertion order.
    pub fn all(&self) -> Vec<PlacedEntity> {
        self.order.iter().filter_map(|&entity| self.entity(entity)).collect()
    }

    pub fn entity(&self, entity: Entity) -> Option<PlacedEntity> {
        let (kind, transform, properties, record, _) = self.components(entity)?;
        Some(PlacedEntity {
            handle: entity,
            kind_id: kind.0,
            position: transform.position,
            rotation: transform.rotation,
            properties: properties.0,
            original: record.0,
        })
    }

    pub fn kind(&self, entity: Entity) -> Option<String> {
        self.world.get::<Kind>(entity).map(|kind| kind.0.clone())
    }

    pub fn position(&self, entity: Entity) -> Option<DVec3> {
        self.world.get::<Transform3D>(entity).map(|transform| transform.position)
    }

    pub fn rotation(&self, entity: Entity) -> Option<DVec3> {
        self.world.get::<Transform3D>(entity).map(|transform| transform.rotation)
    }

    pub fn set_position(&mut self, entity: Entity, position: DVec3) -> bool {
        match self.world.get_mut::<Transform3D>(entity) {
            Some(mut transform) => {
                transform.position = position;
                true
            }
            None => false,
        }
    }

    pub fn set_rotation(&mut self, entity: Entity, rotation: DVec3) -> bool {
        match self.world.get_mut::<Transform3D>(entity) {
            Some(mut transform) => {
                transform.rotation = rotation;
                true
            }
            None => false,
        }
    }

    pub fn rotate(&mut self, entity: Entity, delta_radians: DVec3) -> bool {
        match self.world.get_mut::<Transform3D>(entity) {
            Some(mut transform) => {
                transform.rotation += delta_radians;
                true
            }
            None => false,
        }
    }

    pub fn model(&self, entity: Entity) -> Option<Arc<PartNode>> {
        self.world.get::<Model>(entity).map(|model| model.0.clone())
    }

    fn components(
        &self,
        entity: Entity,
    ) -> Option<(Kind, Transform3D, Properties, SourceRecord, Model)> {
        Some((
            self.world.get::<Kind>(entity)?.clone(),
            *self.world.get::<Transform3D>(entity)?,
            self.world.get::<Properties>(entity)?.clone(),
            self.world.get::<SourceRecord>(entity)?.clone(),
            self.world.get::<Model>(entity)?.clone(),
        ))
    }

    fn emit(&mut self, event: RoomEvent) {
        self.world.resource_mut::<EventBus>().push(event);
    }

    /// Queues an event on the store's bus without touching entities. The
    /// build pipeline reports failures and discards this way.
    pub fn push_event(&mut self, event: RoomEvent) {
        self.emit(event);
    }

    pub fn drain_events(&mut self) -> Vec<RoomEvent> {
        self.world.resource_mut::<EventBus>().drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parts::{MaterialSpec, PartShape};
    use serde_json::json;

    fn test_seed(kind: &str, x: f64) -> EntitySeed {
        EntitySeed {
            kind_id: kind.to_string(),
            position: DVec3::new(x, 0.0, 0.0),
            rotation: DVec3::ZERO,
            properties: Map::new(),
            original: json!({ "type": kind }),
        }
    }

    fn test_node() -> PartNode {
        PartNode::mesh(
            PartShape::Box { width: 1.0, height: 1.0, depth: 1.0 },
            MaterialSpec::standard(0xff0000),
        )
    }

    #[test]
    fn all_returns_insertion_order() {
        let mut room = RoomWorld::new();
        room.place(test_seed("box", 0.0), test_node());
        room.place(test_seed("chair", 1.0), test_node());
        room.place(test_seed("sphere", 2.0), test_node());

        let kinds: Vec<String> = room.all().into_iter().map(|e| e.kind_id).collect();
        assert_eq!(kinds, vec!["box", "chair", "sphere"]);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut room = RoomWorld::new();
        let entity = room.place(test_seed("box", 0.0), test_node());
        assert!(room.remove(entity));
        assert!(!room.remove(entity));
        assert!(room.is_empty());
    }

    #[test]
    fn duplicate_offsets_and_keeps_source() {
        let mut room = RoomWorld::new();
        let source = room.place(test_seed("chair", 1.0), test_node());
        let copy = room.duplicate(source).unwrap();

        assert_ne!(source, copy);
        assert_eq!(room.len(), 2);
        let copy_position = room.position(copy).unwrap();
        assert_eq!(copy_position, DVec3::new(1.5, 0.0, 0.5));
        assert_eq!(room.position(source).unwrap(), DVec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn duplicate_of_removed_entity_fails() {
        let mut room = RoomWorld::new();
        let entity = room.place(test_seed("box", 0.0), test_node());
        room.remove(entity);
        assert!(matches!(room.duplicate(entity), Err(RoomError::EntityNotFound { .. })));
    }

    #[test]
    fn clear_advances_generation() {
        let mut room = RoomWorld::new();
        room.place(test_seed("box", 0.0), test_node());
        assert_eq!(room.generation(), 0);
        assert_eq!(room.clear(), 1);
        assert_eq!(room.generation(), 1);
        assert!(room.is_empty());
        // Clearing an empty room still advances; an import into an empty room
        // must also invalidate stale builds.
        room.clear();
        assert_eq!(room.generation(), 2);
    }

    #[test]
    fn mutation_events_arrive_in_order() {
        let mut room = RoomWorld::new();
        let entity = room.place(test_seed("box", 0.0), test_node());
        room.remove(entity);
        room.clear();

        let events = room.drain_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], RoomEvent::EntityPlaced { .. }));
        assert!(matches!(events[1], RoomEvent::EntityRemoved { .. }));
        assert!(matches!(events[2], RoomEvent::RoomCleared { count: 0 }));
    }
}
