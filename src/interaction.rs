use bevy_ecs::entity::Entity;

use crate::events::RoomEvent;
use crate::render_host::RenderHost;
use crate::store::RoomWorld;

/// Drives the render host from store mutations.
///
/// Owns the draggable-set contract: after any event batch that changed
/// room membership, the host's drag controller is rebound to the store's
/// current handles exactly once, however many entities the batch touched.
pub struct InteractionCoordinator {
    host: Box<dyn RenderHost>,
}

impl InteractionCoordinator {
    pub fn new(host: Box<dyn RenderHost>) -> Self {
        Self { host }
    }

    /// Applies one drained event batch to the host.
    pub fn apply(&mut self, events: &[RoomEvent], store: &RoomWorld) {
        let mut membership_changed = false;
        for event in events {
            match event {
                RoomEvent::EntityPlaced { entity, .. } => {
                    if let (Some(node), Some(position), Some(rotation)) =
                        (store.model(*entity), store.position(*entity), store.rotation(*entity))
                    {
                        self.host.present(*entity, node, position, rotation);
                    }
                    membership_changed = true;
                }
                RoomEvent::EntityRemoved { entity } => {
                    self.host.retire(*entity);
                    membership_changed = true;
                }
                RoomEvent::RoomCleared { .. }
                | RoomEvent::BuildFailed { .. }
                | RoomEvent::BuildDiscarded { .. } => {}
            }
        }
        if membership_changed {
            self.host.set_draggables(store.handles());
        }
    }

    /// Pushes a single entity's new transform to the host. Moves and
    /// rotations do not go through the event bus.
    pub fn pose_changed(&mut self, entity: Entity, store: &RoomWorld) {
        if let (Some(position), Some(rotation)) = (store.position(entity), store.rotation(entity)) {
            self.host.set_pose(entity, position, rotation);
        }
    }

    pub fn set_drag_enabled(&mut self, enabled: bool) {
        self.host.set_drag_enabled(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parts::{MaterialSpec, PartNode, PartShape};
    use crate::store::EntitySeed;
    use glam::DVec3;
    use serde_json::{json, Map};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct HostLog {
        presented: Vec<Entity>,
        retired: Vec<Entity>,
        rebinds: Vec<usize>,
        poses: usize,
    }

    struct RecordingHost(Arc<Mutex<HostLog>>);

    impl RenderHost for RecordingHost {
        fn present(&mut self, entity: Entity, _: Arc<PartNode>, _: DVec3, _: DVec3) {
            self.0.lock().unwrap().presented.push(entity);
        }

        fn retire(&mut self, entity: Entity) {
            self.0.lock().unwrap().retired.push(entity);
        }

        fn set_pose(&mut self, _: Entity, _: DVec3, _: DVec3) {
            self.0.lock().unwrap().poses += 1;
        }

        fn set_draggables(&mut self, entities: &[Entity]) {
            self.0.lock().unwrap().rebinds.push(entities.len());
        }

        fn set_drag_enabled(&mut self, _: bool) {}
    }

    fn seed(kind: &str) -> EntitySeed {
        EntitySeed {
            kind_id: kind.to_string(),
            position: DVec3::ZERO,
            rotation: DVec3::ZERO,
            properties: Map::new(),
            original: json!({ "type": kind }),
        }
    }

    fn node() -> PartNode {
        PartNode::mesh(
            PartShape::Box { width: 1.0, height: 1.0, depth: 1.0 },
            MaterialSpec::standard(0x00ff00),
        )
    }

    #[test]
    fn one_rebind_per_batch() {
        let log = Arc::new(Mutex::new(HostLog::default()));
        let mut coordinator = InteractionCoordinator::new(Box::new(RecordingHost(log.clone())));
        let mut store = RoomWorld::new();

        store.place(seed("box"), node());
        store.place(seed("sphere"), node());
        let events = store.drain_events();
        coordinator.apply(&events, &store);

        let snapshot = log.lock().unwrap();
        assert_eq!(snapshot.presented.len(), 2);
        assert_eq!(snapshot.rebinds, vec![2]);
    }

    #[test]
    fn removal_retires_and_rebinds() {
        let log = Arc::new(Mutex::new(HostLog::default()));
        let mut coordinator = InteractionCoordinator::new(Box::new(RecordingHost(log.clone())));
        let mut store = RoomWorld::new();

        let _keep = store.place(seed("box"), node());
        let removed = store.place(seed("box"), node());
        coordinator.apply(&store.drain_events(), &store);

        store.remove(removed);
        coordinator.apply(&store.drain_events(), &store);

        let snapshot = log.lock().unwrap();
        assert_eq!(snapshot.retired, vec![removed]);
        assert_eq!(snapshot.rebinds, vec![2, 1]);
    }

    #[test]
    fn pose_changes_skip_the_event_bus() {
        let log = Arc::new(Mutex::new(HostLog::default()));
        let mut coordinator = InteractionCoordinator::new(Box::new(RecordingHost(log.clone())));
        let mut store = RoomWorld::new();

        let entity = store.place(seed("box"), node());
        store.drain_events();
        store.set_position(entity, DVec3::new(2.0, 0.0, 2.0));
        coordinator.pose_changed(entity, &store);

        let snapshot = log.lock().unwrap();
        assert_eq!(snapshot.poses, 1);
        assert!(snapshot.rebinds.is_empty());
    }
}
