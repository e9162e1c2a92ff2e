use std::sync::Arc;

use bevy_ecs::entity::Entity;
use glam::DVec3;

use crate::parts::PartNode;

/// What the scene core needs from a rendering engine.
///
/// The core never talks to a renderer directly; an embedding implements
/// this trait to bridge onto whatever scene graph and drag controller it
/// uses. Calls arrive on the session's thread, batched per pump.
pub trait RenderHost {
    /// Shows a newly placed entity. `node` is the built part tree; the
    /// host owns whatever GPU-side representation it derives from it.
    fn present(&mut self, entity: Entity, node: Arc<PartNode>, position: DVec3, rotation: DVec3);

    /// Removes a presented entity. Hosts must tolerate handles they never
    /// saw; a clear retires every entity unconditionally.
    fn retire(&mut self, entity: Entity);

    /// Re-poses an already presented entity after a move or rotate.
    /// Rotation is Euler radians, XYZ order.
    fn set_pose(&mut self, entity: Entity, position: DVec3, rotation: DVec3);

    /// Rebinds the drag controller to a new draggable list.
    fn set_draggables(&mut self, entities: &[Entity]);

    /// Enables or disables pointer dragging wholesale.
    fn set_drag_enabled(&mut self, enabled: bool);
}

/// Host that renders nothing. Used by the CLI and headless tests.
#[derive(Debug, Default)]
pub struct NullRenderHost;

impl RenderHost for NullRenderHost {
    fn present(&mut self, _: Entity, _: Arc<PartNode>, _: DVec3, _: DVec3) {}

    fn retire(&mut self, _: Entity) {}

    fn set_pose(&mut self, _: Entity, _: DVec3, _: DVec3) {}

    fn set_draggables(&mut self, _: &[Entity]) {}

    fn set_drag_enabled(&mut self, _: bool) {}
}
