use bevy_ecs::prelude::{Entity, Resource};
use std::fmt;

/// Mutation notices emitted by the entity store and the build pipeline.
/// Drained once per pump; the interaction coordinator reacts to the batch.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    EntityPlaced { entity: Entity, kind: String },
    EntityRemoved { entity: Entity },
    RoomCleared { count: usize },
    BuildFailed { kind: String, reason: String },
    BuildDiscarded { kind: String, generation: u64 },
}

impl fmt::Display for RoomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomEvent::EntityPlaced { entity, kind } => {
                write!(f, "EntityPlaced entity={} kind={}", entity.index(), kind)
            }
            RoomEvent::EntityRemoved { entity } => {
                write!(f, "EntityRemoved entity={}", entity.index())
            }
            RoomEvent::RoomCleared { count } => write!(f, "RoomCleared count={count}"),
            RoomEvent::BuildFailed { kind, reason } => {
                write!(f, "BuildFailed kind={kind} reason={reason}")
            }
            RoomEvent::BuildDiscarded { kind, generation } => {
                write!(f, "BuildDiscarded kind={kind} generation={generation}")
            }
        }
    }
}

#[derive(Default, Resource)]
pub struct EventBus {
    events: Vec<RoomEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: RoomEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<RoomEvent> {
        self.events.drain(..).collect()
    }
}
