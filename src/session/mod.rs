//! The session is the one context object an embedding holds: it owns the
//! catalog, the entity store, the editing state machine, the preference
//! store and the interaction coordinator, and it is the only place
//! commands enter the core. Construct one at startup, call `pump` from
//! the frame loop, drop (or `shutdown`) at teardown.

mod build_worker;

pub use build_worker::{BuildJob, BuildOutcome, BuildWorker};

use anyhow::Result;
use bevy_ecs::entity::Entity;
use futures::executor::block_on;
use glam::{DVec3, Vec2};
use log::{debug, warn};

use crate::catalog::{CompositeBuilder, KindBuilder, ObjectCatalog};
use crate::codec;
use crate::editing::{ActivePanel, Axis, EditingState, Submenu};
use crate::errors::RoomError;
use crate::events::RoomEvent;
use crate::interaction::InteractionCoordinator;
use crate::prefs::PreferenceStore;
use crate::render_host::RenderHost;
use crate::store::{EntitySeed, RoomWorld};

/// One context-menu rotation step.
const ROTATE_STEP: f64 = std::f64::consts::FRAC_PI_2;

/// A pointer pick reported by the render host: the top-level entity that
/// was hit and the screen position of the pointer.
#[derive(Debug, Clone, Copy)]
pub struct PickHit {
    pub entity: Entity,
    pub screen: Vec2,
}

/// Counts from one import: entities placed immediately, composite builds
/// still in flight, and records skipped with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub placed: usize,
    pub pending: usize,
    pub skipped: usize,
}

pub struct Session {
    catalog: ObjectCatalog,
    store: RoomWorld,
    editing: EditingState,
    prefs: Box<dyn PreferenceStore>,
    coordinator: InteractionCoordinator,
    builds: Option<BuildWorker>,
    in_flight: usize,
    landed: Vec<BuildOutcome>,
}

impl Session {
    pub fn new(
        catalog: ObjectCatalog,
        prefs: Box<dyn PreferenceStore>,
        host: Box<dyn RenderHost>,
    ) -> Self {
        let editing = EditingState::new(prefs.edit_mode_enabled());
        let mut coordinator = InteractionCoordinator::new(host);
        coordinator.set_drag_enabled(editing.edit_mode_enabled);
        Self {
            catalog,
            store: RoomWorld::new(),
            editing,
            prefs,
            coordinator,
            builds: BuildWorker::new(),
            in_flight: 0,
            landed: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &ObjectCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &RoomWorld {
        &self.store
    }

    pub fn editing(&self) -> &EditingState {
        &self.editing
    }

    pub fn edit_mode_enabled(&self) -> bool {
        self.editing.edit_mode_enabled
    }

    /// Builds still in flight or waiting for the next pump.
    pub fn pending_builds(&self) -> usize {
        self.in_flight + self.landed.len()
    }

    // ---------- Commands ----------

    /// Flips edit mode, persists the flag, and propagates the change to
    /// the host's drag controller. A failed preference write is logged and
    /// does not undo the toggle.
    pub fn toggle_edit_mode(&mut self) -> bool {
        let enabled = self.editing.toggle_edit_mode();
        if let Err(err) = self.prefs.set_edit_mode_enabled(enabled) {
            warn!("[session] failed to persist edit mode: {err:#}");
        }
        self.coordinator.set_drag_enabled(enabled);
        enabled
    }

    pub fn open_object_browser(&mut self) {
        self.editing.open_panel(ActivePanel::ObjectBrowser);
    }

    pub fn close_object_browser(&mut self) {
        self.editing.close_panel(ActivePanel::ObjectBrowser);
    }

    pub fn open_settings(&mut self) {
        self.editing.open_panel(ActivePanel::Settings);
    }

    pub fn close_settings(&mut self) {
        self.editing.close_panel(ActivePanel::Settings);
    }

    /// Places a default instance of `kind_id` at the origin. Primitives
    /// land immediately; composite builds are queued and arrive in a later
    /// pump. Closes the object browser either way.
    pub fn spawn(&mut self, kind_id: &str) -> Result<(), RoomError> {
        let descriptor = self.catalog.resolve(kind_id)?;
        let record = descriptor.default_record.clone();
        let seed = EntitySeed {
            kind_id: descriptor.kind_id.clone(),
            position: DVec3::ZERO,
            rotation: DVec3::ZERO,
            properties: descriptor.resolved_properties(&record),
            original: record,
        };
        match &descriptor.builder {
            KindBuilder::Primitive(shape) => {
                let node = codec::build_primitive(kind_id, *shape, &seed.original)?;
                self.store.place(seed, node);
            }
            KindBuilder::Composite(builder) => {
                let builder = builder.clone();
                let generation = self.store.generation();
                self.submit_build(builder, seed, generation);
            }
        }
        self.editing.close_panel(ActivePanel::ObjectBrowser);
        self.sync_interactions();
        Ok(())
    }

    /// Routes a pointer pick: a hit opens the context menu on that entity,
    /// no hit (or a stale one) closes it.
    pub fn select_on_pointer(&mut self, hit: Option<PickHit>) {
        match hit {
            Some(hit) if self.store.contains(hit.entity) => {
                self.editing.open_menu(hit.entity, hit.screen);
            }
            _ => self.editing.close_menu(),
        }
    }

    /// Deletes the context-menu target. No-op without a target; the menu
    /// is closed afterwards either way.
    pub fn delete_selected(&mut self) {
        if let Some(target) = self.editing.menu_target() {
            self.store.remove(target);
        }
        self.editing.close_menu();
        self.sync_interactions();
    }

    /// Duplicates the context-menu target, returning the copy's handle.
    pub fn duplicate_selected(&mut self) -> Option<Entity> {
        let copy = match self.editing.menu_target() {
            Some(target) => match self.store.duplicate(target) {
                Ok(copy) => Some(copy),
                Err(err) => {
                    warn!("[session] duplicate failed: {err}");
                    None
                }
            },
            None => None,
        };
        self.editing.close_menu();
        self.sync_interactions();
        copy
    }

    pub fn open_rotate_submenu(&mut self) {
        self.editing.open_submenu(Submenu::Rotate);
    }

    /// Rotates the target 90 degrees around `axis`. Steps accumulate;
    /// nothing normalizes the angle.
    pub fn rotate_selected(&mut self, axis: Axis) {
        if let Some(target) = self.editing.menu_target() {
            if self.store.rotate(target, axis.unit() * ROTATE_STEP) {
                self.coordinator.pose_changed(target, &self.store);
            }
        }
        self.editing.close_menu();
    }

    /// Zeroes the target's rotation on all three axes.
    pub fn reset_rotation_selected(&mut self) {
        if let Some(target) = self.editing.menu_target() {
            if self.store.set_rotation(target, DVec3::ZERO) {
                self.coordinator.pose_changed(target, &self.store);
            }
        }
        self.editing.close_menu();
    }

    /// Applies a drag-move reported by the host.
    pub fn set_entity_position(&mut self, entity: Entity, position: DVec3) {
        if self.store.set_position(entity, position) {
            self.coordinator.pose_changed(entity, &self.store);
        }
    }

    /// Replaces the room with `raw`'s contents. The parse runs before the
    /// clear, so a malformed document leaves the current room untouched.
    /// Composite records are queued tagged with the post-clear generation.
    pub fn import_document(&mut self, raw: &str) -> Result<ImportSummary, RoomError> {
        let import = codec::deserialize_room(&self.catalog, raw)?;
        self.store.clear();
        let generation = self.store.generation();
        let summary = ImportSummary {
            placed: import.ready.len(),
            pending: import.pending.len(),
            skipped: import.skipped.len(),
        };
        for (seed, node) in import.ready {
            self.store.place(seed, node);
        }
        for seed in import.pending {
            let Ok(descriptor) = self.catalog.resolve(&seed.kind_id) else { continue };
            let KindBuilder::Composite(builder) = descriptor.builder.clone() else { continue };
            self.submit_build(builder, seed, generation);
        }
        self.sync_interactions();
        Ok(summary)
    }

    /// Serializes the current room. Pure read, no state change.
    pub fn export_document(&self) -> Result<String> {
        codec::serialize_room(&self.store.all())
    }

    // ---------- Frame pump ----------

    /// One frame tick: lands finished composite builds and pushes the
    /// resulting store changes to the host. Results tagged with an older
    /// generation are discarded; their room was cleared while they were in
    /// flight.
    pub fn pump(&mut self) {
        let mut outcomes = std::mem::take(&mut self.landed);
        if let Some(worker) = &self.builds {
            let drained = worker.drain();
            self.in_flight = self.in_flight.saturating_sub(drained.len());
            outcomes.extend(drained);
        }
        for outcome in outcomes {
            self.land_outcome(outcome);
        }
        self.sync_interactions();
    }

    /// Blocks until every queued build has reported, then pumps. Used by
    /// the CLI and anywhere else that needs a fully materialized room.
    pub fn settle(&mut self) {
        while self.in_flight > 0 {
            let Some(worker) = &self.builds else { break };
            match worker.recv() {
                Some(outcome) => {
                    self.in_flight -= 1;
                    self.landed.push(outcome);
                }
                None => break,
            }
        }
        self.pump();
    }

    /// Tears the session down: every entity is removed and retired from
    /// the host; unresolved build results are dropped with the worker.
    pub fn shutdown(mut self) {
        self.store.clear();
        self.sync_interactions();
    }

    // ---------- Internals ----------

    fn submit_build(&mut self, builder: CompositeBuilder, seed: EntitySeed, generation: u64) {
        let job = BuildJob { seed, builder, generation };
        let rejected = match &self.builds {
            Some(worker) => match worker.submit(job) {
                Ok(()) => {
                    self.in_flight += 1;
                    return;
                }
                Err(job) => job,
            },
            None => job,
        };
        // No worker could take it: resolve inline so the request is never
        // silently dropped.
        let BuildJob { seed, builder, generation } = rejected;
        let result = block_on(builder.build(seed.original.clone()));
        self.landed.push(BuildOutcome { seed, result, generation });
    }

    fn land_outcome(&mut self, outcome: BuildOutcome) {
        let BuildOutcome { seed, result, generation } = outcome;
        if generation != self.store.generation() {
            debug!(
                "[session] discarding stale build of '{}' from generation {generation}",
                seed.kind_id
            );
            self.store.push_event(RoomEvent::BuildDiscarded { kind: seed.kind_id, generation });
            return;
        }
        match result {
            Ok(node) => {
                self.store.place(seed, node);
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!("[session] builder for kind '{}' failed: {reason}", seed.kind_id);
                self.store.push_event(RoomEvent::BuildFailed { kind: seed.kind_id, reason });
            }
        }
    }

    /// Drains store events, traces them, keeps the menu target valid, and
    /// hands the batch to the interaction coordinator.
    fn sync_interactions(&mut self) {
        let events = self.store.drain_events();
        if events.is_empty() {
            return;
        }
        for event in &events {
            debug!("[session] {event}");
            if let RoomEvent::EntityRemoved { entity } = event {
                self.editing.invalidate_target(*entity);
            }
        }
        self.coordinator.apply(&events, &self.store);
    }
}
