use bevy_ecs::entity::Entity;
use glam::{DVec3, Vec2};

/// Panel overlay state. At most one panel is open at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivePanel {
    #[default]
    None,
    ObjectBrowser,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submenu {
    Rotate,
}

/// Rotation axis for the context-menu rotate commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> DVec3 {
        match self {
            Axis::X => DVec3::X,
            Axis::Y => DVec3::Y,
            Axis::Z => DVec3::Z,
        }
    }
}

/// An open context menu, anchored at the pointer position that produced
/// the pick. `target` is a generational handle; the menu must be closed
/// when that entity leaves the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextMenu {
    pub screen: Vec2,
    pub target: Entity,
    pub submenu: Option<Submenu>,
}

/// UI-facing editing state: edit-mode flag, panel overlay, context menu.
/// The three axes vary independently; the only coupling is that a menu
/// needs a live target entity.
#[derive(Debug, Default)]
pub struct EditingState {
    pub edit_mode_enabled: bool,
    pub active_panel: ActivePanel,
    pub context_menu: Option<ContextMenu>,
}

impl EditingState {
    pub fn new(edit_mode_enabled: bool) -> Self {
        Self { edit_mode_enabled, ..Self::default() }
    }

    /// Flips the edit-mode flag and returns the new value.
    pub fn toggle_edit_mode(&mut self) -> bool {
        self.edit_mode_enabled = !self.edit_mode_enabled;
        self.edit_mode_enabled
    }

    /// Opens a panel, replacing whichever one was open before.
    pub fn open_panel(&mut self, panel: ActivePanel) {
        self.active_panel = panel;
    }

    /// Closes `panel` if it is the one currently open; closing a panel
    /// that is not open leaves the state untouched.
    pub fn close_panel(&mut self, panel: ActivePanel) {
        if self.active_panel == panel {
            self.active_panel = ActivePanel::None;
        }
    }

    pub fn open_menu(&mut self, target: Entity, screen: Vec2) {
        self.context_menu = Some(ContextMenu { screen, target, submenu: None });
    }

    pub fn close_menu(&mut self) {
        self.context_menu = None;
    }

    pub fn menu_target(&self) -> Option<Entity> {
        self.context_menu.map(|menu| menu.target)
    }

    /// Closes the menu if it targets `entity`. Called on every removal so
    /// the menu never points at a despawned handle.
    pub fn invalidate_target(&mut self, entity: Entity) -> bool {
        if self.menu_target() == Some(entity) {
            self.context_menu = None;
            return true;
        }
        false
    }

    /// Expands a submenu on the open menu; no-op when no menu is open.
    pub fn open_submenu(&mut self, submenu: Submenu) {
        if let Some(menu) = self.context_menu.as_mut() {
            menu.submenu = Some(submenu);
        }
    }

    pub fn close_submenu(&mut self) {
        if let Some(menu) = self.context_menu.as_mut() {
            menu.submenu = None;
        }
    }
}
