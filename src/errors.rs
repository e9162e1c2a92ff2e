use thiserror::Error;

/// Failure modes of room import, entity construction, and store lookups.
///
/// Only `Parse` aborts an import; the per-entity variants mark a single
/// skipped element and leave the rest of the batch untouched.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("unknown object kind '{kind}'")]
    CatalogLookup { kind: String },

    #[error("malformed room document: {reason}")]
    Parse { reason: String },

    #[error("builder for kind '{kind}' failed: {reason}")]
    BuilderFailure { kind: String, reason: String },

    #[error("invalid geometry parameters for kind '{kind}': {reason}")]
    InvalidGeometry { kind: String, reason: String },

    #[error("entity {index} is no longer in the room")]
    EntityNotFound { index: u32 },
}

impl RoomError {
    pub fn parse(reason: impl Into<String>) -> Self {
        RoomError::Parse { reason: reason.into() }
    }

    pub fn invalid_geometry(kind: &str, reason: impl Into<String>) -> Self {
        RoomError::InvalidGeometry { kind: kind.to_string(), reason: reason.into() }
    }

    /// Whether an import may continue past this error by skipping one element.
    pub fn is_per_entity(&self) -> bool {
        !matches!(self, RoomError::Parse { .. })
    }
}
