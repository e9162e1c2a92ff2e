pub mod catalog;
pub mod codec;
pub mod editing;
pub mod errors;
pub mod events;
pub mod interaction;
pub mod models;
pub mod parts;
pub mod prefs;
pub mod render_host;
pub mod session;
pub mod store;

pub use session::{ImportSummary, PickHit, Session};
