//! # State
//!
//! The document tree: a [`Sprite`] owns its [`Layer`]s and image [`Stock`](crate::stock::Stock), layers own
//! their [`Cel`]s, and a [`Document`] pairs a sprite with its undo history.

pub mod cel;
pub mod document;
pub mod layer;
pub mod sprite;

pub use cel::{Cel, CelID, FrameIndex};
pub use document::{Document, DocumentID};
pub use layer::{Layer, LayerError, LayerID};
pub use sprite::{Sprite, SpriteError, SpriteID};
