//! Document model and undo core for a cel-based sprite editor.
//!
//! The document is a [`state::Sprite`] tree of layers and cels over a shared [`stock::Stock`] of images.
//! Painting happens through a [`canvas::CelCanvas`], structural edits through [`commands`], and both record
//! into the document's [`undo::UndoHistory`].

pub mod canvas;
pub mod commands;
pub mod dirty;
pub mod id;
pub mod image;
pub mod objects;
pub mod state;
pub mod stock;
pub mod undo;

pub use id::UniqueID;
