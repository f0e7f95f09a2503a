use super::Sprite;
use crate::undo::{UndoConfig, UndoError, UndoHistory};

pub type DocumentID = crate::UniqueID<Document>;

/// A sprite together with the history of changes made to it.
#[derive(Debug)]
pub struct Document {
    id: DocumentID,
    /// Name of the document, generated if not given.
    pub name: String,
    sprite: Sprite,
    undo: UndoHistory,
}
impl Document {
    #[must_use]
    pub fn new(sprite: Sprite) -> Self {
        Self::with_undo_config(sprite, &UndoConfig::default())
    }
    #[must_use]
    pub fn with_undo_config(sprite: Sprite, config: &UndoConfig) -> Self {
        let id = DocumentID::new();
        Self {
            name: format!("Sprite {}", id.id()),
            id,
            sprite,
            undo: UndoHistory::with_config(config),
        }
    }
    #[must_use]
    pub fn id(&self) -> DocumentID {
        self.id
    }
    #[must_use]
    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }
    /// Changes made through this are not recorded. Push the undoers yourself, see [`Self::split_mut`].
    pub fn sprite_mut(&mut self) -> &mut Sprite {
        &mut self.sprite
    }
    #[must_use]
    pub fn undo_history(&self) -> &UndoHistory {
        &self.undo
    }
    pub fn undo_history_mut(&mut self) -> &mut UndoHistory {
        &mut self.undo
    }
    /// Borrow the sprite and history at the same time, for making a change and recording it.
    pub fn split_mut(&mut self) -> (&mut Sprite, &mut UndoHistory) {
        (&mut self.sprite, &mut self.undo)
    }
    /// Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool, UndoError> {
        let did = self.undo.undo(&mut self.sprite)?;
        if did {
            log::debug!("Undo on {}", self.name);
        }
        Ok(did)
    }
    /// Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> Result<bool, UndoError> {
        let did = self.undo.redo(&mut self.sprite)?;
        if did {
            log::debug!("Redo on {}", self.name);
        }
        Ok(did)
    }
}
