//! # Commands
//!
//! Structural edits that don't go through a [`CelCanvas`](crate::canvas::CelCanvas). Each one makes its change
//! to the document and records the undoers for it, grouped where it takes more than one.
//!
//! Everything that can fail is checked before the first change is made, so an error leaves both the document
//! and its history untouched.

use crate::{
    state::{CelID, Document, FrameIndex, LayerError, LayerID, Sprite, SpriteError},
    stock::StockError,
    undo::{UndoError, UndoHistory, Undoer},
};

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("resource referenced by the command is not found")]
    UnknownResource,
    #[error("command makes no changes")]
    NoOp,
    #[error(transparent)]
    Sprite(#[from] SpriteError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error(transparent)]
    Undo(#[from] UndoError),
}

/// Change which layer is being edited.
pub fn set_current_layer(
    document: &mut Document,
    layer: Option<LayerID>,
) -> Result<(), CommandError> {
    let (sprite, history) = document.split_mut();
    if sprite.current_layer() == layer {
        return Err(CommandError::NoOp);
    }
    if layer.is_some_and(|layer| sprite.layer(layer).is_none()) {
        return Err(CommandError::UnknownResource);
    }
    if history.is_enabled() {
        let undoer = Undoer::set_current_layer(history.objects(), sprite);
        history.push_undoer(undoer)?;
    }
    sprite.set_current_layer(layer)?;
    Ok(())
}

/// Change which frame is being edited.
pub fn set_current_frame(document: &mut Document, frame: FrameIndex) -> Result<(), CommandError> {
    let (sprite, history) = document.split_mut();
    if sprite.current_frame() == frame {
        return Err(CommandError::NoOp);
    }
    if frame >= sprite.frames() {
        return Err(SpriteError::FrameOutOfRange {
            frame,
            frames: sprite.frames(),
        }
        .into());
    }
    if history.is_enabled() {
        let undoer = Undoer::set_current_frame(history.objects(), sprite);
        history.push_undoer(undoer)?;
    }
    sprite.set_current_frame(frame)?;
    Ok(())
}

/// Duplicate the cel at `from` onto `to` within the same layer, along with its image. Whatever was at `to`
/// is removed first.
///
/// Returns the new cel.
pub fn copy_cel(
    document: &mut Document,
    layer: LayerID,
    from: FrameIndex,
    to: FrameIndex,
) -> Result<CelID, CommandError> {
    if from == to {
        return Err(CommandError::NoOp);
    }
    let (sprite, history) = document.split_mut();
    if to >= sprite.frames() {
        return Err(SpriteError::FrameOutOfRange {
            frame: to,
            frames: sprite.frames(),
        }
        .into());
    }
    let source = sprite
        .layer(layer)
        .ok_or(CommandError::UnknownResource)?
        .cel(from)
        .ok_or(CommandError::UnknownResource)?;
    let image = sprite.stock().get_image(source.image())?.new_copy();
    let mut cel = source.new_copy();
    let replaced = sprite
        .layer(layer)
        .and_then(|layer| layer.cel(to))
        .map(|cel| cel.id());

    let enabled = history.is_enabled();
    if enabled {
        history.push_undoer(Undoer::OpenGroup)?;
    }
    if let Some(replaced) = replaced {
        remove_cel(sprite, history, layer, replaced)?;
    }

    let handle = sprite.stock_mut().add_image(image)?;
    if enabled {
        let undoer = Undoer::add_image(history.objects(), sprite.stock(), handle);
        history.push_undoer(undoer)?;
    }
    cel.set_frame(to);
    cel.set_image(handle);
    let id = cel.id();
    sprite
        .layer_mut(layer)
        .ok_or(CommandError::UnknownResource)?
        .add_cel(cel)
        .map_err(|(err, _)| err)?;
    if enabled {
        let layer = sprite.layer(layer).ok_or(CommandError::UnknownResource)?;
        let cel = layer.cel_by_id(id).ok_or(CommandError::UnknownResource)?;
        let undoer = Undoer::add_cel(history.objects(), layer, cel);
        history.push_undoer(undoer)?;
        history.push_undoer(Undoer::CloseGroup)?;
    }
    log::debug!("Copied frame {from} to {to} as {id}");
    Ok(id)
}

/// Remove the cel at `frame`, and its image if nothing else shows it.
pub fn clear_cel(
    document: &mut Document,
    layer: LayerID,
    frame: FrameIndex,
) -> Result<(), CommandError> {
    let (sprite, history) = document.split_mut();
    let cel = sprite
        .layer(layer)
        .ok_or(CommandError::UnknownResource)?
        .cel(frame)
        .ok_or(CommandError::UnknownResource)?
        .id();
    let enabled = history.is_enabled();
    if enabled {
        history.push_undoer(Undoer::OpenGroup)?;
    }
    remove_cel(sprite, history, layer, cel)?;
    if enabled {
        history.push_undoer(Undoer::CloseGroup)?;
    }
    log::debug!("Cleared frame {frame}");
    Ok(())
}

fn remove_cel(
    sprite: &mut Sprite,
    history: &mut UndoHistory,
    layer: LayerID,
    cel: CelID,
) -> Result<(), CommandError> {
    let enabled = history.is_enabled();
    let layer = sprite
        .layer_mut(layer)
        .ok_or(CommandError::UnknownResource)?;
    let removed = layer.remove_cel(cel).ok_or(CommandError::UnknownResource)?;
    let handle = removed.image();
    if enabled {
        let undoer = Undoer::remove_cel(history.objects(), layer, removed);
        history.push_undoer(undoer)?;
    }
    // Linked cels share an image.
    let shared = sprite
        .layers()
        .flat_map(|layer| layer.cels())
        .any(|cel| cel.image() == handle);
    if !shared {
        let image = sprite.stock_mut().free_image(handle)?;
        if enabled {
            let undoer = Undoer::remove_image(history.objects(), sprite.stock(), handle, image);
            history.push_undoer(undoer)?;
        }
    }
    Ok(())
}
