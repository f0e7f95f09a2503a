//! The closed set of reversible changes.
//!
//! Each undoer holds [`ObjectId`]s rather than references, plus whatever value it needs to put things back.
//! Undoers that take something *out* of the document (a cel, an image) own it while it is out, so putting it
//! back restores the very same object and any IDs recorded for it resolve again.

use super::UndoError;
use crate::{
    dirty::Dirty,
    image::Image,
    objects::{ObjectId, ObjectsContainer},
    state::{Cel, FrameIndex, Layer, Sprite},
    stock::{ImageHandle, Stock},
};

/// Any type which can sink undoers.
pub trait UndoersCollector {
    fn push_undoer(&mut self, undoer: Undoer);
}
impl<Collector: UndoersCollector> UndoersCollector for &mut Collector {
    fn push_undoer(&mut self, undoer: Undoer) {
        (**self).push_undoer(undoer);
    }
}
impl UndoersCollector for Vec<Undoer> {
    fn push_undoer(&mut self, undoer: Undoer) {
        self.push(undoer);
    }
}

#[derive(Debug, strum::EnumDiscriminants)]
#[strum_discriminants(name(UndoerKind), derive(strum::AsRefStr, strum::IntoStaticStr, Hash))]
pub enum Undoer {
    /// Marks the start of an atomic group.
    OpenGroup,
    /// Marks the end of an atomic group.
    CloseGroup,
    /// The sprite's current layer was `layer`.
    SetCurrentLayer {
        sprite: ObjectId,
        layer: Option<ObjectId>,
    },
    /// The sprite's current frame was `frame`.
    SetCurrentFrame { sprite: ObjectId, frame: FrameIndex },
    /// An image was added to the stock at `handle`.
    AddImage { stock: ObjectId, handle: ImageHandle },
    /// `image` was freed from the stock at `handle`.
    RemoveImage {
        stock: ObjectId,
        handle: ImageHandle,
        image: Image,
    },
    /// `cel` was added to `layer`.
    AddCel { layer: ObjectId, cel: ObjectId },
    /// `cel` was removed from `layer`.
    RemoveCel { layer: ObjectId, cel: Cel },
    /// The stock held `image` at `handle` before it was replaced.
    ReplaceImage {
        stock: ObjectId,
        handle: ImageHandle,
        image: Image,
    },
    /// The cel was positioned at `position`.
    SetCelPosition { cel: ObjectId, position: [i32; 2] },
    /// `image` had the pixels saved in `dirty`.
    DirtyArea { image: ObjectId, dirty: Dirty },
}

// Constructors capture the state *right now*, so build them before making the change they describe.
impl Undoer {
    pub fn set_current_layer(objects: &mut ObjectsContainer, sprite: &Sprite) -> Self {
        let layer = sprite
            .current_layer()
            .and_then(|layer| sprite.layer(layer))
            .map(|layer| objects.add_object(layer));
        Self::SetCurrentLayer {
            sprite: objects.add_object(sprite),
            layer,
        }
    }
    pub fn set_current_frame(objects: &mut ObjectsContainer, sprite: &Sprite) -> Self {
        Self::SetCurrentFrame {
            sprite: objects.add_object(sprite),
            frame: sprite.current_frame(),
        }
    }
    pub fn add_image(objects: &mut ObjectsContainer, stock: &Stock, handle: ImageHandle) -> Self {
        Self::AddImage {
            stock: objects.add_object(stock),
            handle,
        }
    }
    /// Takes ownership of the freed image.
    pub fn remove_image(
        objects: &mut ObjectsContainer,
        stock: &Stock,
        handle: ImageHandle,
        image: Image,
    ) -> Self {
        objects.add_object(&image);
        Self::RemoveImage {
            stock: objects.add_object(stock),
            handle,
            image,
        }
    }
    pub fn add_cel(objects: &mut ObjectsContainer, layer: &Layer, cel: &Cel) -> Self {
        Self::AddCel {
            layer: objects.add_object(layer),
            cel: objects.add_object(cel),
        }
    }
    /// Takes ownership of the detached cel.
    pub fn remove_cel(objects: &mut ObjectsContainer, layer: &Layer, cel: Cel) -> Self {
        objects.add_object(&cel);
        Self::RemoveCel {
            layer: objects.add_object(layer),
            cel,
        }
    }
    /// Takes ownership of the image that was displaced from `handle`.
    pub fn replace_image(
        objects: &mut ObjectsContainer,
        stock: &Stock,
        handle: ImageHandle,
        displaced: Image,
    ) -> Self {
        objects.add_object(&displaced);
        Self::ReplaceImage {
            stock: objects.add_object(stock),
            handle,
            image: displaced,
        }
    }
    pub fn set_cel_position(objects: &mut ObjectsContainer, cel: &Cel) -> Self {
        Self::SetCelPosition {
            cel: objects.add_object(cel),
            position: cel.position(),
        }
    }
    /// `dirty` must already hold `image`'s pre-edit pixels.
    pub fn dirty_area(objects: &mut ObjectsContainer, image: &Image, dirty: Dirty) -> Self {
        Self::DirtyArea {
            image: objects.add_object(image),
            dirty,
        }
    }

    #[must_use]
    pub fn kind(&self) -> UndoerKind {
        self.into()
    }
    /// Approximate memory held by this record, in bytes.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        let owned = match self {
            Self::RemoveImage { image, .. } | Self::ReplaceImage { image, .. } => {
                image.memory_size()
            }
            Self::DirtyArea { dirty, .. } => dirty.memory_size(),
            _ => 0,
        };
        std::mem::size_of::<Self>() + owned
    }

    /// Put the document back the way this record describes, pushing the record that would redo the change
    /// onto `redoers`.
    ///
    /// On failure nothing has changed, and the record is handed back along with the error.
    pub fn revert(
        self,
        objects: &mut ObjectsContainer,
        sprite: &mut Sprite,
        mut redoers: impl UndoersCollector,
    ) -> Result<(), (UndoError, Self)> {
        log::trace!("Reverting {:?}", self.kind());
        let redo = match self {
            Self::OpenGroup => Self::CloseGroup,
            Self::CloseGroup => Self::OpenGroup,
            Self::SetCurrentLayer {
                sprite: sprite_id,
                layer,
            } => match Self::revert_current_layer(objects, sprite, sprite_id, layer) {
                Ok(redo) => redo,
                Err(err) => {
                    return Err((
                        err,
                        Self::SetCurrentLayer {
                            sprite: sprite_id,
                            layer,
                        },
                    ))
                }
            },
            Self::SetCurrentFrame {
                sprite: sprite_id,
                frame,
            } => match Self::revert_current_frame(objects, sprite, sprite_id, frame) {
                Ok(redo) => redo,
                Err(err) => {
                    return Err((
                        err,
                        Self::SetCurrentFrame {
                            sprite: sprite_id,
                            frame,
                        },
                    ))
                }
            },
            Self::AddImage { stock, handle } => {
                let image = objects
                    .get_object_mut_as::<Stock>(stock, sprite)
                    .map_err(UndoError::from)
                    .and_then(|stock| stock.free_image(handle).map_err(UndoError::from));
                match image {
                    Ok(image) => Self::RemoveImage {
                        stock,
                        handle,
                        image,
                    },
                    Err(err) => return Err((err, Self::AddImage { stock, handle })),
                }
            }
            Self::RemoveImage {
                stock,
                handle,
                image,
            } => {
                let stock_ref = match objects.get_object_mut_as::<Stock>(stock, sprite) {
                    Ok(stock_ref) => stock_ref,
                    Err(err) => {
                        return Err((
                            err.into(),
                            Self::RemoveImage {
                                stock,
                                handle,
                                image,
                            },
                        ))
                    }
                };
                if let Err((err, image)) = stock_ref.restore_image(handle, image) {
                    return Err((
                        err.into(),
                        Self::RemoveImage {
                            stock,
                            handle,
                            image,
                        },
                    ));
                }
                Self::AddImage { stock, handle }
            }
            Self::AddCel { layer, cel } => match Self::revert_add_cel(objects, sprite, layer, cel) {
                Ok(redo) => redo,
                Err(err) => return Err((err, Self::AddCel { layer, cel })),
            },
            Self::RemoveCel { layer, cel } => {
                let cel_id = objects.add_object(&cel);
                let layer_ref = match objects.get_object_mut_as::<Layer>(layer, sprite) {
                    Ok(layer_ref) => layer_ref,
                    Err(err) => return Err((err.into(), Self::RemoveCel { layer, cel })),
                };
                if let Err((err, cel)) = layer_ref.add_cel(cel) {
                    return Err((err.into(), Self::RemoveCel { layer, cel }));
                }
                Self::AddCel { layer, cel: cel_id }
            }
            Self::ReplaceImage {
                stock,
                handle,
                image,
            } => {
                let stock_ref = match objects.get_object_mut_as::<Stock>(stock, sprite) {
                    Ok(stock_ref) => stock_ref,
                    Err(err) => {
                        return Err((
                            err.into(),
                            Self::ReplaceImage {
                                stock,
                                handle,
                                image,
                            },
                        ))
                    }
                };
                match stock_ref.replace_image(handle, image) {
                    Ok(displaced) => Self::replace_image(objects, sprite.stock(), handle, displaced),
                    Err((err, image)) => {
                        return Err((
                            err.into(),
                            Self::ReplaceImage {
                                stock,
                                handle,
                                image,
                            },
                        ))
                    }
                }
            }
            Self::SetCelPosition { cel, position } => {
                match objects.get_object_mut_as::<Cel>(cel, sprite) {
                    Ok(cel_ref) => {
                        let redo = Self::SetCelPosition {
                            cel,
                            position: cel_ref.position(),
                        };
                        let [x, y] = position;
                        cel_ref.set_position(x, y);
                        redo
                    }
                    Err(err) => return Err((err.into(), Self::SetCelPosition { cel, position })),
                }
            }
            Self::DirtyArea { image, mut dirty } => {
                // Swapping checks size and format before touching any pixel.
                let swapped = objects
                    .get_object_mut_as::<Image>(image, sprite)
                    .map_err(UndoError::from)
                    .and_then(|target| dirty.swap_image_pixels(target).map_err(UndoError::from));
                if let Err(err) = swapped {
                    return Err((err, Self::DirtyArea { image, dirty }));
                }
                Self::DirtyArea { image, dirty }
            }
        };
        redoers.push_undoer(redo);
        Ok(())
    }
    fn revert_current_layer(
        objects: &mut ObjectsContainer,
        sprite: &mut Sprite,
        sprite_id: ObjectId,
        layer: Option<ObjectId>,
    ) -> Result<Self, UndoError> {
        let sprite = objects.get_object_mut_as::<Sprite>(sprite_id, sprite)?;
        let layer = match layer {
            Some(id) => Some(objects.get_object_as::<Layer>(id, sprite)?.id()),
            None => None,
        };
        let redo = Self::set_current_layer(objects, sprite);
        sprite.set_current_layer(layer)?;
        Ok(redo)
    }
    fn revert_current_frame(
        objects: &mut ObjectsContainer,
        sprite: &mut Sprite,
        sprite_id: ObjectId,
        frame: FrameIndex,
    ) -> Result<Self, UndoError> {
        let sprite = objects.get_object_mut_as::<Sprite>(sprite_id, sprite)?;
        let redo = Self::set_current_frame(objects, sprite);
        sprite.set_current_frame(frame)?;
        Ok(redo)
    }
    fn revert_add_cel(
        objects: &mut ObjectsContainer,
        sprite: &mut Sprite,
        layer: ObjectId,
        cel: ObjectId,
    ) -> Result<Self, UndoError> {
        let cel_id = objects.key_as::<Cel>(cel)?;
        let removed = objects
            .get_object_mut_as::<Layer>(layer, sprite)?
            .remove_cel(cel_id)
            .ok_or(crate::objects::LookupError::Dangling(cel))?;
        Ok(Self::RemoveCel {
            layer,
            cel: removed,
        })
    }
}
