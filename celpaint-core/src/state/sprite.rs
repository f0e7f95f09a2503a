use super::{
    cel::{Cel, CelID, FrameIndex},
    layer::{Layer, LayerID},
};
use crate::{
    image::{Image, Pixel, PixelFormat},
    stock::Stock,
};

pub type SpriteID = crate::UniqueID<Sprite>;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteError {
    #[error("frame {frame} out of range, sprite has {frames} frames")]
    FrameOutOfRange { frame: FrameIndex, frames: u32 },
    #[error("layer {} not found", .0)]
    UnknownLayer(LayerID),
}

/// The root of the document tree. Owns the layers (bottom to top), the image stock, and the editing cursor.
#[derive(Debug)]
pub struct Sprite {
    id: SpriteID,
    format: PixelFormat,
    width: u32,
    height: u32,
    transparent_color: Pixel,
    frames: u32,
    current_frame: FrameIndex,
    /// A lookup key into `layers`, not ownership.
    current_layer: Option<LayerID>,
    layers: Vec<Layer>,
    stock: Stock,
}
impl Sprite {
    /// An empty sprite with one frame and no layers.
    #[must_use]
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            id: SpriteID::new(),
            format,
            width,
            height,
            transparent_color: 0,
            frames: 1,
            current_frame: 0,
            current_layer: None,
            layers: Vec::new(),
            stock: Stock::new(),
        }
    }
    #[must_use]
    pub fn id(&self) -> SpriteID {
        self.id
    }
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    /// Color used for pixels that hold nothing. Zero for every format.
    #[must_use]
    pub fn transparent_color(&self) -> Pixel {
        self.transparent_color
    }
    /// A new image the size of the canvas, cleared to the transparent color.
    #[must_use]
    pub fn new_canvas_image(&self) -> Image {
        Image::new_filled(
            self.format,
            self.width,
            self.height,
            self.transparent_color,
        )
    }
    #[must_use]
    pub fn frames(&self) -> u32 {
        self.frames
    }
    /// Set the frame count. Must be at least one. The current frame is clamped into range.
    pub fn set_frames(&mut self, frames: u32) {
        self.frames = frames.max(1);
        self.current_frame = self.current_frame.min(self.frames - 1);
    }
    #[must_use]
    pub fn current_frame(&self) -> FrameIndex {
        self.current_frame
    }
    pub fn set_current_frame(&mut self, frame: FrameIndex) -> Result<(), SpriteError> {
        if frame >= self.frames {
            return Err(SpriteError::FrameOutOfRange {
                frame,
                frames: self.frames,
            });
        }
        self.current_frame = frame;
        Ok(())
    }
    #[must_use]
    pub fn current_layer(&self) -> Option<LayerID> {
        self.current_layer
    }
    pub fn set_current_layer(&mut self, layer: Option<LayerID>) -> Result<(), SpriteError> {
        if let Some(layer) = layer {
            if self.layer(layer).is_none() {
                return Err(SpriteError::UnknownLayer(layer));
            }
        }
        self.current_layer = layer;
        Ok(())
    }
    /// Add a new empty layer on top, returning its ID. The first layer added becomes current.
    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerID {
        let layer = Layer::new(name);
        let id = layer.id();
        self.layers.push(layer);
        if self.current_layer.is_none() {
            self.current_layer = Some(id);
        }
        id
    }
    /// Layers, bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> + '_ {
        self.layers.iter()
    }
    #[must_use]
    pub fn layer(&self, id: LayerID) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }
    pub fn layer_mut(&mut self, id: LayerID) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id() == id)
    }
    #[must_use]
    pub fn stock(&self) -> &Stock {
        &self.stock
    }
    pub fn stock_mut(&mut self) -> &mut Stock {
        &mut self.stock
    }
    #[must_use]
    pub fn cel(&self, cel: CelID) -> Option<&Cel> {
        self.layers.iter().find_map(|layer| layer.cel_by_id(cel))
    }
    pub fn cel_mut(&mut self, cel: CelID) -> Option<&mut Cel> {
        self.layers
            .iter_mut()
            .find_map(|layer| layer.cel_by_id_mut(cel))
    }
    /// The image displayed by a layer at a frame, if any.
    #[must_use]
    pub fn cel_image(&self, layer: LayerID, frame: FrameIndex) -> Option<&Image> {
        let cel = self.layer(layer)?.cel(frame)?;
        self.stock.get_image(cel.image()).ok()
    }
}
