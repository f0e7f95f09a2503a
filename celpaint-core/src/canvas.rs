//! # Canvas
//!
//! An editing session over one cel. Opening one hands the tool a working buffer covering everything it may
//! paint on, which can be larger than the cel itself. Committing folds the buffer back into the document and
//! records how to undo it, choosing the cheapest record that can:
//!
//! * A brand new cel is recorded as the addition of its image and the cel itself.
//! * An existing cel that kept its size and place is recorded as a [`Dirty`] diff of just the changed pixels.
//! * Anything else replaces the cel's image wholesale, remembering the old one and the old position.
//!
//! A canvas that is dropped without being committed rolls back, leaving the document as it was found.

use crate::{
    dirty::{Dirty, DirtyError},
    image::Image,
    state::{Cel, CelID, Document, FrameIndex, LayerError, LayerID, SpriteError},
    stock::{ImageHandle, StockError},
    undo::{UndoError, Undoer},
};

#[derive(thiserror::Error, Debug)]
pub enum CanvasError {
    #[error("canvas was already committed or rolled back")]
    InvalidState,
    #[error("{} was removed while being edited", .0)]
    CelRemoved(CelID),
    #[error("edit region does not fit in an image")]
    RegionTooLarge,
    #[error(transparent)]
    Sprite(#[from] SpriteError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error(transparent)]
    Dirty(#[from] DirtyError),
    #[error(transparent)]
    Undo(#[from] UndoError),
}

/// How painting treats the canvas edges.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::AsRefStr,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TiledMode {
    /// Painting may run off any edge of the canvas or the cel.
    #[default]
    None,
    /// Painting wraps around the canvas edges.
    Tiled,
}

/// A rectangle in sprite space.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}
impl Bounds {
    #[must_use]
    pub fn origin(&self) -> [i32; 2] {
        [self.x, self.y]
    }
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }
    /// The smallest rectangle containing both the cel and the canvas.
    fn expanded(position: [i32; 2], size: [u32; 2], canvas: [u32; 2]) -> Result<Self, CanvasError> {
        let extent = |pos: i32, len: u32, canvas: u32| -> Result<(i32, u32), CanvasError> {
            let start = pos.min(0);
            let end = (i64::from(pos) + i64::from(len)).max(i64::from(canvas));
            let len = u32::try_from(end - i64::from(start)).map_err(|_| CanvasError::RegionTooLarge)?;
            Ok((start, len))
        };
        let (x, width) = extent(position[0], size[0], canvas[0])?;
        let (y, height) = extent(position[1], size[1], canvas[1])?;
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }
}

enum State {
    Open { before: Image, after: Image },
    Committed,
    RolledBack,
}

/// An open edit of one cel. See the [module docs](self).
pub struct CelCanvas<'d> {
    document: &'d mut Document,
    layer: LayerID,
    cel: CelID,
    /// The cel and its image didn't exist before this canvas was opened.
    cel_created: bool,
    image: ImageHandle,
    original_position: [i32; 2],
    bounds: Bounds,
    state: State,
}
impl<'d> CelCanvas<'d> {
    /// Start editing the cel at `frame` of `layer`, creating a blank one if the frame is empty.
    ///
    /// While open, the cel is moved to the top-left of [`Self::bounds`] so that the working buffer and the cel
    /// share a coordinate space.
    pub fn open(
        document: &'d mut Document,
        layer: LayerID,
        frame: FrameIndex,
        tiled: TiledMode,
    ) -> Result<Self, CanvasError> {
        let sprite = document.sprite_mut();
        if frame >= sprite.frames() {
            return Err(SpriteError::FrameOutOfRange {
                frame,
                frames: sprite.frames(),
            }
            .into());
        }
        let existing = sprite
            .layer(layer)
            .ok_or(SpriteError::UnknownLayer(layer))?
            .cel(frame)
            .map(|cel| (cel.id(), cel.image()));
        let (cel, image, cel_created) = match existing {
            Some((cel, image)) => (cel, image, false),
            None => {
                let blank = sprite.new_canvas_image();
                let image = sprite.stock_mut().add_image(blank)?;
                let cel = Cel::new(frame, image);
                let id = cel.id();
                sprite
                    .layer_mut(layer)
                    .ok_or(SpriteError::UnknownLayer(layer))?
                    .add_cel(cel)
                    .map_err(|(err, _)| err)?;
                log::trace!("Created {id} for frame {frame}");
                (id, image, true)
            }
        };

        let original_position = sprite
            .cel(cel)
            .ok_or(CanvasError::CelRemoved(cel))?
            .position();
        let source = sprite.stock().get_image(image)?;
        let canvas = [sprite.width(), sprite.height()];
        let bounds = match tiled {
            TiledMode::None => Bounds::expanded(original_position, source.size(), canvas)?,
            TiledMode::Tiled => Bounds {
                x: 0,
                y: 0,
                width: canvas[0],
                height: canvas[1],
            },
        };
        let before = source.crop(
            bounds.x.saturating_sub(original_position[0]),
            bounds.y.saturating_sub(original_position[1]),
            bounds.width,
            bounds.height,
            sprite.transparent_color(),
        );
        let after = before.new_copy();
        if let Some(cel) = sprite.cel_mut(cel) {
            cel.set_position(bounds.x, bounds.y);
        }
        log::debug!(
            "Opened {tiled:?} canvas on {cel}, {}x{} at {:?}",
            bounds.width,
            bounds.height,
            bounds.origin()
        );

        Ok(Self {
            document,
            layer,
            cel,
            cel_created,
            image,
            original_position,
            bounds,
            state: State::Open { before, after },
        })
    }
    /// The buffer to paint into, sized and placed as [`Self::bounds`].
    pub fn working_buffer(&mut self) -> Result<&mut Image, CanvasError> {
        match &mut self.state {
            State::Open { after, .. } => Ok(after),
            _ => Err(CanvasError::InvalidState),
        }
    }
    /// The cel's content as it was when opened, in the same space as the working buffer.
    pub fn source_image(&self) -> Result<&Image, CanvasError> {
        match &self.state {
            State::Open { before, .. } => Ok(before),
            _ => Err(CanvasError::InvalidState),
        }
    }
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
    #[must_use]
    pub fn cel(&self) -> CelID {
        self.cel
    }
    #[must_use]
    pub fn is_cel_created(&self) -> bool {
        self.cel_created
    }
    /// Read access to the document being edited.
    #[must_use]
    pub fn document(&self) -> &Document {
        self.document
    }
    /// Write the working buffer into the document and record the change.
    ///
    /// If this fails the edit is rolled back.
    pub fn commit(&mut self) -> Result<(), CanvasError> {
        let after = match std::mem::replace(&mut self.state, State::Committed) {
            State::Open { after, .. } => after,
            other => {
                self.state = other;
                return Err(CanvasError::InvalidState);
            }
        };
        if let Err(err) = self.apply(after) {
            log::warn!("Commit of {} failed, rolling back: {err}", self.cel);
            self.state = State::RolledBack;
            // Whatever was recorded so far describes a change that is about to be undone.
            self.document.undo_history_mut().discard_open_group();
            if let Err(rollback) = self.restore() {
                log::warn!("Rollback after failed commit also failed: {rollback}");
            }
            return Err(err);
        }
        Ok(())
    }
    /// Abandon the edit, putting the document back as it was found. Nothing is recorded.
    pub fn rollback(&mut self) -> Result<(), CanvasError> {
        if !matches!(self.state, State::Open { .. }) {
            return Err(CanvasError::InvalidState);
        }
        self.state = State::RolledBack;
        self.restore()
    }
    fn apply(&mut self, after: Image) -> Result<(), CanvasError> {
        let (sprite, history) = self.document.split_mut();
        let enabled = history.is_enabled();
        let position = sprite
            .cel(self.cel)
            .ok_or(CanvasError::CelRemoved(self.cel))?
            .position();
        let same = position == self.original_position
            && sprite.stock().get_image(self.image)?.size() == after.size();

        if self.cel_created {
            log::trace!("Committing new {}", self.cel);
            if same {
                sprite
                    .stock_mut()
                    .get_image_mut(self.image)?
                    .copy_from(&after, 0, 0);
            } else {
                sprite
                    .stock_mut()
                    .replace_image(self.image, after)
                    .map_err(|(err, _)| err)?;
            }
            if enabled {
                let layer = sprite
                    .layer(self.layer)
                    .ok_or(SpriteError::UnknownLayer(self.layer))?;
                let cel = layer
                    .cel_by_id(self.cel)
                    .ok_or(CanvasError::CelRemoved(self.cel))?;
                let objects = history.objects();
                let add_image = Undoer::add_image(objects, sprite.stock(), self.image);
                let add_cel = Undoer::add_cel(objects, layer, cel);
                for undoer in [Undoer::OpenGroup, add_image, add_cel, Undoer::CloseGroup] {
                    history.push_undoer(undoer)?;
                }
            }
        } else if same {
            if enabled {
                let image = sprite.stock().get_image(self.image)?;
                let mut dirty = Dirty::new(image, &after)?;
                dirty.save_image_pixels(image)?;
                log::trace!(
                    "Committing {} changed pixels over {} rows of {}",
                    dirty.pixel_count(),
                    dirty.row_count(),
                    self.cel
                );
                let undoer = Undoer::dirty_area(history.objects(), image, dirty);
                history.push_undoer(undoer)?;
            }
            sprite
                .stock_mut()
                .get_image_mut(self.image)?
                .copy_from(&after, 0, 0);
        } else {
            log::trace!(
                "Committing {} as a replacement {}x{} image",
                self.cel,
                after.width(),
                after.height()
            );
            if enabled {
                history.push_undoer(Undoer::OpenGroup)?;
                if position != self.original_position {
                    let cel = sprite
                        .cel_mut(self.cel)
                        .ok_or(CanvasError::CelRemoved(self.cel))?;
                    // Record against where the cel was, then put it back where it's going.
                    let [x, y] = self.original_position;
                    cel.set_position(x, y);
                    let undoer = Undoer::set_cel_position(history.objects(), cel);
                    cel.set_position(position[0], position[1]);
                    history.push_undoer(undoer)?;
                }
            }
            let displaced = sprite
                .stock_mut()
                .replace_image(self.image, after)
                .map_err(|(err, _)| err)?;
            if enabled {
                let undoer =
                    Undoer::replace_image(history.objects(), sprite.stock(), self.image, displaced);
                history.push_undoer(undoer)?;
                history.push_undoer(Undoer::CloseGroup)?;
            }
        }
        Ok(())
    }
    fn restore(&mut self) -> Result<(), CanvasError> {
        let sprite = self.document.sprite_mut();
        let cel = sprite
            .cel_mut(self.cel)
            .ok_or(CanvasError::CelRemoved(self.cel))?;
        let [x, y] = self.original_position;
        cel.set_position(x, y);
        if self.cel_created {
            sprite
                .layer_mut(self.layer)
                .and_then(|layer| layer.remove_cel(self.cel))
                .ok_or(CanvasError::CelRemoved(self.cel))?;
            sprite.stock_mut().free_image(self.image)?;
        }
        log::trace!("Rolled back {}", self.cel);
        Ok(())
    }
}
impl Drop for CelCanvas<'_> {
    fn drop(&mut self) {
        if !matches!(self.state, State::Open { .. }) {
            return;
        }
        self.state = State::RolledBack;
        if std::thread::panicking() {
            log::warn!("Canvas on {} dropped during a panic, rolling back", self.cel);
        }
        if let Err(err) = self.restore() {
            log::warn!("Rollback of {} failed: {err}", self.cel);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        image::{rgba, Pixel, PixelFormat},
        state::Sprite,
        undo::UndoerKind,
    };

    const GRAY: Pixel = rgba(128, 128, 128, 255);
    const RED: Pixel = rgba(255, 0, 0, 255);
    const BLUE: Pixel = rgba(0, 0, 255, 255);

    /// A document with one layer holding one cel at frame 0.
    fn document_with_cel(
        canvas: [u32; 2],
        cel_size: [u32; 2],
        position: [i32; 2],
    ) -> (Document, LayerID, CelID) {
        let mut sprite = Sprite::new(PixelFormat::Rgb, canvas[0], canvas[1]);
        let layer = sprite.add_layer("Layer 1");
        let mut image = Image::new_filled(PixelFormat::Rgb, cel_size[0], cel_size[1], GRAY);
        image.put_pixel(0, 0, rgba(1, 2, 3, 255));
        let handle = sprite.stock_mut().add_image(image).unwrap();
        let mut cel = Cel::new(0, handle);
        cel.set_position(position[0], position[1]);
        let cel_id = cel.id();
        sprite.layer_mut(layer).unwrap().add_cel(cel).unwrap();
        (Document::new(sprite), layer, cel_id)
    }
    fn cel_hash(doc: &Document, layer: LayerID) -> blake3::Hash {
        doc.sprite().cel_image(layer, 0).unwrap().content_hash()
    }
    /// Everything visible about the sprite's cels.
    fn snapshot(sprite: &Sprite) -> Vec<(LayerID, FrameIndex, [i32; 2], blake3::Hash)> {
        sprite
            .layers()
            .flat_map(|layer| {
                layer.cels().map(move |cel| {
                    let image = sprite.stock().get_image(cel.image()).unwrap();
                    (layer.id(), cel.frame(), cel.position(), image.content_hash())
                })
            })
            .collect()
    }
    fn kinds(doc: &Document) -> Vec<UndoerKind> {
        doc.undo_history()
            .undoers()
            .iter()
            .map(Undoer::kind)
            .collect()
    }

    #[test]
    fn same_size_commit_uses_dirty_diff() {
        let (mut doc, layer, _) = document_with_cel([10, 10], [10, 10], [0, 0]);
        let before = cel_hash(&doc, layer);
        {
            let mut canvas = CelCanvas::open(&mut doc, layer, 0, TiledMode::None).unwrap();
            assert_eq!(canvas.working_buffer().unwrap().size(), [10, 10]);
            canvas.working_buffer().unwrap().put_pixel(3, 4, RED);
            canvas.commit().unwrap();
        }
        assert_eq!(kinds(&doc), [UndoerKind::DirtyArea]);
        let Some(Undoer::DirtyArea { dirty, .. }) = doc.undo_history().undoers().iter().last()
        else {
            panic!("expected a dirty area record");
        };
        assert_eq!(dirty.pixel_count(), 1);
        let after = cel_hash(&doc, layer);
        assert_eq!(
            doc.sprite().cel_image(layer, 0).unwrap().get_pixel(3, 4),
            Some(RED)
        );

        assert!(doc.undo().unwrap());
        assert_eq!(cel_hash(&doc, layer), before);
        assert!(doc.redo().unwrap());
        assert_eq!(cel_hash(&doc, layer), after);
    }
    #[test]
    fn grown_canvas_commit_replaces_image() {
        // Canvas is wider than the cel, so the edit region is too.
        let (mut doc, layer, cel) = document_with_cel([12, 10], [10, 10], [0, 0]);
        let before = cel_hash(&doc, layer);
        let handle = doc.sprite().cel(cel).unwrap().image();
        {
            let mut canvas = CelCanvas::open(&mut doc, layer, 0, TiledMode::None).unwrap();
            assert_eq!(canvas.bounds().size(), [12, 10]);
            let buffer = canvas.working_buffer().unwrap();
            // Past the old cel's edge, filled with transparent.
            assert_eq!(buffer.get_pixel(11, 0), Some(0));
            buffer.put_pixel(11, 9, RED);
            canvas.commit().unwrap();
        }
        assert_eq!(
            kinds(&doc),
            [
                UndoerKind::OpenGroup,
                UndoerKind::ReplaceImage,
                UndoerKind::CloseGroup
            ]
        );
        let image = doc.sprite().cel_image(layer, 0).unwrap();
        assert_eq!(image.size(), [12, 10]);
        assert_eq!(image.get_pixel(11, 9), Some(RED));
        // Same slot, new buffer.
        assert_eq!(doc.sprite().cel(cel).unwrap().image(), handle);

        assert!(doc.undo().unwrap());
        assert_eq!(doc.sprite().cel_image(layer, 0).unwrap().size(), [10, 10]);
        assert_eq!(cel_hash(&doc, layer), before);
        assert!(doc.redo().unwrap());
        assert_eq!(doc.sprite().cel_image(layer, 0).unwrap().size(), [12, 10]);
    }
    #[test]
    fn offset_cel_is_moved_and_restored() {
        let (mut doc, layer, cel) = document_with_cel([10, 10], [10, 10], [-2, 3]);
        let before = cel_hash(&doc, layer);
        {
            let mut canvas = CelCanvas::open(&mut doc, layer, 0, TiledMode::None).unwrap();
            assert_eq!(
                canvas.bounds(),
                Bounds {
                    x: -2,
                    y: 0,
                    width: 12,
                    height: 13
                }
            );
            // The live cel follows the working buffer while open.
            assert_eq!(canvas.document().sprite().cel(cel).unwrap().position(), [-2, 0]);
            let source = canvas.source_image().unwrap();
            assert_eq!(source.get_pixel(0, 0), Some(0));
            assert_eq!(source.get_pixel(0, 3), Some(rgba(1, 2, 3, 255)));
            canvas.working_buffer().unwrap().put_pixel(0, 0, BLUE);
            canvas.commit().unwrap();
        }
        assert_eq!(
            kinds(&doc),
            [
                UndoerKind::OpenGroup,
                UndoerKind::SetCelPosition,
                UndoerKind::ReplaceImage,
                UndoerKind::CloseGroup
            ]
        );
        assert_eq!(doc.sprite().cel(cel).unwrap().position(), [-2, 0]);
        assert_eq!(doc.sprite().cel_image(layer, 0).unwrap().size(), [12, 13]);

        assert!(doc.undo().unwrap());
        assert_eq!(doc.sprite().cel(cel).unwrap().position(), [-2, 3]);
        assert_eq!(cel_hash(&doc, layer), before);
        assert!(doc.redo().unwrap());
        assert_eq!(doc.sprite().cel(cel).unwrap().position(), [-2, 0]);
    }
    #[test]
    fn new_cel_on_empty_frame() {
        let mut sprite = Sprite::new(PixelFormat::Rgb, 64, 64);
        let layer = sprite.add_layer("Layer 1");
        let mut doc = Document::new(sprite);
        assert_eq!(doc.sprite().stock().len(), 0);
        {
            let mut canvas = CelCanvas::open(&mut doc, layer, 0, TiledMode::None).unwrap();
            assert!(canvas.is_cel_created());
            let transparent = canvas.document().sprite().transparent_color();
            let buffer = canvas.working_buffer().unwrap();
            assert_eq!(buffer.size(), [64, 64]);
            assert!(buffer.pixels().iter().all(|&px| px == transparent));
            buffer.put_pixel(5, 5, RED);
            canvas.commit().unwrap();
        }
        assert_eq!(doc.sprite().stock().len(), 1);
        assert_eq!(
            kinds(&doc),
            [
                UndoerKind::OpenGroup,
                UndoerKind::AddImage,
                UndoerKind::AddCel,
                UndoerKind::CloseGroup
            ]
        );
        assert_eq!(doc.undo_history().undo_len(), 1);
        assert_eq!(
            doc.sprite().cel_image(layer, 0).unwrap().get_pixel(5, 5),
            Some(RED)
        );

        assert!(doc.undo().unwrap());
        assert!(doc.sprite().layer(layer).unwrap().cel(0).is_none());
        assert_eq!(doc.sprite().stock().len(), 0);
        assert!(!doc.undo().unwrap());

        assert!(doc.redo().unwrap());
        assert_eq!(
            doc.sprite().cel_image(layer, 0).unwrap().get_pixel(5, 5),
            Some(RED)
        );
    }
    #[test]
    fn tiled_full_repaint() {
        let (mut doc, layer, _) = document_with_cel([32, 32], [32, 32], [0, 0]);
        let before = cel_hash(&doc, layer);
        {
            let mut canvas = CelCanvas::open(&mut doc, layer, 0, TiledMode::Tiled).unwrap();
            assert_eq!(canvas.bounds().size(), [32, 32]);
            canvas.working_buffer().unwrap().clear(BLUE);
            canvas.commit().unwrap();
        }
        let Some(Undoer::DirtyArea { dirty, .. }) = doc.undo_history().undoers().iter().last()
        else {
            panic!("expected a dirty area record");
        };
        assert_eq!(dirty.row_count(), 32);
        assert!(doc
            .sprite()
            .cel_image(layer, 0)
            .unwrap()
            .pixels()
            .iter()
            .all(|&px| px == BLUE));

        assert!(doc.undo().unwrap());
        assert_eq!(cel_hash(&doc, layer), before);
    }
    #[test]
    fn tiled_crops_oversized_cel() {
        let (mut doc, layer, cel) = document_with_cel([8, 8], [12, 12], [-2, -2]);
        {
            let mut canvas = CelCanvas::open(&mut doc, layer, 0, TiledMode::Tiled).unwrap();
            assert_eq!(canvas.bounds().origin(), [0, 0]);
            assert_eq!(canvas.working_buffer().unwrap().size(), [8, 8]);
            canvas.commit().unwrap();
        }
        assert_eq!(doc.sprite().cel(cel).unwrap().position(), [0, 0]);
        assert_eq!(doc.sprite().cel_image(layer, 0).unwrap().size(), [8, 8]);
        assert!(doc.undo().unwrap());
        assert_eq!(doc.sprite().cel(cel).unwrap().position(), [-2, -2]);
        assert_eq!(doc.sprite().cel_image(layer, 0).unwrap().size(), [12, 12]);
    }
    #[test]
    fn n_edits_undo_then_redo() {
        let (mut doc, layer, _) = document_with_cel([10, 10], [10, 10], [-2, 3]);
        doc.sprite_mut().set_frames(2);
        let edits: [(FrameIndex, i32, i32, Pixel); 5] = [
            (0, 0, 0, RED),
            (0, 4, 4, BLUE),
            (1, 5, 5, RED),
            (0, 4, 4, GRAY),
            (1, 9, 9, BLUE),
        ];
        let mut states = vec![snapshot(doc.sprite())];
        for (frame, x, y, color) in edits {
            let mut canvas = CelCanvas::open(&mut doc, layer, frame, TiledMode::None).unwrap();
            canvas.working_buffer().unwrap().put_pixel(x, y, color);
            canvas.commit().unwrap();
            drop(canvas);
            states.push(snapshot(doc.sprite()));
        }
        assert_eq!(doc.undo_history().undo_len(), edits.len());

        for expected in states.iter().rev().skip(1) {
            assert!(doc.undo().unwrap());
            assert_eq!(&snapshot(doc.sprite()), expected);
        }
        assert!(!doc.undo().unwrap());
        for expected in states.iter().skip(1) {
            assert!(doc.redo().unwrap());
            assert_eq!(&snapshot(doc.sprite()), expected);
        }
        assert!(!doc.redo().unwrap());
    }
    #[test]
    fn drop_rolls_back_new_cel() {
        let mut sprite = Sprite::new(PixelFormat::Rgb, 16, 16);
        let layer = sprite.add_layer("Layer 1");
        let mut doc = Document::new(sprite);
        {
            let mut canvas = CelCanvas::open(&mut doc, layer, 0, TiledMode::None).unwrap();
            canvas.working_buffer().unwrap().clear(RED);
        }
        assert!(doc.sprite().layer(layer).unwrap().cel(0).is_none());
        assert!(doc.sprite().stock().is_empty());
        assert!(!doc.undo_history().can_undo());
    }
    #[test]
    fn error_mid_edit_rolls_back() {
        fn paint(doc: &mut Document, layer: LayerID) -> Result<(), CanvasError> {
            let mut canvas = CelCanvas::open(doc, layer, 0, TiledMode::None)?;
            let buffer = canvas.working_buffer()?;
            buffer.clear(RED);
            // A tool failing partway through.
            Dirty::new(buffer, &Image::new(PixelFormat::Rgb, 1, 1))?;
            canvas.commit()
        }
        let (mut doc, layer, cel) = document_with_cel([10, 10], [10, 10], [-2, 3]);
        let before = snapshot(doc.sprite());
        assert!(matches!(
            paint(&mut doc, layer),
            Err(CanvasError::Dirty(DirtyError::SizeMismatch { .. }))
        ));
        assert_eq!(snapshot(doc.sprite()), before);
        assert_eq!(doc.sprite().cel(cel).unwrap().position(), [-2, 3]);
        assert!(!doc.undo_history().can_undo());
    }
    #[test]
    fn explicit_rollback_leaves_model_untouched() {
        let (mut doc, layer, _) = document_with_cel([10, 10], [10, 10], [-2, 3]);
        let before = snapshot(doc.sprite());
        let mut canvas = CelCanvas::open(&mut doc, layer, 0, TiledMode::None).unwrap();
        canvas.working_buffer().unwrap().clear(BLUE);
        canvas.rollback().unwrap();
        assert!(matches!(canvas.commit(), Err(CanvasError::InvalidState)));
        assert!(matches!(canvas.rollback(), Err(CanvasError::InvalidState)));
        drop(canvas);
        assert_eq!(snapshot(doc.sprite()), before);
        assert!(!doc.undo_history().can_undo());
    }
    #[test]
    fn double_commit_is_invalid() {
        let (mut doc, layer, _) = document_with_cel([10, 10], [10, 10], [0, 0]);
        let mut canvas = CelCanvas::open(&mut doc, layer, 0, TiledMode::None).unwrap();
        canvas.commit().unwrap();
        assert!(matches!(canvas.commit(), Err(CanvasError::InvalidState)));
        assert!(matches!(
            canvas.working_buffer(),
            Err(CanvasError::InvalidState)
        ));
        drop(canvas);
        assert_eq!(doc.undo_history().undo_len(), 1);
    }
    #[test]
    fn disabled_history_records_nothing() {
        let (mut doc, layer, _) = document_with_cel([12, 10], [10, 10], [0, 0]);
        doc.undo_history_mut().set_enabled(false).unwrap();
        {
            let mut canvas = CelCanvas::open(&mut doc, layer, 0, TiledMode::None).unwrap();
            canvas.working_buffer().unwrap().put_pixel(11, 0, RED);
            canvas.commit().unwrap();
        }
        let image = doc.sprite().cel_image(layer, 0).unwrap();
        assert_eq!(image.size(), [12, 10]);
        assert_eq!(image.get_pixel(11, 0), Some(RED));
        assert!(!doc.undo_history().can_undo());
        assert_eq!(doc.undo_history().memory_size(), 0);
        assert!(!doc.undo().unwrap());
    }
    #[test]
    fn open_checks_target() {
        let (mut doc, layer, _) = document_with_cel([10, 10], [10, 10], [0, 0]);
        assert!(matches!(
            CelCanvas::open(&mut doc, layer, 1, TiledMode::None),
            Err(CanvasError::Sprite(SpriteError::FrameOutOfRange { frame: 1, .. }))
        ));
        let stranger = crate::state::Layer::new("Elsewhere").id();
        assert!(matches!(
            CelCanvas::open(&mut doc, stranger, 0, TiledMode::None),
            Err(CanvasError::Sprite(SpriteError::UnknownLayer(_)))
        ));
    }
}
