//! Scripted editing sessions.
//!
//! A session script is a TOML file describing a blank sprite and a list of operations to perform on it, in
//! order. Layers are referred to by their index in the script's `layers` list.
//!
//! ```toml
//! [sprite]
//! width = 64
//! height = 64
//! frames = 2
//! layers = ["Background", "Ink"]
//!
//! [[ops]]
//! op = "paint"
//! layer = 1
//! frame = 0
//! rects = [{ x = 4, y = 4, width = 8, height = 8, color = [255, 0, 0, 255] }]
//!
//! [[ops]]
//! op = "undo"
//! ```

use anyhow::Context;
use celpaint_core::{
    canvas::{CelCanvas, TiledMode},
    commands::{self, CommandError},
    image::{graya, rgba, Pixel, PixelFormat},
    state::{Document, FrameIndex, LayerID, Sprite},
    undo::UndoConfig,
};

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("layer index {0} is out of range")]
    NoSuchLayer(usize),
}

fn one() -> usize {
    1
}
fn default_layers() -> Vec<String> {
    vec!["Layer 1".to_owned()]
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct SpriteDesc {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_format")]
    pub format: PixelFormat,
    #[serde(default)]
    pub frames: Option<u32>,
    #[serde(default = "default_layers")]
    pub layers: Vec<String>,
}
fn default_format() -> PixelFormat {
    PixelFormat::Rgb
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// RGBA. Grayscale uses red as the value, indexed uses red as the index.
    pub color: [u8; 4],
}

#[derive(Clone, Debug, serde::Deserialize, strum::AsRefStr)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Paint {
        layer: usize,
        frame: FrameIndex,
        #[serde(default)]
        tiled: TiledMode,
        rects: Vec<Rect>,
    },
    Undo {
        #[serde(default = "one")]
        count: usize,
    },
    Redo {
        #[serde(default = "one")]
        count: usize,
    },
    SetLayer {
        layer: Option<usize>,
    },
    SetFrame {
        frame: FrameIndex,
    },
    CopyCel {
        layer: usize,
        from: FrameIndex,
        to: FrameIndex,
    },
    ClearCel {
        layer: usize,
        frame: FrameIndex,
    },
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Script {
    pub sprite: SpriteDesc,
    #[serde(default)]
    pub ops: Vec<Op>,
}
impl Script {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let string = std::fs::read_to_string(path)
            .with_context(|| format!("reading session {}", path.display()))?;
        toml::from_str(&string).with_context(|| format!("parsing session {}", path.display()))
    }
}

pub struct Session {
    document: Document,
    layers: Vec<LayerID>,
}
impl Session {
    #[must_use]
    pub fn new(desc: &SpriteDesc, undo: &UndoConfig) -> Self {
        let mut sprite = Sprite::new(desc.format, desc.width, desc.height);
        if let Some(frames) = desc.frames {
            sprite.set_frames(frames);
        }
        let layers = desc
            .layers
            .iter()
            .map(|name| sprite.add_layer(name.as_str()))
            .collect();
        Self {
            document: Document::with_undo_config(sprite, undo),
            layers,
        }
    }
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }
    fn layer(&self, index: usize) -> Result<LayerID, SessionError> {
        self.layers
            .get(index)
            .copied()
            .ok_or(SessionError::NoSuchLayer(index))
    }
    /// Perform every op in order, stopping at the first failure.
    pub fn run(&mut self, ops: &[Op]) -> anyhow::Result<()> {
        for (index, op) in ops.iter().enumerate() {
            self.apply(op)
                .with_context(|| format!("op #{index} ({})", op.as_ref()))?;
        }
        Ok(())
    }
    pub fn apply(&mut self, op: &Op) -> anyhow::Result<()> {
        log::debug!("Applying {op:?}");
        let result = match op {
            Op::Paint {
                layer,
                frame,
                tiled,
                rects,
            } => {
                let layer = self.layer(*layer)?;
                self.paint(layer, *frame, *tiled, rects)?;
                Ok(())
            }
            Op::Undo { count } => {
                for _ in 0..*count {
                    if !self.document.undo()? {
                        log::info!("Nothing left to undo");
                        break;
                    }
                }
                Ok(())
            }
            Op::Redo { count } => {
                for _ in 0..*count {
                    if !self.document.redo()? {
                        log::info!("Nothing left to redo");
                        break;
                    }
                }
                Ok(())
            }
            Op::SetLayer { layer } => {
                let layer = layer.map(|index| self.layer(index)).transpose()?;
                commands::set_current_layer(&mut self.document, layer)
            }
            Op::SetFrame { frame } => commands::set_current_frame(&mut self.document, *frame),
            Op::CopyCel { layer, from, to } => {
                let layer = self.layer(*layer)?;
                commands::copy_cel(&mut self.document, layer, *from, *to).map(|_| ())
            }
            Op::ClearCel { layer, frame } => {
                let layer = self.layer(*layer)?;
                commands::clear_cel(&mut self.document, layer, *frame)
            }
        };
        match result {
            Err(CommandError::NoOp) => {
                log::info!("{} changed nothing", op.as_ref());
                Ok(())
            }
            other => other.map_err(Into::into),
        }
    }
    fn paint(
        &mut self,
        layer: LayerID,
        frame: FrameIndex,
        tiled: TiledMode,
        rects: &[Rect],
    ) -> anyhow::Result<()> {
        let format = self.document.sprite().format();
        let mut canvas = CelCanvas::open(&mut self.document, layer, frame, tiled)?;
        // Rects are in sprite space, the buffer starts at the canvas origin.
        let [ox, oy] = canvas.bounds().origin();
        let buffer = canvas.working_buffer()?;
        for rect in rects {
            buffer.fill_rect(
                rect.x.saturating_sub(ox),
                rect.y.saturating_sub(oy),
                rect.width,
                rect.height,
                pixel(format, rect.color),
            );
        }
        canvas.commit()?;
        Ok(())
    }
    /// Log the final state of every cel and the history.
    pub fn report(&self) {
        let sprite = self.document.sprite();
        log::info!(
            "{}: {}x{} {}, {} frames, {} images",
            self.document.name,
            sprite.width(),
            sprite.height(),
            sprite.format().as_ref(),
            sprite.frames(),
            sprite.stock().len()
        );
        for layer in sprite.layers() {
            for cel in layer.cels() {
                let Ok(image) = sprite.stock().get_image(cel.image()) else {
                    log::warn!("{} points at a missing image", cel.id());
                    continue;
                };
                log::info!(
                    "  {} frame {}: {}x{} at {:?}, {}",
                    layer.name(),
                    cel.frame(),
                    image.width(),
                    image.height(),
                    cel.position(),
                    image.content_hash().to_hex()
                );
            }
        }
        let history = self.document.undo_history();
        log::info!(
            "History: {} undo ({}), {} redo ({}), {}",
            history.undo_len(),
            history
                .next_undo_kind()
                .map_or("nothing", Into::into),
            history.redo_len(),
            history
                .next_redo_kind()
                .map_or("nothing", Into::into),
            human_bytes::human_bytes(history.memory_size() as f64)
        );
    }
}

fn pixel(format: PixelFormat, [r, g, b, a]: [u8; 4]) -> Pixel {
    match format {
        PixelFormat::Rgb => rgba(r, g, b, a),
        PixelFormat::Grayscale => graya(r, a),
        PixelFormat::Indexed => Pixel::from(r),
    }
}
