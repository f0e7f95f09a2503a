//! # Image buffers
//!
//! A plain 2D array of pixels. Every format is stored as one `u32` per pixel so that diffing, cropping and
//! copying never need to care about the format; the format only decides how the bits are *interpreted*.

pub type ImageID = crate::UniqueID<Image>;

/// Raw pixel storage. See [`rgba`] and [`graya`] for packing helpers.
pub type Pixel = u32;

#[derive(
    strum::AsRefStr,
    strum::EnumIter,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    Debug,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8 bit per channel straight-alpha RGBA.
    Rgb,
    /// 8 bit value + 8 bit alpha.
    Grayscale,
    /// 8 bit palette index.
    Indexed,
}
impl PixelFormat {
    /// Number of meaningful bytes per pixel. Storage is always 4 bytes, this is what it *would* cost
    /// packed, and is what undo memory accounting uses.
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb => 4,
            Self::Grayscale => 2,
            Self::Indexed => 1,
        }
    }
}

/// Pack an RGBA color.
#[must_use]
pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Pixel {
    u32::from_le_bytes([r, g, b, a])
}
/// Pack a grayscale value with alpha.
#[must_use]
pub const fn graya(value: u8, alpha: u8) -> Pixel {
    u32::from_le_bytes([value, alpha, 0, 0])
}

/// A mutable 2D pixel buffer.
///
/// Deliberately not `Clone` - a copy is a *new* object with a new identity, use [`Image::new_copy`].
pub struct Image {
    id: ImageID,
    format: PixelFormat,
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}
impl Image {
    /// Create a new image with every pixel zeroed.
    #[must_use]
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        let len = (width as usize).saturating_mul(height as usize);
        Self {
            id: ImageID::new(),
            format,
            width,
            height,
            pixels: vec![0; len],
        }
    }
    /// Create a new image with every pixel set to `color`.
    #[must_use]
    pub fn new_filled(format: PixelFormat, width: u32, height: u32, color: Pixel) -> Self {
        let mut image = Self::new(format, width, height);
        image.clear(color);
        image
    }
    /// Duplicate the pixels into a brand new image.
    #[must_use]
    pub fn new_copy(&self) -> Self {
        Self {
            id: ImageID::new(),
            format: self.format,
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        }
    }
    #[must_use]
    pub fn id(&self) -> ImageID {
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
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }
    #[must_use]
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }
    /// View the pixel storage as bytes, e.g. for upload to a renderer.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
    /// Pixels of row `y`. Panics if out of bounds.
    #[must_use]
    pub fn row(&self, y: u32) -> &[Pixel] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }
    /// Pixels of row `y`. Panics if out of bounds.
    pub fn row_mut(&mut self, y: u32) -> &mut [Pixel] {
        let start = y as usize * self.width as usize;
        &mut self.pixels[start..start + self.width as usize]
    }
    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok().filter(|&x| x < self.width)?;
        let y = u32::try_from(y).ok().filter(|&y| y < self.height)?;
        Some(y as usize * self.width as usize + x as usize)
    }
    /// Get a pixel, or None if out of bounds.
    #[must_use]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Pixel> {
        self.index_of(x, y).map(|idx| self.pixels[idx])
    }
    /// Set a pixel. Out of bounds writes are ignored, returning false.
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Pixel) -> bool {
        match self.index_of(x, y) {
            Some(idx) => {
                self.pixels[idx] = color;
                true
            }
            None => false,
        }
    }
    pub fn clear(&mut self, color: Pixel) {
        self.pixels.fill(color);
    }
    /// Fill a rectangle, clipped to the image.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Pixel) {
        let Some((x0, y0, x1, y1)) = self.clip(x, y, width, height) else {
            return;
        };
        for row in y0..y1 {
            self.row_mut(row)[x0 as usize..x1 as usize].fill(color);
        }
    }
    /// Intersect a rect with the image bounds, yielding `(x0, y0, x1, y1)` with exclusive ends.
    fn clip(&self, x: i32, y: i32, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = i64::from(x).clamp(0, i64::from(self.width));
        let y0 = i64::from(y).clamp(0, i64::from(self.height));
        let x1 = (i64::from(x) + i64::from(width)).clamp(0, i64::from(self.width));
        let y1 = (i64::from(y) + i64::from(height)).clamp(0, i64::from(self.height));
        // All four are within [0, u32 size] after clamping.
        (x0 < x1 && y0 < y1).then(|| (x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
    /// Copy a `width`x`height` region starting at `(x, y)` into a new image. Parts of the region outside of
    /// `self` are filled with `background`.
    #[must_use]
    pub fn crop(&self, x: i32, y: i32, width: u32, height: u32, background: Pixel) -> Self {
        let mut cropped = Self::new_filled(self.format, width, height, background);
        // Place self such that (x, y) lands at the origin.
        cropped.copy_from(self, x.saturating_neg(), y.saturating_neg());
        cropped
    }
    /// Blit all of `src` onto self with its top-left at `(x, y)`, clipped to self.
    pub fn copy_from(&mut self, src: &Image, x: i32, y: i32) {
        let Some((x0, y0, x1, y1)) = self.clip(x, y, src.width, src.height) else {
            return;
        };
        // Offsets into src. Non-negative since the clipped rect starts at or after (x, y).
        let src_x = (i64::from(x0) - i64::from(x)) as usize;
        let src_y = i64::from(y0) - i64::from(y);
        let len = (x1 - x0) as usize;
        for (i, row) in (y0..y1).enumerate() {
            let src_row = src.row((src_y + i as i64) as u32);
            self.row_mut(row)[x0 as usize..x1 as usize]
                .copy_from_slice(&src_row[src_x..src_x + len]);
        }
    }
    /// Whether the two images are pixel-for-pixel identical, regardless of identity.
    #[must_use]
    pub fn same_pixels(&self, other: &Image) -> bool {
        self.format == other.format
            && self.width == other.width
            && self.height == other.height
            && self.pixels == other.pixels
    }
    /// Hash of the format, size, and pixel content. Identity does not participate.
    #[must_use]
    pub fn content_hash(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.format.as_ref().as_bytes());
        hasher.update(&self.width.to_le_bytes());
        hasher.update(&self.height.to_le_bytes());
        hasher.update(self.as_bytes());
        hasher.finalize()
    }
    /// Approximate heap footprint in bytes, as it would be packed in this format.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        self.pixels.len().saturating_mul(self.format.bytes_per_pixel())
    }
}
impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
