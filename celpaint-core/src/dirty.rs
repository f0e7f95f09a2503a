//! # Dirty
//!
//! A sparse record of which pixels differ between two same-sized images, in row-major runs, along with a saved
//! copy of the pixels under those runs. Cheap to keep around for undo when a stroke only touches a small part
//! of a large cel.
//!
//! Restoring *swaps* the saved pixels with the target's, so the same `Dirty` applied again flips the image back.
//! That makes a dirty-area undo record its own inverse.

use smallvec::SmallVec;

use crate::image::{Image, Pixel, PixelFormat};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyError {
    #[error("image sizes differ: {:?} vs {:?}", .expected, .found)]
    SizeMismatch { expected: [u32; 2], found: [u32; 2] },
    #[error("pixel formats differ: {:?} vs {:?}", .expected, .found)]
    FormatMismatch {
        expected: PixelFormat,
        found: PixelFormat,
    },
}

/// A horizontal run of changed pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
struct DirtyCol {
    x: u32,
    /// Saved pixels. Its length is the width of the run.
    pixels: Vec<Pixel>,
}
impl DirtyCol {
    fn end(&self) -> u32 {
        // Runs never extend past the row, which fits u32.
        self.x + self.pixels.len() as u32
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct DirtyRow {
    y: u32,
    /// Ordered by x, non-overlapping, non-adjacent.
    // Most strokes cross a row once or twice.
    cols: SmallVec<[DirtyCol; 2]>,
}

/// One changed run: `row`, and columns `start..end`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub row: u32,
    pub start: u32,
    pub end: u32,
}
impl Span {
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dirty {
    format: PixelFormat,
    size: [u32; 2],
    /// Ordered by y, only rows with at least one run.
    rows: Vec<DirtyRow>,
}
impl Dirty {
    /// Find every run of pixels that differs between `before` and `after`.
    ///
    /// The saved pixels start out holding `after`'s values; call [`Dirty::save_image_pixels`] with the image you
    /// want to be able to get back to.
    pub fn new(before: &Image, after: &Image) -> Result<Self, DirtyError> {
        Self::check(before.format(), before.size(), after)?;
        let mut rows = Vec::new();
        for y in 0..before.height() {
            let a = before.row(y);
            let b = after.row(y);
            let mut cols = SmallVec::new();
            let mut x = 0;
            while x < a.len() {
                if a[x] == b[x] {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < a.len() && a[x] != b[x] {
                    x += 1;
                }
                cols.push(DirtyCol {
                    // Row lengths are image widths, which are u32.
                    x: start as u32,
                    pixels: b[start..x].to_vec(),
                });
            }
            if !cols.is_empty() {
                rows.push(DirtyRow { y, cols });
            }
        }
        Ok(Self {
            format: before.format(),
            size: before.size(),
            rows,
        })
    }
    fn check(format: PixelFormat, size: [u32; 2], image: &Image) -> Result<(), DirtyError> {
        if size != image.size() {
            return Err(DirtyError::SizeMismatch {
                expected: size,
                found: image.size(),
            });
        }
        if format != image.format() {
            return Err(DirtyError::FormatMismatch {
                expected: format,
                found: image.format(),
            });
        }
        Ok(())
    }
    /// Copy `source`'s pixels under every run into the saved buffer.
    pub fn save_image_pixels(&mut self, source: &Image) -> Result<(), DirtyError> {
        Self::check(self.format, self.size, source)?;
        for row in &mut self.rows {
            let src = source.row(row.y);
            for col in &mut row.cols {
                let range = col.x as usize..col.end() as usize;
                col.pixels.copy_from_slice(&src[range]);
            }
        }
        Ok(())
    }
    /// Exchange the saved pixels with `target`'s pixels under every run.
    ///
    /// Afterwards `target` holds what was saved, and `self` holds what `target` had. Calling this again undoes it.
    pub fn swap_image_pixels(&mut self, target: &mut Image) -> Result<(), DirtyError> {
        Self::check(self.format, self.size, target)?;
        for row in &mut self.rows {
            let dest = target.row_mut(row.y);
            for col in &mut row.cols {
                let range = col.x as usize..col.end() as usize;
                dest[range].swap_with_slice(&mut col.pixels);
            }
        }
        Ok(())
    }
    /// Iterate the changed runs, ordered by row then column.
    pub fn spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.rows.iter().flat_map(|row| {
            row.cols.iter().map(move |col| Span {
                row: row.y,
                start: col.x,
                end: col.end(),
            })
        })
    }
    /// Number of rows with at least one changed pixel.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
    /// Total number of changed pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.cols.iter())
            .map(|col| col.pixels.len())
            .sum()
    }
    /// No pixels differ.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        self.size
    }
    /// Approximate heap footprint in bytes.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        let spans = self.rows.iter().map(|row| row.cols.len()).sum::<usize>();
        self.pixel_count() * self.format.bytes_per_pixel()
            + spans * std::mem::size_of::<DirtyCol>()
            + self.rows.len() * std::mem::size_of::<DirtyRow>()
    }
}
