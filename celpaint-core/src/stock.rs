//! # Stock
//!
//! The sprite-wide pool of image buffers. Cels don't own their pixels, they reference a slot in here by
//! [`ImageHandle`].
//!
//! Slots are append-only: a freed slot stays empty forever and its handle is never handed out again. That way
//! a handle remembered by a cel or an undo record can never silently start pointing at somebody else's image.

use crate::image::{Image, ImageID};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ImageHandle(pub u32);
impl std::fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "image slot {}", self.0)
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockError {
    #[error("{} is not live", .0)]
    InvalidHandle(ImageHandle),
    #[error("{} is already occupied", .0)]
    Occupied(ImageHandle),
    #[error("stock is full")]
    Full,
}

pub type StockID = crate::UniqueID<Stock>;

#[derive(Default)]
pub struct Stock {
    id: StockID,
    images: Vec<Option<Image>>,
}
impl Stock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn id(&self) -> StockID {
        self.id
    }
    /// Take ownership of a new image, returning a fresh handle to it.
    pub fn add_image(&mut self, image: Image) -> Result<ImageHandle, StockError> {
        let handle = ImageHandle(u32::try_from(self.images.len()).map_err(|_| StockError::Full)?);
        self.images.push(Some(image));
        Ok(handle)
    }
    /// Install `image` at `handle`, returning the buffer it replaces. Fails, handing the image back, if
    /// `handle` is not live.
    pub fn replace_image(
        &mut self,
        handle: ImageHandle,
        image: Image,
    ) -> Result<Image, (StockError, Image)> {
        match self.images.get_mut(handle.0 as usize) {
            Some(Some(old)) => Ok(std::mem::replace(old, image)),
            _ => Err((StockError::InvalidHandle(handle), image)),
        }
    }
    /// Relinquish the image at `handle`, handing ownership to the caller. The slot stays empty.
    pub fn free_image(&mut self, handle: ImageHandle) -> Result<Image, StockError> {
        let slot = self.slot_mut(handle)?;
        slot.take().ok_or(StockError::InvalidHandle(handle))
    }
    /// Put a previously freed image back at its old handle. Fails, handing the image back, if the slot never
    /// existed or is occupied.
    pub fn restore_image(
        &mut self,
        handle: ImageHandle,
        image: Image,
    ) -> Result<(), (StockError, Image)> {
        match self.images.get_mut(handle.0 as usize) {
            None => Err((StockError::InvalidHandle(handle), image)),
            Some(Some(_)) => Err((StockError::Occupied(handle), image)),
            Some(slot) => {
                *slot = Some(image);
                Ok(())
            }
        }
    }
    pub fn get_image(&self, handle: ImageHandle) -> Result<&Image, StockError> {
        self.images
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(StockError::InvalidHandle(handle))
    }
    pub fn get_image_mut(&mut self, handle: ImageHandle) -> Result<&mut Image, StockError> {
        self.slot_mut(handle)?
            .as_mut()
            .ok_or(StockError::InvalidHandle(handle))
    }
    fn slot_mut(&mut self, handle: ImageHandle) -> Result<&mut Option<Image>, StockError> {
        match self.images.get_mut(handle.0 as usize) {
            Some(slot) if slot.is_some() => Ok(slot),
            _ => Err(StockError::InvalidHandle(handle)),
        }
    }
    // O(n) over slots. Only used when reverting, which is rare compared to painting.
    /// Find the handle of the image with the given identity.
    #[must_use]
    pub fn find(&self, id: ImageID) -> Option<ImageHandle> {
        self.images
            .iter()
            .position(|image| image.as_ref().is_some_and(|image| image.id() == id))
            // Positions always fit, add_image checked.
            .map(|idx| ImageHandle(idx as u32))
    }
    /// Count of live images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.iter().filter(|image| image.is_some()).count()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl std::fmt::Debug for Stock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stock")
            .field("id", &self.id)
            .field("live", &self.len())
            .field("slots", &self.images.len())
            .finish()
    }
}
