use crate::stock::ImageHandle;

pub type CelID = crate::UniqueID<Cel>;
pub type FrameIndex = u32;

/// The placement of one image on one frame of a layer.
#[derive(Debug)]
pub struct Cel {
    id: CelID,
    frame: FrameIndex,
    image: ImageHandle,
    x: i32,
    y: i32,
}
impl Cel {
    /// A cel at the origin.
    #[must_use]
    pub fn new(frame: FrameIndex, image: ImageHandle) -> Self {
        Self {
            id: CelID::new(),
            frame,
            image,
            x: 0,
            y: 0,
        }
    }
    /// Same placement and image reference, new identity.
    #[must_use]
    pub fn new_copy(&self) -> Self {
        Self {
            id: CelID::new(),
            frame: self.frame,
            image: self.image,
            x: self.x,
            y: self.y,
        }
    }
    #[must_use]
    pub fn id(&self) -> CelID {
        self.id
    }
    #[must_use]
    pub fn frame(&self) -> FrameIndex {
        self.frame
    }
    /// Only valid while the cel is detached from a layer, which keeps its cels sorted by frame.
    pub(crate) fn set_frame(&mut self, frame: FrameIndex) {
        self.frame = frame;
    }
    #[must_use]
    pub fn image(&self) -> ImageHandle {
        self.image
    }
    pub fn set_image(&mut self, image: ImageHandle) {
        self.image = image;
    }
    #[must_use]
    pub fn position(&self) -> [i32; 2] {
        [self.x, self.y]
    }
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }
}
