use super::cel::{Cel, CelID, FrameIndex};

pub type LayerID = crate::UniqueID<Layer>;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerError {
    #[error("frame {} already has a cel", .0)]
    FrameOccupied(FrameIndex),
}

/// An image layer, holding at most one cel per frame.
#[derive(Debug)]
pub struct Layer {
    id: LayerID,
    pub name: String,
    /// Sorted by frame, no duplicates.
    cels: Vec<Cel>,
}
impl Layer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: LayerID::new(),
            name: name.into(),
            cels: Vec::new(),
        }
    }
    #[must_use]
    pub fn id(&self) -> LayerID {
        self.id
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn cels(&self) -> impl Iterator<Item = &Cel> + '_ {
        self.cels.iter()
    }
    #[must_use]
    pub fn cel(&self, frame: FrameIndex) -> Option<&Cel> {
        self.cels
            .binary_search_by_key(&frame, Cel::frame)
            .ok()
            .map(|idx| &self.cels[idx])
    }
    #[must_use]
    pub fn cel_by_id(&self, id: CelID) -> Option<&Cel> {
        self.cels.iter().find(|cel| cel.id() == id)
    }
    pub fn cel_by_id_mut(&mut self, id: CelID) -> Option<&mut Cel> {
        self.cels.iter_mut().find(|cel| cel.id() == id)
    }
    /// Insert a cel in frame order. Fails, handing the cel back, if its frame is taken.
    pub fn add_cel(&mut self, cel: Cel) -> Result<(), (LayerError, Cel)> {
        match self.cels.binary_search_by_key(&cel.frame(), Cel::frame) {
            Ok(_) => Err((LayerError::FrameOccupied(cel.frame()), cel)),
            Err(idx) => {
                self.cels.insert(idx, cel);
                Ok(())
            }
        }
    }
    /// Detach a cel, giving ownership to the caller.
    pub fn remove_cel(&mut self, id: CelID) -> Option<Cel> {
        let idx = self.cels.iter().position(|cel| cel.id() == id)?;
        Some(self.cels.remove(idx))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stock::ImageHandle;

    #[test]
    fn cels_sorted_by_frame() {
        let mut layer = Layer::new("Layer 1");
        for frame in [3, 0, 1] {
            layer.add_cel(Cel::new(frame, ImageHandle(frame))).unwrap();
        }
        let frames: Vec<_> = layer.cels().map(Cel::frame).collect();
        assert_eq!(frames, [0, 1, 3]);
        assert_eq!(layer.cel(3).map(Cel::image), Some(ImageHandle(3)));
        assert!(layer.cel(2).is_none());
    }
    #[test]
    fn one_cel_per_frame() {
        let mut layer = Layer::new("Layer 1");
        layer.add_cel(Cel::new(0, ImageHandle(0))).unwrap();
        let (err, rejected) = layer.add_cel(Cel::new(0, ImageHandle(1))).unwrap_err();
        assert_eq!(err, LayerError::FrameOccupied(0));
        assert_eq!(rejected.image(), ImageHandle(1));
    }
    #[test]
    fn remove_hands_back_same_cel() {
        let mut layer = Layer::new("Layer 1");
        let cel = Cel::new(2, ImageHandle(0));
        let id = cel.id();
        layer.add_cel(cel).unwrap();
        let removed = layer.remove_cel(id).unwrap();
        assert_eq!(removed.id(), id);
        assert!(layer.cel_by_id(id).is_none());
        assert!(layer.remove_cel(id).is_none());
    }
}
