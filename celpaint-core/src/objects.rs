//! # Objects
//!
//! Undo records can't hold references into the document - the objects they talk about get destroyed and
//! recreated by the very records that describe them. Instead, every object an undoer cares about is registered
//! here once, yielding a small [`ObjectId`] that stays the same for the life of the history. At revert time
//! the ID is resolved back through the live [`Sprite`] tree.
//!
//! Resolution always re-checks the tree, so an ID whose object has since left the document fails with
//! [`LookupError::Dangling`] rather than handing out something stale.

use crate::{
    image::{Image, ImageID},
    state::{Cel, CelID, Layer, LayerID, Sprite, SpriteID},
    stock::{Stock, StockID},
};

/// Stable handle to a registered object.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ObjectId(std::num::NonZeroU32);
impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "object {}", self.0)
    }
}

/// Identity of any registrable object.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::EnumDiscriminants)]
#[strum_discriminants(name(ObjectKind), derive(Hash))]
pub enum ObjectKey {
    Sprite(SpriteID),
    Layer(LayerID),
    Cel(CelID),
    Stock(StockID),
    Image(ImageID),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    #[error("{} was never registered", .0)]
    Unknown(ObjectId),
    #[error("{id} is a {found:?}, not a {expected:?}")]
    KindMismatch {
        id: ObjectId,
        expected: ObjectKind,
        found: ObjectKind,
    },
    #[error("{} no longer exists in the document", .0)]
    Dangling(ObjectId),
}

/// A document object that undoers can refer to.
pub trait Object: Sized {
    type Key: Copy;
    const KIND: ObjectKind;
    fn key(&self) -> ObjectKey;
    /// Extract the typed key, or None if `key` is of another kind.
    fn typed_key(key: ObjectKey) -> Option<Self::Key>;
    /// Find the live object in the sprite.
    fn resolve(sprite: &Sprite, key: Self::Key) -> Option<&Self>;
    fn resolve_mut(sprite: &mut Sprite, key: Self::Key) -> Option<&mut Self>;
}

impl Object for Sprite {
    type Key = SpriteID;
    const KIND: ObjectKind = ObjectKind::Sprite;
    fn key(&self) -> ObjectKey {
        ObjectKey::Sprite(self.id())
    }
    fn typed_key(key: ObjectKey) -> Option<Self::Key> {
        match key {
            ObjectKey::Sprite(id) => Some(id),
            _ => None,
        }
    }
    fn resolve(sprite: &Sprite, key: Self::Key) -> Option<&Self> {
        (sprite.id() == key).then_some(sprite)
    }
    fn resolve_mut(sprite: &mut Sprite, key: Self::Key) -> Option<&mut Self> {
        (sprite.id() == key).then_some(sprite)
    }
}
impl Object for Layer {
    type Key = LayerID;
    const KIND: ObjectKind = ObjectKind::Layer;
    fn key(&self) -> ObjectKey {
        ObjectKey::Layer(self.id())
    }
    fn typed_key(key: ObjectKey) -> Option<Self::Key> {
        match key {
            ObjectKey::Layer(id) => Some(id),
            _ => None,
        }
    }
    fn resolve(sprite: &Sprite, key: Self::Key) -> Option<&Self> {
        sprite.layer(key)
    }
    fn resolve_mut(sprite: &mut Sprite, key: Self::Key) -> Option<&mut Self> {
        sprite.layer_mut(key)
    }
}
impl Object for Cel {
    type Key = CelID;
    const KIND: ObjectKind = ObjectKind::Cel;
    fn key(&self) -> ObjectKey {
        ObjectKey::Cel(self.id())
    }
    fn typed_key(key: ObjectKey) -> Option<Self::Key> {
        match key {
            ObjectKey::Cel(id) => Some(id),
            _ => None,
        }
    }
    fn resolve(sprite: &Sprite, key: Self::Key) -> Option<&Self> {
        sprite.cel(key)
    }
    fn resolve_mut(sprite: &mut Sprite, key: Self::Key) -> Option<&mut Self> {
        sprite.cel_mut(key)
    }
}
impl Object for Stock {
    type Key = StockID;
    const KIND: ObjectKind = ObjectKind::Stock;
    fn key(&self) -> ObjectKey {
        ObjectKey::Stock(self.id())
    }
    fn typed_key(key: ObjectKey) -> Option<Self::Key> {
        match key {
            ObjectKey::Stock(id) => Some(id),
            _ => None,
        }
    }
    fn resolve(sprite: &Sprite, key: Self::Key) -> Option<&Self> {
        Some(sprite.stock()).filter(|stock| stock.id() == key)
    }
    fn resolve_mut(sprite: &mut Sprite, key: Self::Key) -> Option<&mut Self> {
        Some(sprite.stock_mut()).filter(|stock| stock.id() == key)
    }
}
impl Object for Image {
    type Key = ImageID;
    const KIND: ObjectKind = ObjectKind::Image;
    fn key(&self) -> ObjectKey {
        ObjectKey::Image(self.id())
    }
    fn typed_key(key: ObjectKey) -> Option<Self::Key> {
        match key {
            ObjectKey::Image(id) => Some(id),
            _ => None,
        }
    }
    fn resolve(sprite: &Sprite, key: Self::Key) -> Option<&Self> {
        let stock = sprite.stock();
        stock.get_image(stock.find(key)?).ok()
    }
    fn resolve_mut(sprite: &mut Sprite, key: Self::Key) -> Option<&mut Self> {
        let stock = sprite.stock_mut();
        let handle = stock.find(key)?;
        stock.get_image_mut(handle).ok()
    }
}

/// Bidirectional map between object identities and stable [`ObjectId`]s.
#[derive(Default, Debug)]
pub struct ObjectsContainer {
    ids: hashbrown::HashMap<ObjectKey, ObjectId>,
    keys: hashbrown::HashMap<ObjectId, ObjectKey>,
    // Last handed-out raw id, zero if none yet.
    last: u32,
}
impl ObjectsContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Register an object, or fetch its existing ID if already registered.
    pub fn add_object<T: Object>(&mut self, object: &T) -> ObjectId {
        self.add_key(object.key())
    }
    /// Register an object by identity alone. The object need not be in the document right now.
    pub fn add_key(&mut self, key: ObjectKey) -> ObjectId {
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        self.last += 1;
        let Some(raw) = std::num::NonZeroU32::new(self.last) else {
            // 4 billion distinct objects within a single history. Nothing sensible left to do.
            log::error!("Undo object IDs exhausted! Aborting!");
            log::logger().flush();
            std::process::abort();
        };
        let id = ObjectId(raw);
        self.ids.insert(key, id);
        self.keys.insert(id, key);
        log::trace!("Registered {key:?} as {id}");
        id
    }
    /// The typed identity behind an ID, without checking that the object is still alive.
    pub fn key_as<T: Object>(&self, id: ObjectId) -> Result<T::Key, LookupError> {
        let key = *self.keys.get(&id).ok_or(LookupError::Unknown(id))?;
        T::typed_key(key).ok_or(LookupError::KindMismatch {
            id,
            expected: T::KIND,
            found: ObjectKind::from(key),
        })
    }
    /// Resolve an ID to the live object in `sprite`.
    pub fn get_object_as<'s, T: Object>(
        &self,
        id: ObjectId,
        sprite: &'s Sprite,
    ) -> Result<&'s T, LookupError> {
        let key = self.key_as::<T>(id)?;
        T::resolve(sprite, key).ok_or(LookupError::Dangling(id))
    }
    /// Resolve an ID to the live object in `sprite`, mutably.
    pub fn get_object_mut_as<'s, T: Object>(
        &self,
        id: ObjectId,
        sprite: &'s mut Sprite,
    ) -> Result<&'s mut T, LookupError> {
        let key = self.key_as::<T>(id)?;
        T::resolve_mut(sprite, key).ok_or(LookupError::Dangling(id))
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
