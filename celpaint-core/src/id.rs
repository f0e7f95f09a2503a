//! # IDs
//! Document objects (sprites, layers, cels, image buffers) each carry a [`UniqueID`], namespaced by the
//! type of the object. An ID is minted once when the object is constructed and moves with the object
//! wherever it goes, including into and back out of undo records. It is never re-minted for the same object.
//!
//! These are *identities*, not the stable handles recorded by undoers. See [`crate::objects`] for those.

// Next free raw ID, per namespace.
static ID_SERVER: parking_lot::RwLock<
    std::collections::BTreeMap<std::any::TypeId, std::sync::atomic::AtomicU64>,
> = parking_lot::const_rwlock(std::collections::BTreeMap::new());

/// ID that is unique within this execution of the program.
/// IDs from different namespaces may share a raw value but never compare equal, as they are different types.
pub struct UniqueID<T: std::any::Any> {
    id: std::num::NonZeroU64,
    _phantom: std::marker::PhantomData<T>,
}
impl<T: std::any::Any> Clone for UniqueID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for UniqueID<T> {}
impl<T: std::any::Any> PartialEq for UniqueID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for UniqueID<T> {}
impl<T: std::any::Any> PartialOrd for UniqueID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: std::any::Any> Ord for UniqueID<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}
impl<T: std::any::Any> std::hash::Hash for UniqueID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// Only a u64 lives inside, regardless of T.
unsafe impl<T: std::any::Any> Send for UniqueID<T> {}
unsafe impl<T: std::any::Any> Sync for UniqueID<T> {}

impl<T: std::any::Any> UniqueID<T> {
    /// Mint a fresh ID in `T`'s namespace.
    #[must_use]
    pub fn new() -> Self {
        let ty = std::any::TypeId::of::<T>();
        let raw = {
            let read = ID_SERVER.upgradable_read();
            if let Some(counter) = read.get(&ty) {
                counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            } else {
                // First ID of this namespace. Happens once per type for the whole run.
                let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
                write
                    .entry(ty)
                    .or_insert_with(|| 1.into())
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            }
        };
        let Some(id) = std::num::NonZeroU64::new(raw) else {
            // Wrapped all the way around. Handing out a duplicate would silently corrupt undo state.
            log::error!("{} ID overflow! Aborting!", std::any::type_name::<T>());
            log::logger().flush();
            std::process::abort();
        };
        Self {
            id,
            _phantom: std::marker::PhantomData,
        }
    }
    /// The raw numeric value. Values from different namespaces may collide!
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id.get()
    }
}
impl<T: std::any::Any> Default for UniqueID<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: std::any::Any> std::fmt::Display for UniqueID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = std::any::type_name::<T>();
        // rsplit always yields at least one item.
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "{short}#{}", self.id)
    }
}
impl<T: std::any::Any> std::fmt::Debug for UniqueID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
