//! The store interface a binding consumes.

use std::{fmt, rc::Rc};

use bindhook_store::{Path, PathStore, StoreError, Value, WriteMeta};

/// Called after a write that may have changed the subscribed path. It takes
/// no arguments; the listener reads the store again.
pub type Listener<E> = Rc<dyn Fn() -> Result<(), E>>;

/// Handle that removes a subscription when called.
pub struct Unsubscribe(Box<dyn FnOnce()>);

impl Unsubscribe {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Unsubscribe(Box::new(f))
    }

    pub fn call(self) {
        (self.0)()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unsubscribe")
    }
}

/// A key-addressed store with change subscriptions.
///
/// `None` stands for "undefined": nothing stored at the path. All three
/// operations are synchronous, and `set` must notify the path's subscribers
/// before returning (unless the write metadata asks it not to).
pub trait Store: Clone + 'static {
    type Path: Clone + PartialEq + fmt::Debug + 'static;
    type Value: Clone + fmt::Debug + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, path: &Self::Path) -> Result<Option<Self::Value>, Self::Error>;

    fn set(
        &self,
        path: &Self::Path,
        value: Option<Self::Value>,
        meta: WriteMeta,
    ) -> Result<(), Self::Error>;

    fn subscribe(
        &self,
        path: &Self::Path,
        listener: Listener<Self::Error>,
    ) -> Result<Unsubscribe, Self::Error>;
}

impl Store for PathStore {
    type Path = Path;
    type Value = Value;
    type Error = StoreError;

    fn get(&self, path: &Path) -> Result<Option<Value>, StoreError> {
        Ok(PathStore::get(self, path))
    }

    fn set(&self, path: &Path, value: Option<Value>, meta: WriteMeta) -> Result<(), StoreError> {
        PathStore::set(self, path, value, meta)
    }

    fn subscribe(
        &self,
        path: &Path,
        listener: Listener<StoreError>,
    ) -> Result<Unsubscribe, StoreError> {
        let subscription = PathStore::subscribe(self, path.clone(), move || listener());
        Ok(Unsubscribe::new(move || subscription.unsubscribe()))
    }
}
