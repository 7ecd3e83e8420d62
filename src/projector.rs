//! The value and setter a hook hands back on every render.

use std::fmt;

use bindhook_store::WriteMeta;

use crate::{
    options::{SetOptions, UseOptions},
    store::Store,
};

/// Writes to the bound path of a store.
///
/// A setter never touches render state directly. Its writes reach the
/// component through the binding's subscription like anybody else's.
pub struct Setter<S: Store> {
    store: S,
    path: S::Path,
    meta: WriteMeta,
}

impl<S: Store> Clone for Setter<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            path: self.path.clone(),
            meta: self.meta.clone(),
        }
    }
}

impl<S: Store> fmt::Debug for Setter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Setter");
        s.field("path", &self.path);
        s.field("meta", &self.meta);
        s.finish()
    }
}

impl<S: Store> Setter<S> {
    pub fn path(&self) -> &S::Path {
        &self.path
    }

    /// Write `value`, with `options` overriding the hook's write metadata.
    pub fn set(&self, value: Option<S::Value>, options: SetOptions) -> Result<(), S::Error> {
        let meta = options.apply(&self.meta);
        self.store.set(&self.path, value, meta)
    }

    /// Write `value` with the hook's write metadata.
    pub fn set_value(&self, value: S::Value) -> Result<(), S::Error> {
        self.set(Some(value), SetOptions::default())
    }

    /// Reset the path to undefined.
    pub fn clear(&self) -> Result<(), S::Error> {
        self.set(None, SetOptions::default())
    }

    /// Write the result of `f` applied to the value currently in the store.
    /// The write is marked as set by function.
    pub fn update(
        &self,
        f: impl FnOnce(Option<&S::Value>) -> Option<S::Value>,
    ) -> Result<(), S::Error> {
        let current = self.store.get(&self.path)?;
        let next = f(current.as_ref());
        self.set(next, SetOptions::default().set_by_function(true))
    }
}

/// Builds what a render returns: the live observed value and a setter bound
/// to `path` with the write metadata derived from `options`.
pub fn project<S: Store>(
    store: &S,
    path: S::Path,
    observed: Option<S::Value>,
    options: &UseOptions,
) -> (Option<S::Value>, Setter<S>) {
    let setter = Setter {
        store: store.clone(),
        path,
        meta: options.setter_meta(),
    };
    (observed, setter)
}
