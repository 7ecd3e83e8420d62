//! Configuration for a store binding and for individual writes.

use bindhook_store::{Identifier, WriteMeta};

/// Options for [`UseStore::use_path`](crate::UseStore::use_path).
///
/// ```rust
/// use bindhook::UseOptions;
///
/// let options = UseOptions::new()
///     .override_existing(true)
///     .identifier("editor")
///     .cleanup(true);
/// assert!(options.override_existing);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct UseOptions {
    /// Replace whatever the store holds with the default value whenever the
    /// binding (re)initializes.
    #[cfg_attr(feature = "serde", serde(rename = "override"))]
    pub override_existing: bool,
    /// Tag for every write this binding performs.
    pub identifier: Option<Identifier>,
    /// Reset the path to undefined when the binding is torn down.
    pub cleanup: bool,
    /// Setter writes skip subscriber notification.
    pub no_publish: bool,
    /// Setter writes are marked as produced by an updater function.
    pub set_by_function: bool,
}

impl UseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn override_existing(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    pub fn identifier(mut self, identifier: impl Into<Identifier>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn no_publish(mut self, no_publish: bool) -> Self {
        self.no_publish = no_publish;
        self
    }

    pub fn set_by_function(mut self, set_by_function: bool) -> Self {
        self.set_by_function = set_by_function;
        self
    }

    /// Metadata for writes the binding makes on its own: seeding the default
    /// and clearing the path on teardown. These carry the identifier only.
    pub(crate) fn lifecycle_meta(&self) -> WriteMeta {
        WriteMeta::tagged(self.identifier.clone())
    }

    /// Metadata for setter writes before per-call overrides.
    pub(crate) fn setter_meta(&self) -> WriteMeta {
        WriteMeta {
            identifier: self.identifier.clone(),
            no_publish: self.no_publish,
            set_by_function: self.set_by_function,
        }
    }
}

/// Per-call options for [`Setter::set`](crate::Setter::set).
///
/// Every field left as `None` falls back to the binding's [`UseOptions`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct SetOptions {
    pub identifier: Option<Identifier>,
    pub no_publish: Option<bool>,
    pub set_by_function: Option<bool>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identifier(mut self, identifier: impl Into<Identifier>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn no_publish(mut self, no_publish: bool) -> Self {
        self.no_publish = Some(no_publish);
        self
    }

    pub fn set_by_function(mut self, set_by_function: bool) -> Self {
        self.set_by_function = Some(set_by_function);
        self
    }

    /// Applies these overrides on top of `base`.
    pub(crate) fn apply(self, base: &WriteMeta) -> WriteMeta {
        WriteMeta {
            identifier: self.identifier.or_else(|| base.identifier.clone()),
            no_publish: self.no_publish.unwrap_or(base.no_publish),
            set_by_function: self.set_by_function.unwrap_or(base.set_by_function),
        }
    }
}
