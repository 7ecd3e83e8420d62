//! Metadata attached to store writes.

use std::fmt;

use crate::path::Path;

/// A token naming the writer of a value.
///
/// Hooks tag their writes with an identifier so that subscribers can tell
/// their own updates apart from everybody else's.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Identifier(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::new(name)
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier(name)
    }
}

/// Metadata passed along with every [`PathStore::set`](crate::PathStore::set).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct WriteMeta {
    /// Who performed the write.
    pub identifier: Option<Identifier>,
    /// Store the value without notifying subscribers.
    pub no_publish: bool,
    /// The value was produced by an updater function rather than given directly.
    pub set_by_function: bool,
}

impl WriteMeta {
    /// Metadata carrying only an identifier.
    pub fn tagged(identifier: Option<Identifier>) -> Self {
        WriteMeta {
            identifier,
            ..Default::default()
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<Identifier>) -> Self {
        self.identifier = Some(identifier.into());
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

    /// Whether this write was tagged with `identifier`.
    pub fn is_from(&self, identifier: &Identifier) -> bool {
        self.identifier.as_ref() == Some(identifier)
    }
}

/// The most recent write performed on a store.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteRecord {
    pub path: Path,
    pub meta: WriteMeta,
}
