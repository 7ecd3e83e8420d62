//! # bindhook
//!
//! A factory for hooks that bind a component's render state to a path in an
//! external, key-addressed store.
//!
//! [`create_use`] takes a [`Store`] and returns a [`UseStore`]. Inside a
//! render, [`UseStore::use_path`] returns the value at a path together with
//! a [`Setter`], and keeps the two in sync:
//!
//! - On mount, and whenever the path changes, the hook reads the store,
//!   seeds the default value when the path is undefined (or always, with
//!   [`UseOptions::override_existing`]) and subscribes to the path.
//! - Renders with an unchanged path never touch the store.
//! - Store changes re-render the component, unless the new value equals the
//!   one the hook last observed.
//! - The setter writes to the store, tagged with the hook's [`Identifier`].
//!   The new value comes back through the subscription.
//! - On unmount the subscription is released, and with
//!   [`UseOptions::cleanup`] the path is reset to undefined.
//!
//! The hook runs on any host implementing [`HookHost`]. The bundled
//! [`bindhook_reactive`] runtime and [`bindhook_store::PathStore`] implement
//! the two collaborator traits.

mod binding;
mod hook;
mod host;
mod once;
mod options;
mod projector;
mod store;

pub use binding::{deep_equal, Binding, BindingState, Equality, SyncOutcome};
pub use hook::{create_use, UseStore};
pub use host::{HookHost, SetState};
pub use once::{use_run_once_on_change, LifecycleState, OnceOnChange, Teardown};
pub use options::{SetOptions, UseOptions};
pub use projector::{project, Setter};
pub use store::{Listener, Store, Unsubscribe};

pub use bindhook_reactive::{Cleanup, Component, Hooks, Runtime};
pub use bindhook_store::{Identifier, Key, Path, PathStore, StoreError, Value, WriteMeta};
