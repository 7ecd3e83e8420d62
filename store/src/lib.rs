//! A hierarchical, key-addressed store with path subscriptions.
//!
//! [`PathStore`] keeps a [`serde_json::Value`] tree. Values are read and
//! written by [`Path`], and listeners subscribe to a path to hear about
//! writes at, above or below it.
//!
//! ```rust
//! use std::{cell::Cell, rc::Rc};
//!
//! use bindhook_store::{Path, PathStore, WriteMeta};
//! use serde_json::json;
//!
//! let store = PathStore::default();
//! let calls = Rc::new(Cell::new(0));
//!
//! let subscription = store.subscribe(Path::from(["user"]), {
//!     let calls = calls.clone();
//!     move || {
//!         calls.set(calls.get() + 1);
//!         Ok(())
//!     }
//! });
//!
//! store
//!     .set(&Path::from(["user", "name"]), Some(json!("Alice")), WriteMeta::default())
//!     .unwrap();
//! assert_eq!(calls.get(), 1);
//!
//! subscription.unsubscribe();
//! store
//!     .set(&Path::from(["user", "name"]), Some(json!("Bob")), WriteMeta::default())
//!     .unwrap();
//! assert_eq!(calls.get(), 1);
//! ```

mod error;
mod meta;
mod path;
mod store;


pub use error::StoreError;
pub use meta::{Identifier, WriteMeta, WriteRecord};
pub use path::{Key, Path};
pub use store::{Listener, PathStore, StoreId, SubscriberId, Subscription};

pub use serde_json::Value;
