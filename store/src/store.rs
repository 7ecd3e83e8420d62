//! Central state container.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
    sync::atomic::{AtomicU64, Ordering},
};

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use tracing::trace;

use crate::{
    error::StoreError,
    meta::{WriteMeta, WriteRecord},
    path::{Key, Path},
};

/// Callback invoked after a write that overlaps the subscribed path.
///
/// Listeners receive no arguments; they read the store again to learn the
/// new value.
pub type Listener = Rc<dyn Fn() -> Result<(), StoreError>>;

/// Unique identifier for a PathStore instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        StoreId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Subscriber {
    path: Path,
    listener: Listener,
}

/// Internal state shared between a PathStore, its clones and its subscriptions.
pub(crate) struct StoreInner {
    /// The actual data.
    data: RefCell<Value>,
    /// Subscribers in subscription order.
    subscribers: RefCell<IndexMap<SubscriberId, Subscriber>>,
    next_subscriber: Cell<u64>,
    last_write: RefCell<Option<WriteRecord>>,
    /// Nesting depth of [`PathStore::batch`] calls.
    batch_depth: Cell<usize>,
    /// Paths written during the current batch.
    dirty_paths: RefCell<IndexSet<Path>>,
}

/// A store holding a JSON value tree, addressed by [`Path`].
///
/// A PathStore is a cheap Clone handle; all clones share the same data and
/// subscribers. Writes notify every subscriber whose path overlaps the
/// written path, so a subscriber on `user` hears about writes to
/// `user.name` and a subscriber on `user.name` hears about writes to `user`.
///
/// # Example
///
/// ```rust
/// use bindhook_store::{Path, PathStore, WriteMeta};
/// use serde_json::json;
///
/// let store = PathStore::default();
/// let name = Path::from(["user", "name"]);
///
/// store.set(&name, Some(json!("Anon")), WriteMeta::default()).unwrap();
/// assert_eq!(store.get(&name), Some(json!("Anon")));
/// assert_eq!(store.snapshot(), json!({ "user": { "name": "Anon" } }));
/// ```
#[derive(Clone)]
pub struct PathStore {
    id: StoreId,
    inner: Rc<StoreInner>,
}

impl Default for PathStore {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl PathStore {
    /// Create a new store with the given initial tree.
    pub fn new(value: Value) -> Self {
        Self {
            id: StoreId::next(),
            inner: Rc::new(StoreInner {
                data: RefCell::new(value),
                subscribers: RefCell::new(IndexMap::new()),
                next_subscriber: Cell::new(0),
                last_write: RefCell::new(None),
                batch_depth: Cell::new(0),
                dirty_paths: RefCell::new(IndexSet::new()),
            }),
        }
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    /// Read the value at `path`.
    ///
    /// Returns `None` when nothing is stored there, including when the path
    /// runs through a value that is not an object or array.
    pub fn get(&self, path: &Path) -> Option<Value> {
        lookup(&self.inner.data.borrow(), path).cloned()
    }

    /// A copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.inner.data.borrow().clone()
    }

    /// Write `value` at `path`, or remove what is there when `value` is `None`.
    ///
    /// Missing objects along the way are created. Subscribers overlapping
    /// `path` are notified afterwards unless `meta.no_publish` is set or a
    /// [`batch`](Self::batch) is in progress. The first listener error stops
    /// notification and is returned.
    pub fn set(&self, path: &Path, value: Option<Value>, meta: WriteMeta) -> Result<(), StoreError> {
        write(&mut self.inner.data.borrow_mut(), path, value)?;
        trace!(store = ?self.id, %path, identifier = ?meta.identifier, "store write");

        let publish = !meta.no_publish;
        *self.inner.last_write.borrow_mut() = Some(WriteRecord {
            path: path.clone(),
            meta,
        });

        if !publish {
            return Ok(());
        }
        if self.inner.batch_depth.get() > 0 {
            self.inner.dirty_paths.borrow_mut().insert(path.clone());
            return Ok(());
        }
        self.notify(std::slice::from_ref(path))
    }

    /// Register `listener` for writes overlapping `path`.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    pub fn subscribe(
        &self,
        path: Path,
        listener: impl Fn() -> Result<(), StoreError> + 'static,
    ) -> Subscription {
        let id = SubscriberId(self.inner.next_subscriber.get());
        self.inner.next_subscriber.set(id.0 + 1);
        trace!(store = ?self.id, %path, subscriber = id.0, "subscribe");
        self.inner.subscribers.borrow_mut().insert(
            id,
            Subscriber {
                path,
                listener: Rc::new(listener),
            },
        );
        Subscription {
            id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Path and metadata of the most recent write.
    pub fn last_write(&self) -> Option<WriteRecord> {
        self.inner.last_write.borrow().clone()
    }

    /// Run `f`, holding back notifications until the outermost batch ends.
    ///
    /// Each subscriber is called at most once for all writes made in the
    /// batch.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> Result<R, StoreError> {
        let depth = self.inner.batch_depth.get();
        self.inner.batch_depth.set(depth + 1);
        let result = f();
        self.inner.batch_depth.set(depth);

        if depth == 0 {
            let dirty: Vec<Path> = self.inner.dirty_paths.borrow_mut().drain(..).collect();
            if !dirty.is_empty() {
                self.notify(&dirty)?;
            }
        }
        Ok(result)
    }

    fn notify(&self, paths: &[Path]) -> Result<(), StoreError> {
        // Collect listeners first, then drop the borrow before calling them.
        // Listeners read the store and may subscribe or unsubscribe.
        let targets: SmallVec<[(SubscriberId, Listener); 8]> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .filter(|(_, subscriber)| paths.iter().any(|p| subscriber.path.overlaps(p)))
            .map(|(id, subscriber)| (*id, subscriber.listener.clone()))
            .collect();

        for (id, listener) in targets {
            // Skip listeners removed by an earlier listener in this round.
            if !self.inner.subscribers.borrow().contains_key(&id) {
                continue;
            }
            trace!(store = ?self.id, subscriber = id.0, "notify");
            listener()?;
        }
        Ok(())
    }
}

/// A live registration on a [`PathStore`].
///
/// Dropping the subscription removes the listener.
pub struct Subscription {
    id: SubscriberId,
    inner: Weak<StoreInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.subscribers.borrow().contains_key(&self.id))
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            trace!(subscriber = self.id.0, "unsubscribe");
            inner.subscribers.borrow_mut().shift_remove(&self.id);
        }
    }
}

/// `null` reads as undefined, so a cleared array slot looks like a missing
/// field.
fn lookup<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut cursor = root;
    for key in path.keys() {
        cursor = match (key, cursor) {
            (Key::Field(name), Value::Object(map)) => map.get(name)?,
            (Key::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    (!cursor.is_null()).then_some(cursor)
}

/// Checks that writing at `path` succeeds, without touching the tree.
///
/// Mirrors [`descend`] and the last step of [`write`]: `null` and missing
/// fields become objects, arrays are never created or extended in the
/// middle of a path.
fn check_writable(
    root: &Value,
    parents: &[Key],
    last: &Key,
    push: bool,
) -> Result<(), StoreError> {
    // `None` stands for an object the write would create.
    let mut cursor = Some(root).filter(|value| !value.is_null());
    for (depth, key) in parents.iter().enumerate() {
        let at = || Path::from_iter(parents[..depth].iter().cloned());
        cursor = match (key, cursor) {
            (Key::Field(_), None) => None,
            (Key::Field(name), Some(Value::Object(map))) => {
                map.get(name).filter(|value| !value.is_null())
            }
            (Key::Index(index), Some(Value::Array(items))) => {
                let item = items.get(*index).ok_or_else(|| StoreError::IndexOutOfRange {
                    path: at(),
                    index: *index,
                    len: items.len(),
                })?;
                Some(item).filter(|value| !value.is_null())
            }
            _ => return Err(StoreError::NotAContainer { path: at() }),
        };
    }

    let at = || Path::from_iter(parents.iter().cloned());
    match (last, cursor) {
        (Key::Field(_), None | Some(Value::Object(_))) => Ok(()),
        (Key::Index(index), Some(Value::Array(items))) => {
            let len = items.len();
            if push && *index > len {
                return Err(StoreError::IndexOutOfRange {
                    path: at(),
                    index: *index,
                    len,
                });
            }
            Ok(())
        }
        _ => Err(StoreError::NotAContainer { path: at() }),
    }
}

fn write(root: &mut Value, path: &Path, value: Option<Value>) -> Result<(), StoreError> {
    let Some((last, parents)) = path.keys().split_last() else {
        *root = value.unwrap_or(Value::Null);
        return Ok(());
    };

    // Removing something that isn't there is a no-op and must not create
    // the containers leading up to it.
    if value.is_none() && lookup(root, path).is_none() {
        return Ok(());
    }
    check_writable(root, parents, last, value.is_some())?;

    let mut cursor = root;
    for (depth, key) in parents.iter().enumerate() {
        cursor = descend(cursor, key, &parents[..depth])?;
    }

    let at = || Path::from_iter(parents.iter().cloned());
    match last {
        Key::Field(name) => {
            if cursor.is_null() {
                *cursor = Value::Object(Map::new());
            }
            let Value::Object(map) = cursor else {
                return Err(StoreError::NotAContainer { path: at() });
            };
            match value {
                Some(value) => {
                    map.insert(name.clone(), value);
                }
                None => {
                    map.remove(name);
                }
            }
        }
        Key::Index(index) => {
            let Value::Array(items) = cursor else {
                return Err(StoreError::NotAContainer { path: at() });
            };
            let len = items.len();
            match value {
                Some(value) if *index < len => items[*index] = value,
                Some(value) if *index == len => items.push(value),
                Some(_) => {
                    return Err(StoreError::IndexOutOfRange {
                        path: at(),
                        index: *index,
                        len,
                    })
                }
                None if *index < len => items[*index] = Value::Null,
                None => {}
            }
        }
    }
    Ok(())
}

fn descend<'a>(cursor: &'a mut Value, key: &Key, at: &[Key]) -> Result<&'a mut Value, StoreError> {
    let at = || Path::from_iter(at.iter().cloned());
    match key {
        Key::Field(name) => {
            if cursor.is_null() {
                *cursor = Value::Object(Map::new());
            }
            match cursor {
                Value::Object(map) => Ok(map.entry(name.clone()).or_insert(Value::Null)),
                _ => Err(StoreError::NotAContainer { path: at() }),
            }
        }
        Key::Index(index) => match cursor {
            Value::Array(items) => {
                let len = items.len();
                items.get_mut(*index).ok_or_else(|| StoreError::IndexOutOfRange {
                    path: at(),
                    index: *index,
                    len,
                })
            }
            _ => Err(StoreError::NotAContainer { path: at() }),
        },
    }
}
