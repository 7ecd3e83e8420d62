//! The per-hook binding between a path in the store and a render state cell.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use tracing::{debug, trace};

use crate::{
    host::SetState,
    once::{LifecycleState, OnceOnChange, Teardown},
    options::UseOptions,
    store::{Listener, Store},
};

/// Value comparison used to decide whether a notification carries news.
pub type Equality<V> = fn(&V, &V) -> bool;

/// The default [`Equality`]: structural equality through `PartialEq`.
pub fn deep_equal<V: PartialEq>(a: &V, b: &V) -> bool {
    a == b
}

/// Compares two possibly undefined values. Undefined only equals undefined.
pub(crate) fn same_value<V>(equality: Equality<V>, a: &Option<V>, b: &Option<V>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => equality(a, b),
        _ => false,
    }
}

/// Lifecycle of a [`Binding`].
pub type BindingState = LifecycleState;

/// What a call to [`Binding::sync`] did.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncOutcome<V> {
    /// The binding was already bound to this path, or was torn down.
    Unchanged,
    /// The binding (re)initialized and settled on this value.
    Initialized(Option<V>),
}

/// Binds one hook instance to one path of a store at a time.
///
/// The binding is `Uninitialized` until the first [`sync`](Self::sync),
/// `Bound` to a path with exactly one live subscription afterwards, and
/// `TornDown` for good after [`unbind`](Self::unbind). Syncing with a path
/// that differs structurally from the bound one tears the old binding down
/// before binding the new path.
///
/// `observed` holds the last store value seen for the bound path. The
/// subscription compares every notification against it and only calls the
/// render notifier when the value really changed.
pub struct Binding<S: Store> {
    store: S,
    equality: Equality<S::Value>,
    lifecycle: OnceOnChange<S::Path, S::Error>,
    observed: Rc<RefCell<Option<S::Value>>>,
}

impl<S: Store> fmt::Debug for Binding<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Binding");
        s.field("state", &self.state());
        s.field("path", &self.path());
        s.field("observed", &self.observed.borrow());
        s.finish()
    }
}

impl<S: Store> Binding<S> {
    pub fn new(store: S, equality: Equality<S::Value>) -> Self {
        Self {
            store,
            equality,
            lifecycle: OnceOnChange::new(),
            observed: Rc::new(RefCell::new(None)),
        }
    }

    pub fn state(&self) -> BindingState {
        self.lifecycle.state()
    }

    pub fn is_bound(&self) -> bool {
        self.state() == BindingState::Bound
    }

    /// The bound path.
    pub fn path(&self) -> Option<&S::Path> {
        self.lifecycle.deps()
    }

    /// The most recently observed store value for the bound path.
    pub fn observed(&self) -> Option<S::Value> {
        self.observed.borrow().clone()
    }

    /// Bring the binding in line with `path`.
    ///
    /// Binds on the first call and rebinds when `path` changed. Otherwise
    /// this touches neither the store nor the subscription. `notify` is
    /// called from the subscription with each new value.
    pub fn sync(
        &mut self,
        path: &S::Path,
        default: Option<&S::Value>,
        options: &UseOptions,
        notify: SetState<Option<S::Value>>,
    ) -> Result<SyncOutcome<S::Value>, S::Error> {
        match self.state() {
            BindingState::Bound if self.path() == Some(path) => {
                return Ok(SyncOutcome::Unchanged);
            }
            BindingState::TornDown => return Ok(SyncOutcome::Unchanged),
            BindingState::Bound => {
                debug!(from = ?self.path(), to = ?path, "rebind");
            }
            BindingState::Uninitialized => {
                debug!(?path, "bind");
            }
        }

        let mut effective = None;
        let Self {
            store,
            equality,
            lifecycle,
            observed,
        } = self;
        lifecycle.run(path.clone(), || {
            let (value, teardown) =
                bind(store, *equality, observed, path, default, options, notify)?;
            effective = value;
            Ok(Some(teardown))
        })?;
        Ok(SyncOutcome::Initialized(effective))
    }

    /// Tear the binding down: clear the path if the binding was created with
    /// `cleanup`, then drop the subscription. Later syncs do nothing.
    pub fn unbind(&mut self) -> Result<(), S::Error> {
        if self.is_bound() {
            debug!(path = ?self.path(), "unbind");
        }
        self.lifecycle.finish()
    }
}

/// Initialize `path`: settle on an effective value, seed the store when
/// needed and subscribe. Returns the effective value and the teardown.
fn bind<S: Store>(
    store: &S,
    equality: Equality<S::Value>,
    observed: &Rc<RefCell<Option<S::Value>>>,
    path: &S::Path,
    default: Option<&S::Value>,
    options: &UseOptions,
    notify: SetState<Option<S::Value>>,
) -> Result<(Option<S::Value>, Teardown<S::Error>), S::Error> {
    let current = store.get(path)?;
    let seed = options.override_existing || (current.is_none() && default.is_some());
    let effective = if seed { default.cloned() } else { current };
    *observed.borrow_mut() = effective.clone();

    if seed {
        trace!(?path, "seed default");
        store.set(path, effective.clone(), options.lifecycle_meta())?;
    }

    // Cleared by the teardown so its own clearing write is not reported.
    let live = Rc::new(Cell::new(true));
    let listener: Listener<S::Error> = {
        let store = store.clone();
        let path = path.clone();
        let observed = observed.clone();
        let live = live.clone();
        Rc::new(move || {
            if !live.get() {
                return Ok(());
            }
            let latest = store.get(&path)?;
            if same_value(equality, &latest, &observed.borrow()) {
                trace!(?path, "suppressed echo");
                return Ok(());
            }
            trace!(?path, "store changed");
            *observed.borrow_mut() = latest.clone();
            notify(latest);
            Ok(())
        })
    };
    let unsubscribe = store.subscribe(path, listener)?;

    let teardown: Teardown<S::Error> = {
        let store = store.clone();
        let path = path.clone();
        let clear = options.cleanup.then(|| options.lifecycle_meta());
        Box::new(move || {
            live.set(false);
            let cleared = match clear {
                Some(meta) => store.set(&path, None, meta),
                None => Ok(()),
            };
            unsubscribe.call();
            cleared
        })
    };
    Ok((effective, teardown))
}
