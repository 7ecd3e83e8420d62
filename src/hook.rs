use std::fmt;

use bindhook_reactive::Cleanup;

use crate::{
    binding::{deep_equal, same_value, Binding, Equality, SyncOutcome},
    host::HookHost,
    options::UseOptions,
    projector::{project, Setter},
    store::Store,
};

/// Create the binding hook for `store`.
///
/// ```rust
/// use bindhook::{create_use, Component, Path, PathStore, Runtime, UseOptions};
/// use serde_json::json;
///
/// let store = PathStore::default();
/// let use_store = create_use(store.clone());
///
/// let name = Component::mount((), move |hooks, _| {
///     let path = Path::from(["user", "name"]);
///     let (name, set_name) =
///         use_store.use_path(hooks, path, Some(json!("Anon")), &UseOptions::new())?;
///     Ok((name, set_name))
/// })
/// .unwrap();
///
/// let (value, set_name) = name.output().unwrap();
/// assert_eq!(value, Some(json!("Anon")));
///
/// set_name.set_value(json!("Alice")).unwrap();
/// Runtime::drain_pending_work().unwrap();
/// assert_eq!(name.output().unwrap().0, Some(json!("Alice")));
/// ```
pub fn create_use<S>(store: S) -> UseStore<S>
where
    S: Store,
    S::Value: PartialEq,
{
    UseStore::new(store)
}

/// The hook produced by [`create_use`], bound to one store.
pub struct UseStore<S: Store> {
    store: S,
    equality: Equality<S::Value>,
}

impl<S: Store> Clone for UseStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            equality: self.equality,
        }
    }
}

impl<S: Store> fmt::Debug for UseStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseStore").finish_non_exhaustive()
    }
}

impl<S: Store> UseStore<S> {
    pub fn new(store: S) -> Self
    where
        S::Value: PartialEq,
    {
        Self::with_equality(store, deep_equal::<S::Value>)
    }

    /// Compare store values with `equality` instead of `PartialEq`.
    pub fn with_equality(store: S, equality: Equality<S::Value>) -> Self {
        Self { store, equality }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Bind the calling component to `path`.
    ///
    /// On the first render, and whenever `path` changes, the binding reads
    /// the store, seeds `default` if the path is undefined (or always with
    /// `override_existing`), and subscribes. Renders in between do not
    /// touch the store. Store changes that differ from the last observed
    /// value re-render the component; the binding is torn down when the
    /// component unmounts.
    ///
    /// Returns the current value at `path` and a [`Setter`] for it.
    pub fn use_path<H: HookHost>(
        &self,
        host: &H,
        path: S::Path,
        default: Option<S::Value>,
        options: &UseOptions,
    ) -> Result<(Option<S::Value>, Setter<S>), S::Error> {
        let (rendered, set_rendered) = host.use_state(|| None::<S::Value>);
        let binding = host.use_ref(|| Binding::new(self.store.clone(), self.equality));

        let on_unmount = binding.clone();
        host.use_effect((), move || {
            let cleanup: Cleanup = Box::new(move || -> anyhow::Result<()> {
                on_unmount.borrow_mut().unbind()?;
                Ok(())
            });
            Ok(Some(cleanup))
        });

        let outcome =
            binding
                .borrow_mut()
                .sync(&path, default.as_ref(), options, set_rendered.clone())?;
        if let SyncOutcome::Initialized(effective) = outcome {
            if !same_value(self.equality, &effective, &rendered) {
                set_rendered(effective);
            }
        }

        let observed = binding.borrow().observed();
        Ok(project(&self.store, path, observed, options))
    }
}
