//! Run work once per distinct dependency value.

use std::{fmt, mem};

use bindhook_reactive::Cleanup;
use tracing::warn;

use crate::host::HookHost;

/// Undoes what a run set up. Runs before the next run and on unmount.
pub type Teardown<E> = Box<dyn FnOnce() -> Result<(), E>>;

/// Where a [`OnceOnChange`] is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing has run yet.
    Uninitialized,
    /// The last run is live and its teardown is pending.
    Bound,
    /// Finished for good; further runs are ignored.
    TornDown,
}

enum Lifecycle<D, E> {
    Uninitialized,
    Bound {
        deps: D,
        teardown: Option<Teardown<E>>,
    },
    TornDown,
}

/// Runs a closure whenever its dependencies change structurally, tearing
/// down the previous run first.
///
/// At most one run is live at a time: the previous teardown is taken out
/// of the record before it executes, so even a failing teardown never
/// runs twice and never overlaps with the next run.
pub struct OnceOnChange<D, E> {
    lifecycle: Lifecycle<D, E>,
}

impl<D, E> Default for OnceOnChange<D, E> {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
        }
    }
}

impl<D: fmt::Debug, E> fmt::Debug for OnceOnChange<D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("OnceOnChange");
        s.field("state", &self.state());
        s.field("deps", &self.deps());
        s.finish()
    }
}

impl<D, E> OnceOnChange<D, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        match self.lifecycle {
            Lifecycle::Uninitialized => LifecycleState::Uninitialized,
            Lifecycle::Bound { .. } => LifecycleState::Bound,
            Lifecycle::TornDown => LifecycleState::TornDown,
        }
    }

    /// Deps of the live run.
    pub fn deps(&self) -> Option<&D> {
        match &self.lifecycle {
            Lifecycle::Bound { deps, .. } => Some(deps),
            _ => None,
        }
    }
}

impl<D: PartialEq, E> OnceOnChange<D, E> {
    /// Run `f` unless `deps` equal the deps of the live run.
    ///
    /// The previous run's teardown completes before `f` starts. Returns
    /// whether `f` ran. If the teardown or `f` fails the record is left
    /// uninitialized, so the next call runs again.
    pub fn run(
        &mut self,
        deps: D,
        f: impl FnOnce() -> Result<Option<Teardown<E>>, E>,
    ) -> Result<bool, E> {
        match &self.lifecycle {
            Lifecycle::Bound { deps: live, .. } if *live == deps => return Ok(false),
            Lifecycle::TornDown => return Ok(false),
            _ => {}
        }
        if let Lifecycle::Bound {
            teardown: Some(teardown),
            ..
        } = mem::replace(&mut self.lifecycle, Lifecycle::Uninitialized)
        {
            teardown()?;
        }
        let teardown = f()?;
        self.lifecycle = Lifecycle::Bound { deps, teardown };
        Ok(true)
    }
}

impl<D, E> OnceOnChange<D, E> {
    /// Tear down the live run and stop accepting new ones.
    pub fn finish(&mut self) -> Result<(), E> {
        match mem::replace(&mut self.lifecycle, Lifecycle::TornDown) {
            Lifecycle::Bound {
                teardown: Some(teardown),
                ..
            } => teardown(),
            _ => Ok(()),
        }
    }
}

/// A record dropped while a run is live, e.g. by a component whose mount
/// render failed, still runs the teardown.
impl<D, E> Drop for OnceOnChange<D, E> {
    fn drop(&mut self) {
        if self.finish().is_err() {
            warn!("teardown failed while dropping a live run");
        }
    }
}

/// Hook form of [`OnceOnChange`].
///
/// Runs `f` during this render on mount and whenever `deps` changed since
/// the last run, after running the previous teardown. The last teardown
/// runs when the component unmounts. Returns whether `f` ran.
pub fn use_run_once_on_change<H, D, E>(
    host: &H,
    deps: D,
    f: impl FnOnce() -> Result<Option<Teardown<E>>, E>,
) -> Result<bool, E>
where
    H: HookHost,
    D: PartialEq + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let record = host.use_ref(OnceOnChange::<D, E>::new);
    let on_unmount = record.clone();
    host.use_effect((), move || {
        let cleanup: Cleanup = Box::new(move || -> anyhow::Result<()> {
            on_unmount.borrow_mut().finish()?;
            Ok(())
        });
        Ok(Some(cleanup))
    });
    record.borrow_mut().run(deps, f)
}
