//! The host runtime primitives a binding consumes.

use std::{cell::RefCell, rc::Rc};

use bindhook_reactive::{Cleanup, Hooks, StateSetter};

/// Setter half of a state cell. Calling it stores the value and schedules
/// a re-render.
pub type SetState<T> = Rc<dyn Fn(T)>;

/// The three hook primitives of a UI runtime, as seen from one render.
///
/// Implementations identify cells by call order, so callers must use the
/// primitives in the same order on every render.
pub trait HookHost {
    /// A state cell, initialized by `init` on the first render.
    fn use_state<T: Clone + 'static>(&self, init: impl FnOnce() -> T) -> (T, SetState<T>);

    /// A mutable cell that survives renders without triggering them.
    fn use_ref<T: 'static>(&self, init: impl FnOnce() -> T) -> Rc<RefCell<T>>;

    /// Run `effect` after the render commits when `deps` changed. Its
    /// cleanup runs before the next run and on unmount.
    fn use_effect<D: PartialEq + 'static>(
        &self,
        deps: D,
        effect: impl FnOnce() -> anyhow::Result<Option<Cleanup>> + 'static,
    );
}

impl HookHost for Hooks {
    fn use_state<T: Clone + 'static>(&self, init: impl FnOnce() -> T) -> (T, SetState<T>) {
        let (value, setter): (T, StateSetter<T>) = Hooks::use_state(self, init);
        (value, Rc::new(move |value: T| setter.set(value)))
    }

    fn use_ref<T: 'static>(&self, init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
        Hooks::use_ref(self, init)
    }

    fn use_effect<D: PartialEq + 'static>(
        &self,
        deps: D,
        effect: impl FnOnce() -> anyhow::Result<Option<Cleanup>> + 'static,
    ) {
        Hooks::use_effect(self, deps, effect)
    }
}
