use std::{
    any::Any,
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use crate::runtime::{ComponentTrait, Runtime};

/// Cleanup returned by an effect. It runs before the effect runs again and
/// when the component unmounts.
pub type Cleanup = Box<dyn FnOnce() -> anyhow::Result<()>>;

type EffectFn = Box<dyn FnOnce() -> anyhow::Result<Option<Cleanup>>>;

/// Storage behind `use_state`.
struct StateCell<T>(RefCell<T>);

/// Storage behind `use_effect`.
pub(crate) struct EffectSlot {
    /// `None` until the effect has run once.
    deps: Option<Box<dyn Any>>,
    pub(crate) cleanup: Option<Cleanup>,
}

/// An effect whose deps changed during this render, waiting for commit.
struct PendingEffect {
    index: usize,
    deps: Box<dyn Any>,
    run: EffectFn,
}

/// The hook context handed to a component's render function.
///
/// Hooks are identified by call order, so a render function must call the
/// same hooks in the same order every time it runs.
pub struct Hooks {
    component: Weak<dyn ComponentTrait>,
    slots: Rc<RefCell<Vec<Box<dyn Any>>>>,
    cursor: Cell<usize>,
    effects: RefCell<Vec<PendingEffect>>,
}

impl Hooks {
    pub(crate) fn new(
        component: Weak<dyn ComponentTrait>,
        slots: Rc<RefCell<Vec<Box<dyn Any>>>>,
    ) -> Self {
        Self {
            component,
            slots,
            cursor: Cell::new(0),
            effects: RefCell::new(Vec::new()),
        }
    }

    fn next_index(&self) -> usize {
        let index = self.cursor.get();
        self.cursor.set(index + 1);
        index
    }

    /// Returns the handle stored in the next slot, creating it with `init`
    /// on the first render.
    fn slot<T: Clone + 'static>(&self, init: impl FnOnce() -> T) -> T {
        let index = self.next_index();
        let is_new = index == self.slots.borrow().len();
        if is_new {
            // Built outside the borrow: `init` is user code.
            let value = init();
            self.slots.borrow_mut().push(Box::new(value));
        }
        self.slots.borrow()[index]
            .downcast_ref::<T>()
            .cloned()
            .unwrap_or_else(|| hook_order_violation(index))
    }

    /// Local state that survives re-renders.
    ///
    /// Returns the current value and a setter. Calling the setter stores the
    /// new value and queues a re-render of the component.
    pub fn use_state<T: Clone + 'static>(&self, init: impl FnOnce() -> T) -> (T, StateSetter<T>) {
        let cell = self.slot(|| Rc::new(StateCell(RefCell::new(init()))));
        let value = cell.0.borrow().clone();
        (
            value,
            StateSetter {
                cell,
                component: self.component.clone(),
            },
        )
    }

    /// A mutable box that survives re-renders. Writing to it never
    /// re-renders.
    pub fn use_ref<T: 'static>(&self, init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
        self.slot(|| Rc::new(RefCell::new(init())))
    }

    /// Run `effect` after this render commits, if `deps` differ from the
    /// deps of the last run.
    ///
    /// With deps that never change, such as `()`, the effect runs once on
    /// mount and its cleanup runs once on unmount.
    pub fn use_effect<D: PartialEq + 'static>(
        &self,
        deps: D,
        effect: impl FnOnce() -> anyhow::Result<Option<Cleanup>> + 'static,
    ) {
        let index = self.next_index();
        let changed = {
            let mut slots = self.slots.borrow_mut();
            if index == slots.len() {
                slots.push(Box::new(EffectSlot {
                    deps: None,
                    cleanup: None,
                }));
            }
            let slot = slots[index]
                .downcast_ref::<EffectSlot>()
                .unwrap_or_else(|| hook_order_violation(index));
            slot.deps
                .as_ref()
                .and_then(|prev| prev.downcast_ref::<D>())
                .is_none_or(|prev| *prev != deps)
        };
        if changed {
            self.effects.borrow_mut().push(PendingEffect {
                index,
                deps: Box::new(deps),
                run: Box::new(effect),
            });
        }
    }

    /// Checks the hook count after the render function returned.
    pub(crate) fn finish(&self) {
        let expected = self.slots.borrow().len();
        let called = self.cursor.get();
        assert_eq!(
            called, expected,
            "render called {called} hooks, but the component has {expected}"
        );
    }

    /// Runs the effects queued during this render, each after the cleanup
    /// of its previous run.
    pub(crate) fn commit_effects(&self) -> anyhow::Result<()> {
        let pending = self.effects.take();
        for effect in pending {
            let previous = self.effect_slot(effect.index, |slot| slot.cleanup.take());
            if let Some(cleanup) = previous {
                cleanup()?;
            }
            let cleanup = (effect.run)()?;
            self.effect_slot(effect.index, move |slot| {
                slot.deps = Some(effect.deps);
                slot.cleanup = cleanup;
            });
        }
        Ok(())
    }

    fn effect_slot<O>(&self, index: usize, f: impl FnOnce(&mut EffectSlot) -> O) -> O {
        let mut slots = self.slots.borrow_mut();
        let slot = slots[index]
            .downcast_mut::<EffectSlot>()
            .unwrap_or_else(|| hook_order_violation(index));
        f(slot)
    }
}

fn hook_order_violation(index: usize) -> ! {
    panic!("hook {index} was called in a different order than on the first render")
}

/// Setter returned by [`Hooks::use_state`].
pub struct StateSetter<T> {
    cell: Rc<StateCell<T>>,
    component: Weak<dyn ComponentTrait>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            component: self.component.clone(),
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("StateSetter");
        s.field("component", &self.component.upgrade().map(|c| c.id()));
        s.finish()
    }
}

impl<T: 'static> StateSetter<T> {
    /// Store `value` and queue a re-render.
    pub fn set(&self, value: T) {
        *self.cell.0.borrow_mut() = value;
        self.schedule();
    }

    /// Update the stored value in place and queue a re-render.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.cell.0.borrow_mut());
        self.schedule();
    }

    fn schedule(&self) {
        // Setters outliving their component are inert.
        if let Some(component) = self.component.upgrade() {
            if component.is_mounted() {
                Runtime::schedule(component);
            }
        }
    }
}
