use std::{
    any::Any,
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use tracing::debug;

use crate::{
    hooks::{Cleanup, EffectSlot, Hooks},
    id::Id,
    runtime::ComponentTrait,
};

type RenderFn<P, R> = Box<dyn Fn(&Hooks, &P) -> anyhow::Result<R>>;

struct ComponentInner<P: 'static, R: 'static> {
    id: Id,
    this: Weak<ComponentInner<P, R>>,
    render: RenderFn<P, R>,
    props: RefCell<P>,
    slots: Rc<RefCell<Vec<Box<dyn Any>>>>,
    output: RefCell<Option<R>>,
    renders: Cell<usize>,
    mounted: Cell<bool>,
}

impl<P: 'static, R: 'static> ComponentInner<P, R> {
    fn render(&self) -> anyhow::Result<()> {
        let component: Weak<dyn ComponentTrait> = self.this.clone();
        let hooks = Hooks::new(component, self.slots.clone());
        let output = {
            let props = self.props.borrow();
            (self.render)(&hooks, &props)?
        };
        hooks.finish();
        *self.output.borrow_mut() = Some(output);
        self.renders.set(self.renders.get() + 1);
        hooks.commit_effects()
    }

    fn unmount(&self) -> anyhow::Result<()> {
        if !self.mounted.replace(false) {
            return Ok(());
        }
        debug!(component = ?self.id, "unmount");
        let cleanups: Vec<Cleanup> = self
            .slots
            .borrow_mut()
            .iter_mut()
            .filter_map(|slot| slot.downcast_mut::<EffectSlot>())
            .filter_map(|slot| slot.cleanup.take())
            .collect();
        for cleanup in cleanups {
            cleanup()?;
        }
        Ok(())
    }
}

impl<P: 'static, R: 'static> ComponentTrait for ComponentInner<P, R> {
    fn id(&self) -> Id {
        self.id
    }

    fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    fn rerender(&self) -> anyhow::Result<()> {
        if !self.mounted.get() {
            return Ok(());
        }
        self.render()
    }
}

/// A mounted component: a render function, its props and its hook slots.
///
/// The render function runs once on [`mount`](Component::mount), again on
/// [`set_props`](Component::set_props) and [`rerender`](Component::rerender),
/// and whenever a state setter queued it and the host called
/// [`Runtime::drain_pending_work`](crate::Runtime::drain_pending_work).
///
/// Dropping a Component does not run effect cleanups; call
/// [`unmount`](Component::unmount) for that. A mount whose render fails
/// is not mounted, and the hook slots it created are dropped before
/// [`mount`](Component::mount) returns.
///
/// # Example
///
/// ```rust
/// use bindhook_reactive::{Component, Runtime};
///
/// let counter = Component::mount((), |hooks, _| {
///     let (count, set_count) = hooks.use_state(|| 0);
///     if count == 0 {
///         set_count.set(1);
///     }
///     Ok(count)
/// })
/// .unwrap();
///
/// assert_eq!(counter.output(), Some(0));
/// Runtime::drain_pending_work().unwrap();
/// assert_eq!(counter.output(), Some(1));
/// ```
pub struct Component<P: 'static, R: 'static> {
    inner: Rc<ComponentInner<P, R>>,
}

impl<P: 'static, R: 'static> Clone for Component<P, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: 'static, R: 'static> fmt::Debug for Component<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Component");
        s.field("id", &self.inner.id);
        s.field("renders", &self.inner.renders.get());
        s.field("mounted", &self.inner.mounted.get());
        s.finish()
    }
}

impl<P: 'static, R: 'static> Component<P, R> {
    /// Render the component for the first time and commit its effects.
    pub fn mount(
        props: P,
        render: impl Fn(&Hooks, &P) -> anyhow::Result<R> + 'static,
    ) -> anyhow::Result<Self> {
        let inner = Rc::new_cyclic(|this| ComponentInner {
            id: Id::next(),
            this: this.clone(),
            render: Box::new(render),
            props: RefCell::new(props),
            slots: Rc::new(RefCell::new(Vec::new())),
            output: RefCell::new(None),
            renders: Cell::new(0),
            mounted: Cell::new(true),
        });
        debug!(component = ?inner.id, "mount");
        if let Err(err) = inner.render() {
            inner.mounted.set(false);
            // No effect was committed, so no cleanup will ever run. Drop
            // what the partial render put in its slots right away instead
            // of whenever the last queued handle goes.
            let slots = inner.slots.take();
            drop(slots);
            return Err(err);
        }
        Ok(Self { inner })
    }

    pub fn id(&self) -> Id {
        self.inner.id
    }

    /// Replace the props and render again.
    pub fn set_props(&self, props: P) -> anyhow::Result<()> {
        *self.inner.props.borrow_mut() = props;
        self.inner.rerender()
    }

    /// Render again with the current props.
    pub fn rerender(&self) -> anyhow::Result<()> {
        self.inner.rerender()
    }

    /// The output of the latest successful render.
    pub fn output(&self) -> Option<R>
    where
        R: Clone,
    {
        self.inner.output.borrow().clone()
    }

    pub fn with_output<O>(&self, f: impl FnOnce(Option<&R>) -> O) -> O {
        f(self.inner.output.borrow().as_ref())
    }

    /// Number of completed renders, including the mount render.
    pub fn render_count(&self) -> usize {
        self.inner.renders.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    /// Run every pending effect cleanup, in hook order. Later renders and
    /// state setters become no-ops. Unmounting twice does nothing.
    pub fn unmount(&self) -> anyhow::Result<()> {
        self.inner.unmount()
    }
}
