use std::{cell::RefCell, rc::Rc};

use smallvec::SmallVec;
use tracing::trace;

use crate::id::Id;

thread_local! {
    pub(crate) static RUNTIME: Runtime = Runtime::new();
}

/// What the render queue needs to know about a component, independent of
/// its props and output types.
pub(crate) trait ComponentTrait {
    fn id(&self) -> Id;
    fn is_mounted(&self) -> bool;
    fn rerender(&self) -> anyhow::Result<()>;
}

/// The thread-local queue of components waiting to re-render.
///
/// State setters never render synchronously. They queue their component
/// here and the host drains the queue with [`Runtime::drain_pending_work`],
/// the way a UI event loop renders once per tick.
pub struct Runtime {
    pending_renders: RefCell<SmallVec<[Rc<dyn ComponentTrait>; 10]>>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            pending_renders: RefCell::new(SmallVec::new()),
        }
    }

    pub(crate) fn schedule(component: Rc<dyn ComponentTrait>) {
        // Teardowns dropped along with the queue at thread exit may still
        // write to a store; there is nothing left to render by then.
        let _ = RUNTIME.try_with(|runtime| runtime.add_pending_render(component));
    }

    fn add_pending_render(&self, component: Rc<dyn ComponentTrait>) {
        let queued = self
            .pending_renders
            .borrow()
            .iter()
            .any(|c| c.id() == component.id());
        if !queued {
            trace!(component = ?component.id(), "schedule render");
            self.pending_renders.borrow_mut().push(component);
        }
    }

    /// Whether any component is waiting to re-render.
    pub fn has_pending_work() -> bool {
        RUNTIME.with(|runtime| !runtime.pending_renders.borrow().is_empty())
    }

    /// Re-render every queued component, including those queued while
    /// draining, until the queue is empty.
    ///
    /// The first render error stops draining and is returned.
    pub fn drain_pending_work() -> anyhow::Result<()> {
        loop {
            let pending = RUNTIME.with(|runtime| runtime.pending_renders.take());
            if pending.is_empty() {
                return Ok(());
            }
            trace!(count = pending.len(), "drain pending renders");
            for component in pending {
                if component.is_mounted() {
                    component.rerender()?;
                }
            }
        }
    }
}
