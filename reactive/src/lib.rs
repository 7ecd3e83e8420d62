//! # bindhook_reactive
//!
//! A minimal host runtime for hooks. A [`Component`] owns a render function
//! and a list of hook slots; the render function receives a [`Hooks`]
//! context and calls its hooks in a fixed order:
//!
//! - [`Hooks::use_state`]: a value plus a [`StateSetter`] that queues a re-render
//! - [`Hooks::use_ref`]: a mutable box that persists without re-rendering
//! - [`Hooks::use_effect`]: work that runs after the render commits, gated by
//!   deps, with a [`Cleanup`] that runs before the next run or on unmount
//!
//! Queued re-renders are processed by [`Runtime::drain_pending_work`].
//! Everything is single-threaded and lives in a thread-local runtime.

mod component;
mod hooks;
mod id;
mod runtime;

pub use component::Component;
pub use hooks::{Cleanup, Hooks, StateSetter};
pub use id::Id;
pub use runtime::Runtime;
