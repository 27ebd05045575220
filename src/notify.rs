//! Change notifications.
//!
//! Each property carries three ordered handler lists: value changed, base
//! value changed and became dirty. Handlers are `Rc` closures and are
//! identified by their allocation, so registering the same `Rc` twice has no
//! effect and removal takes the `Rc` that was registered. Fan-out follows
//! registration order.

use crate::graph::PropertyKey;
use std::rc::Rc;

/// A change of a property's base or effective value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueChange {
    pub property: PropertyKey,
    pub old: f64,
    pub new: f64,
}

/// Handler for value and base-value changes.
pub type ChangeHandler = Rc<dyn Fn(&ValueChange)>;

/// Handler for clean → dirty transitions.
pub type DirtyHandler = Rc<dyn Fn(PropertyKey)>;

pub(crate) struct HandlerList<H: ?Sized> {
    handlers: Vec<Rc<H>>,
}

impl<H: ?Sized> HandlerList<H> {
    pub(crate) fn add(&mut self, handler: Rc<H>) -> bool {
        if self.handlers.iter().any(|existing| same_handler(existing, &handler)) {
            return false;
        }
        self.handlers.push(handler);
        true
    }

    pub(crate) fn remove(&mut self, handler: &Rc<H>) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|existing| !same_handler(existing, handler));
        self.handlers.len() != before
    }

    /// Cheap copy of the current handlers, so a fan-out is not affected by
    /// the list it iterates.
    pub(crate) fn snapshot(&self) -> Vec<Rc<H>> {
        self.handlers.clone()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }
}

impl<H: ?Sized> Default for HandlerList<H> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

// Compare data pointers only; vtable pointers for the same closure may differ
// across codegen units.
fn same_handler<H: ?Sized>(a: &Rc<H>, b: &Rc<H>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

#[derive(Default)]
pub(crate) struct Listeners {
    pub(crate) value_changed: HandlerList<dyn Fn(&ValueChange)>,
    pub(crate) base_changed: HandlerList<dyn Fn(&ValueChange)>,
    pub(crate) dirty: HandlerList<dyn Fn(PropertyKey)>,
}
