/*
 * Ordered, detachable notification channels used in both directions: models
 * publish their change notifications through them, and the tree view
 * publishes UI events (expanded, current item, activation, checked) to
 * observers.
 *
 * An `Event` is a sequence of handler slots. Detaching leaves a hole in its
 * slot so handles that were already issued stay valid; the next attach fills
 * the first hole before the sequence grows. Publishing runs every live
 * handler in slot order, synchronously, on the calling thread.
 *
 * Handlers may attach, detach and publish re-entrantly. No `RefCell` borrow is
 * held while a handler runs.
 */

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Handler<T> = Rc<dyn Fn(&T)>;

/// Identifies an attached handler within one `Event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(usize);

impl EventHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

struct Slot<T> {
    handler: Option<Handler<T>>,
    once: bool,
}

pub struct Event<T> {
    slots: RefCell<Vec<Slot<T>>>,
}

impl<T> Event<T> {
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
        }
    }

    /// Attaches a handler that runs on every publish until detached.
    pub fn attach<F>(&self, handler: F) -> EventHandle
    where
        F: Fn(&T) + 'static,
    {
        self.attach_slot(Rc::new(handler), false)
    }

    /// Attaches a handler that is detached right after its first invocation.
    pub fn once<F>(&self, handler: F) -> EventHandle
    where
        F: Fn(&T) + 'static,
    {
        self.attach_slot(Rc::new(handler), true)
    }

    /*
     * Detaching an unknown or already vacated handle is a no-op, so callers
     * may detach unconditionally on teardown.
     */
    pub fn detach(&self, handle: EventHandle) {
        if let Some(slot) = self.slots.borrow_mut().get_mut(handle.0) {
            slot.handler = None;
            slot.once = false;
        }
    }

    pub fn handler_count(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|slot| slot.handler.is_some())
            .count()
    }

    fn attach_slot(&self, handler: Handler<T>, once: bool) -> EventHandle {
        let mut slots = self.slots.borrow_mut();
        let slot = Slot {
            handler: Some(handler),
            once,
        };
        if let Some(index) = slots.iter().position(|s| s.handler.is_none()) {
            slots[index] = slot;
            return EventHandle(index);
        }
        slots.push(slot);
        EventHandle(slots.len() - 1)
    }

    fn live_handler_at(&self, index: usize) -> Option<(Handler<T>, bool)> {
        let slots = self.slots.borrow();
        let slot = slots.get(index)?;
        slot.handler.as_ref().map(|h| (Rc::clone(h), slot.once))
    }

    // A once-handler may have detached itself and had its slot reused while
    // it ran; only vacate the slot if it still holds the same handler.
    fn detach_if_same(&self, index: usize, handler: &Handler<T>) {
        let mut slots = self.slots.borrow_mut();
        let Some(slot) = slots.get_mut(index) else {
            return;
        };
        if slot.handler.as_ref().is_some_and(|h| Rc::ptr_eq(h, handler)) {
            slot.handler = None;
            slot.once = false;
        }
    }
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("slots", &self.slots.borrow().len())
            .field("live_handlers", &self.handler_count())
            .finish()
    }
}

/// Owning side of an `Event`: observers get `event()`, the owner publishes.
pub struct EventPublisher<T> {
    event: Event<T>,
}

impl<T> EventPublisher<T> {
    pub fn new() -> Self {
        Self {
            event: Event::new(),
        }
    }

    pub fn event(&self) -> &Event<T> {
        &self.event
    }

    /*
     * Invokes every live handler in slot order. The pass covers the slots that
     * existed when it started; handlers appended during the pass run from the
     * next publish on.
     */
    pub fn publish(&self, arg: &T) {
        let slot_count = self.event.slots.borrow().len();
        for index in 0..slot_count {
            let Some((handler, once)) = self.event.live_handler_at(index) else {
                continue;
            };
            handler(arg);
            if once {
                self.event.detach_if_same(index, &handler);
            }
        }
    }
}

impl<T> Default for EventPublisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventPublisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("event", &self.event)
            .finish()
    }
}
