//! Grid events.
//!
//! Events fire synchronously at well-defined checkpoints. The `*Ending`
//! events are cancellable: a subscriber can call `EventArgs::cancel()` to
//! veto the operation. Handlers may themselves mutate the grid, so callers
//! re-validate identity after every emit.

use crate::slots::Slot;

/// Did an edit finish by committing or by cancelling?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Commit,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// About to enter edit mode (cancellable).
    BeginningEdit { slot: Slot, column_index: usize },
    /// A cell edit is about to finalize (cancellable).
    CellEditEnding { slot: Slot, column_index: usize, action: EditAction },
    /// A cell edit finalized.
    CellEditEnded { slot: Slot, column_index: usize, action: EditAction },
    /// A row edit is about to finalize (cancellable).
    RowEditEnding { slot: Slot, action: EditAction },
    /// A row edit finalized.
    RowEditEnded { slot: Slot, action: EditAction },
    CurrentCellChanged { slot: Slot, column_index: Option<usize> },
    SlotsInserted { slot: usize, count: usize },
    SlotsRemoved { slot: usize, count: usize },
    GroupCollapsed { slot: usize },
    GroupExpanded { slot: usize },
    /// The whole row set was rebuilt (collection Reset, descriptor change).
    RowsReset,
}

/// Mutable per-emit state handed to subscribers.
#[derive(Debug, Default)]
pub struct EventArgs {
    cancelled: bool,
}

impl EventArgs {
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

type Subscriber = Box<dyn FnMut(&GridEvent, &mut EventArgs)>;

/// Synchronous subscriber registry.
#[derive(Default)]
pub struct EventHub {
    subscribers: Vec<Subscriber>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&GridEvent, &mut EventArgs) + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    /// Emit to every subscriber. Returns false if any subscriber cancelled.
    /// Cancellation on a non-cancellable event is ignored by callers.
    pub fn emit(&mut self, event: GridEvent) -> bool {
        let mut args = EventArgs::default();
        for sub in &mut self.subscribers {
            sub(&event, &mut args);
        }
        !args.is_cancelled()
    }
}

/// Test helper, also usable by host-application tests.
pub mod test_support {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every event it sees. Clone the handle before subscribing.
    #[derive(Clone, Default)]
    pub struct EventCollector {
        seen: Rc<RefCell<Vec<GridEvent>>>,
    }

    impl EventCollector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn attach(&self, hub: &mut EventHub) {
            let seen = Rc::clone(&self.seen);
            hub.subscribe(move |event, _| seen.borrow_mut().push(event.clone()));
        }

        pub fn events(&self) -> Vec<GridEvent> {
            self.seen.borrow().clone()
        }

        pub fn count_of(&self, predicate: impl Fn(&GridEvent) -> bool) -> usize {
            self.seen.borrow().iter().filter(|e| predicate(e)).count()
        }
    }
}
