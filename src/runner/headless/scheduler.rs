use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use tracing::{error, trace};

use super::watcher::Watcher;
use crate::runner::ds::error::JErrorType;
use crate::runner::types::TickFn;

/// A batch that keeps re-queuing watchers past this many rounds is treated
/// as an infinite update loop.
pub const MAX_UPDATE_ROUNDS: usize = 100;

/// Update batching. Watchers triggered during a turn are deduplicated and run
/// in creation order; `next_tick` callbacks run after them, FIFO.
#[derive(Default)]
pub(crate) struct Scheduler {
    queue: RefCell<Vec<Rc<Watcher>>>,
    queued: RefCell<HashSet<u64>>,
    ticks: RefCell<VecDeque<TickFn>>,
    flushing: Cell<bool>,
}

/// Clears the flushing flag when a flush ends, panics included.
struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_watcher(&self, watcher: Rc<Watcher>) {
        if self.queued.borrow_mut().insert(watcher.id()) {
            trace!(watcher = watcher.id(), "queued watcher");
            self.queue.borrow_mut().push(watcher);
        }
    }

    pub fn next_tick(&self, callback: TickFn) {
        self.ticks.borrow_mut().push_back(callback);
    }

    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty() && self.ticks.borrow().is_empty()
    }

    /// Drains both queues. Work queued while draining runs in a later round
    /// of the same flush. Re-entrant calls return immediately.
    pub fn flush(&self, on_error: &dyn Fn(&JErrorType, &str)) {
        if self.flushing.replace(true) {
            return;
        }
        let _guard = FlushGuard(&self.flushing);
        let mut rounds = 0;
        loop {
            let mut batch = std::mem::take(&mut *self.queue.borrow_mut());
            self.queued.borrow_mut().clear();
            let ticks = std::mem::take(&mut *self.ticks.borrow_mut());
            if batch.is_empty() && ticks.is_empty() {
                break;
            }
            rounds += 1;
            if rounds > MAX_UPDATE_ROUNDS {
                error!(
                    rounds = MAX_UPDATE_ROUNDS,
                    "you may have an infinite update loop; dropping pending updates"
                );
                self.queue.borrow_mut().clear();
                self.queued.borrow_mut().clear();
                self.ticks.borrow_mut().clear();
                break;
            }
            batch.sort_by_key(|w| w.id());
            trace!(round = rounds, watchers = batch.len(), ticks = ticks.len(), "flushing");
            for watcher in batch {
                watcher.run(on_error);
            }
            for tick in ticks {
                tick();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_run_fifo() {
        let scheduler = Scheduler::new();
        let log = Rc::new(RefCell::new(vec![]));
        for i in 0..3 {
            let l = log.clone();
            scheduler.next_tick(Box::new(move || l.borrow_mut().push(i)));
        }
        assert!(!scheduler.is_idle());
        scheduler.flush(&|_, _| {});
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_tick_queued_during_flush_runs_in_same_flush() {
        let scheduler = Rc::new(Scheduler::new());
        let log = Rc::new(RefCell::new(vec![]));
        let (s, l) = (scheduler.clone(), log.clone());
        scheduler.next_tick(Box::new(move || {
            l.borrow_mut().push("outer");
            let l2 = l.clone();
            s.next_tick(Box::new(move || l2.borrow_mut().push("inner")));
        }));
        scheduler.flush(&|_, _| {});
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_flush_recovers_after_panicking_tick() {
        let scheduler = Scheduler::new();
        scheduler.next_tick(Box::new(|| panic!("tick failed")));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scheduler.flush(&|_, _| {});
        }));
        assert!(result.is_err());

        let log = Rc::new(RefCell::new(vec![]));
        let l = log.clone();
        scheduler.next_tick(Box::new(move || l.borrow_mut().push("later")));
        scheduler.flush(&|_, _| {});
        assert_eq!(*log.borrow(), vec!["later"]);
        assert!(scheduler.is_idle());
    }
}
