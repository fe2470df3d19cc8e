//! Thread-local microtask queue
//!
//! Deferred work (such as [`Watchable`](crate::watchable::Watchable) flushes)
//! is posted here and runs at the next [`checkpoint`]. The host calls
//! `checkpoint` once the current synchronous turn is complete, e.g. at the end
//! of every game tick.
//!
//! Jobs queued while a checkpoint is draining run in the same checkpoint,
//! after everything that was already queued.

use std::cell::RefCell;
use std::collections::VecDeque;

type Microtask = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Microtask>> = RefCell::new(VecDeque::new());
}

/// Post a job to run at the next checkpoint
pub fn queue_microtask(job: impl FnOnce() + 'static) {
    QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(job)));
}

/// Run queued jobs until the queue is empty. Returns how many jobs ran.
pub fn checkpoint() -> usize {
    let mut ran = 0;
    // The borrow is released before each job so jobs can queue more work
    while let Some(job) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
        job();
        ran += 1;
    }
    if ran > 0 {
        tracing::trace!(ran, "microtask checkpoint");
    }
    ran
}

/// Number of jobs waiting for the next checkpoint
pub fn pending() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_jobs_run_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let log = log.clone();
            queue_microtask(move || log.borrow_mut().push(n));
        }

        assert_eq!(pending(), 3);
        assert!(log.borrow().is_empty());

        assert_eq!(checkpoint(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(pending(), 0);
    }

    #[test]
    fn test_nested_jobs_drain_in_same_checkpoint() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let outer = log.clone();
        queue_microtask(move || {
            outer.borrow_mut().push("outer");
            let inner = outer.clone();
            queue_microtask(move || inner.borrow_mut().push("inner"));
        });
        let tail = log.clone();
        queue_microtask(move || tail.borrow_mut().push("tail"));

        assert_eq!(checkpoint(), 3);
        assert_eq!(*log.borrow(), vec!["outer", "tail", "inner"]);
    }

    #[test]
    fn test_empty_checkpoint() {
        assert_eq!(checkpoint(), 0);
    }
}
