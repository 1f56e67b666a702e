use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex,
    },
    time::Duration,
};

/// Upper bound on every blocking wait, so that loops notice termination.
pub(crate) const WAKE_INTERVAL: Duration = Duration::from_millis(50);

/// Process-wide stop flag, shared by the arbiter, the players and the host.
#[derive(Debug, Clone, Default)]
pub(crate) struct Termination(Arc<AtomicBool>);

impl Termination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every loop to stop. Idempotent.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A boolean a thread can wait on until it becomes true.
#[derive(Debug)]
pub(crate) struct Gate {
    open: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    pub fn new(open: bool) -> Self {
        Gate {
            open: Mutex::new(open),
            changed: Condvar::new(),
        }
    }

    pub fn open(&self) {
        *self.open.lock().expect("poisoned") = true;
        self.changed.notify_all();
    }

    pub fn close(&self) {
        *self.open.lock().expect("poisoned") = false;
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        *self.open.lock().expect("poisoned")
    }

    /// Wait up to `timeout` for the gate to be open. Returns whether it is.
    pub fn wait_open(&self, timeout: Duration) -> bool {
        let guard = self.open.lock().expect("poisoned");
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |open| !*open)
            .expect("poisoned");
        *guard
    }
}

#[cfg(test)]
mod signal_tests {
    use std::{thread, time::Instant};

    use super::*;

    #[test]
    fn termination_is_shared() {
        let termination = Termination::new();
        let clone = termination.clone();
        assert!(!clone.is_requested());
        termination.request();
        assert!(clone.is_requested());
    }

    #[test]
    fn closed_gate_times_out() {
        let gate = Gate::new(false);
        let start = Instant::now();
        assert!(!gate.wait_open(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn opening_wakes_waiter() {
        let gate = Arc::new(Gate::new(false));
        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || gate.wait_open(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(10));
        gate.open();
        assert!(waiter.join().unwrap());
        gate.close();
        assert!(!gate.is_open());
    }
}
