//! Process-wide table of live engine processes.
//!
//! Every pipeline registers its child here while it runs. The interrupt handler (Ctrl-C /
//! SIGTERM) and [`teardown_all`] walk the table, cancel each owner's token and kill each child,
//! so no engine process outlives the program even when the normal close path never runs.

use std::collections::HashMap;
use std::process::Child;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once, OnceLock, PoisonError};

use tracing::{debug, warn};

use crate::process::cancel::CancelToken;

pub(crate) type SharedChild = Arc<Mutex<Child>>;

struct Entry {
    child: SharedChild,
    cancel: CancelToken,
}

static TABLE: OnceLock<Mutex<HashMap<u64, Entry>>> = OnceLock::new();
static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static SIGNAL_HANDLER: Once = Once::new();
static SIGNAL_TEARDOWN_DISABLED: AtomicBool = AtomicBool::new(false);

fn table() -> &'static Mutex<HashMap<u64, Entry>> {
    TABLE.get_or_init(|| Mutex::new(HashMap::new()))
}

pub(crate) fn register(child: SharedChild, cancel: CancelToken) -> u64 {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    table()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id, Entry { child, cancel });
    id
}

pub(crate) fn deregister(id: u64) {
    table()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id);
}

/// Number of engine processes currently registered.
pub fn live_processes() -> usize {
    table()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .len()
}

#[cfg(test)]
pub(crate) fn live_ids() -> Vec<u64> {
    table()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .copied()
        .collect()
}

/// Cancel and kill every registered engine process. Returns how many were killed.
///
/// Entries stay registered; their owners deregister when they are closed or dropped.
pub fn teardown_all() -> usize {
    let entries: Vec<(SharedChild, CancelToken)> = table()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .values()
        .map(|e| (Arc::clone(&e.child), e.cancel.clone()))
        .collect();

    let mut killed = 0;
    for (child, cancel) in entries {
        cancel.cancel();
        let mut child = child.lock().unwrap_or_else(PoisonError::into_inner);
        if child.kill().is_ok() {
            killed += 1;
        }
        let _ = child.try_wait();
    }
    killed
}

/// Opt out of the interrupt handler that is otherwise installed on the first pipeline open.
///
/// Must be called before any pipeline is opened. Callers that opt out are responsible for
/// driving [`CancelToken`]s or calling [`teardown_all`] themselves.
pub fn disable_signal_teardown() {
    SIGNAL_TEARDOWN_DISABLED.store(true, Ordering::SeqCst);
}

pub(crate) fn ensure_signal_teardown() {
    if SIGNAL_TEARDOWN_DISABLED.load(Ordering::SeqCst) {
        return;
    }
    SIGNAL_HANDLER.call_once(|| {
        let installed = ctrlc::set_handler(|| {
            let killed = teardown_all();
            warn!(killed, "interrupted, engine processes killed; exiting");
            std::process::exit(1);
        });
        match installed {
            Ok(()) => debug!("interrupt teardown handler installed"),
            Err(err) => warn!("failed to install interrupt handler: {err}"),
        }
    });
}
