//! Background recalculation with a single-flight policy.
//!
//! Every request gets a new generation number and replaces any request still
//! waiting, so a superseded project is never computed. One worker thread
//! drains the pending slot; at most one calculation runs at a time. A
//! calculation that was superseded while running is thrown away when it
//! finishes and the worker moves on to the newest request.

use crate::error::CamToolResult;
use crate::project::{recalculate, Project, RecalcResult};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// A published calculation.
#[derive(Debug)]
pub struct Completed {
    pub generation: u64,
    pub outcome: CamToolResult<RecalcResult>,
}

#[derive(Default)]
struct Slot {
    pending: Option<(u64, Project)>,
    latest: Option<Arc<Completed>>,
    /// Calculations currently inside `recalculate`, never more than one.
    running: usize,
    worker_alive: bool,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    finished: Condvar,
}

/// Runs [`recalculate`] on a background thread.
#[derive(Clone, Default)]
pub struct Recalculator {
    generation: Arc<AtomicU64>,
    shared: Arc<Shared>,
}

impl Recalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a calculation of `project` and returns its generation.
    ///
    /// A request still waiting is dropped. A calculation already running is
    /// superseded and its result will not be published.
    pub fn submit(&self, project: Project) -> CamToolResult<u64> {
        let mut slot = self.shared.slot.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((stale, _)) = slot.pending.replace((generation, project)) {
            debug!("Recalculation {} superseded before start", stale);
        }
        if slot.worker_alive {
            return Ok(generation);
        }

        let current = self.generation.clone();
        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name("viamill-recalc".to_string())
            .spawn(move || run_worker(&current, &shared));
        match spawned {
            Ok(_) => {
                slot.worker_alive = true;
                Ok(generation)
            }
            Err(e) => {
                slot.pending = None;
                Err(e.into())
            }
        }
    }

    /// Generation of the newest request, 0 before the first one.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// The newest published result, if any.
    pub fn latest(&self) -> Option<Arc<Completed>> {
        self.shared.slot.lock().latest.clone()
    }

    /// True while a request is waiting or being calculated.
    pub fn is_busy(&self) -> bool {
        self.shared.slot.lock().worker_alive
    }

    /// Blocks until the worker is idle and returns the newest result.
    pub fn wait_idle(&self) -> Option<Arc<Completed>> {
        let mut slot = self.shared.slot.lock();
        while slot.worker_alive {
            self.shared.finished.wait(&mut slot);
        }
        slot.latest.clone()
    }

    /// Like [`wait_idle`](Self::wait_idle) but gives up after `timeout`.
    ///
    /// Returns `None` when the worker is still busy.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> Option<Arc<Completed>> {
        let mut slot = self.shared.slot.lock();
        while slot.worker_alive {
            if self
                .shared
                .finished
                .wait_for(&mut slot, timeout)
                .timed_out()
            {
                return None;
            }
        }
        slot.latest.clone()
    }
}

fn run_worker(current: &AtomicU64, shared: &Shared) {
    loop {
        let (generation, project) = {
            let mut slot = shared.slot.lock();
            match slot.pending.take() {
                Some(request) => {
                    slot.running += 1;
                    request
                }
                None => {
                    slot.worker_alive = false;
                    shared.finished.notify_all();
                    return;
                }
            }
        };

        let outcome = recalculate(&project);

        let mut slot = shared.slot.lock();
        slot.running -= 1;
        if current.load(Ordering::SeqCst) == generation {
            if let Err(e) = &outcome {
                warn!("Recalculation {} failed: {}", generation, e);
            }
            slot.latest = Some(Arc::new(Completed {
                generation,
                outcome,
            }));
        } else {
            debug!("Recalculation {} superseded, result dropped", generation);
        }
        shared.finished.notify_all();
    }
}
