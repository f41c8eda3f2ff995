//! Fixtures shared by the Pledge benchmarks.

use pledge::StateMachine;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Machine type used by the benchmarks.
pub type BenchMachine = StateMachine<u64, String>;

/// Handler counts exercised by the fan-out benchmarks.
pub const HANDLER_COUNTS: [usize; 4] = [1, 8, 64, 512];

/// A running machine with `handlers` progress and completion observers that
/// all bump `hits`.
pub fn machine_with_handlers(handlers: usize, hits: &Arc<AtomicUsize>) -> BenchMachine {
    let machine = StateMachine::builder().build(|| {});
    for _ in 0..handlers {
        let progress_hits = hits.clone();
        machine.add_progress_handler(move |_, _| {
            progress_hits.fetch_add(1, Ordering::Relaxed);
        });
        let completion_hits = hits.clone();
        machine.add_completion_handler(move || {
            completion_hits.fetch_add(1, Ordering::Relaxed);
        });
    }
    machine
}
