#![allow(missing_docs)]
#![cfg(feature = "loom")]

use loom::{
    model::Builder,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};
use mtjd::{config::ManagerConfig, manager::Manager};

#[derive(Debug, Clone)]
struct Shared {
    // Indexed by label: 0 = A, 1 = B, 2 = C.
    runs: Arc<Vec<AtomicUsize>>,
    order: Arc<Mutex<Vec<usize>>>,
}

impl Shared {
    fn new(capacity: usize) -> Self {
        Self {
            runs: Arc::new((0..capacity).map(|_| AtomicUsize::new(0)).collect()),
            order: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
        }
    }

    fn body(&self, idx: usize) -> impl FnOnce() + Send + use<> {
        let shared = self.clone();
        move || {
            shared.runs[idx].fetch_add(1, Ordering::Relaxed);
            shared.order.lock().unwrap().push(idx);
        }
    }

    fn runs(&self, idx: usize) -> usize {
        self.runs[idx].load(Ordering::Relaxed)
    }
}

fn model(f: impl Fn() + Sync + Send + 'static) {
    let mut builder = Builder::new();
    builder.preemption_bound = Some(2);
    builder.check(f);
}

#[test]
fn loom_join_runs_once_after_both_parents() {
    model(|| {
        // Graph:
        //   A   B
        //    \ /
        //     C
        let shared = Shared::new(3);
        let manager = Manager::start(ManagerConfig::default().worker_count(2)).unwrap();

        let a = manager.job(shared.body(0));
        let b = manager.job(shared.body(1));
        let c = manager.build_job().sync_signal(true).build(shared.body(2));
        c.depends_on(&a);
        c.depends_on(&b);

        let c = c.release();
        b.detach();
        a.detach();
        c.wait();

        assert!(c.is_executed());
        {
            let order = shared.order.lock().unwrap();
            assert_eq!(order.len(), 3);
            assert_eq!(order[2], 2);
        }
        // Each job must execute exactly once.
        assert_eq!(shared.runs(0), 1);
        assert_eq!(shared.runs(1), 1);
        assert_eq!(shared.runs(2), 1);

        manager.stop().unwrap();
    });
}

#[test]
fn loom_racing_releases_schedule_successor_once() {
    model(|| {
        // A and B are released from two threads; C must become ready exactly
        // once, on whichever thread drops the last hold.
        let shared = Shared::new(3);
        let manager = Manager::start(ManagerConfig::inline()).unwrap();

        let a = manager.job(shared.body(0));
        let b = manager.job(shared.body(1));
        let c = manager.job(shared.body(2));
        c.depends_on(&a);
        c.depends_on(&b);
        let c = c.release();

        let releaser = thread::spawn(move || a.detach());
        b.detach();
        releaser.join().unwrap();

        assert!(c.is_executed());
        assert_eq!(shared.runs(0), 1);
        assert_eq!(shared.runs(1), 1);
        assert_eq!(shared.runs(2), 1);
        assert_eq!(shared.order.lock().unwrap()[2], 2);

        manager.stop().unwrap();
    });
}

#[test]
fn loom_stop_drains_dependents_made_ready_by_workers() {
    model(|| {
        // A -> B; stop is requested while A may still be running, B must
        // still run before stop returns.
        let shared = Shared::new(2);
        let manager = Manager::start(ManagerConfig::default().worker_count(1)).unwrap();

        let a = manager.job(shared.body(0));
        let b = manager.job(shared.body(1));
        b.depends_on(&a);
        let b = b.release();
        a.detach();

        manager.stop().unwrap();
        assert!(b.is_executed());
        assert_eq!(shared.runs(0), 1);
        assert_eq!(shared.runs(1), 1);
    });
}
