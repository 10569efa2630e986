//! Unit tests for the worker pool.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use rstest::{fixture, rstest};

use super::*;
use crate::protocol::{Protocol, ProtocolContext, ProtocolFailure};
use crate::registry::{ProtocolEntry, ProtocolRegistry};
use crate::tests::{
    EchoProtocol, FailingProtocol, Gate, GatedProtocol, PanickingProtocol, RecordingProtocol,
    wait_until,
};

fn entry(name: &str, protocol: Box<dyn Protocol>) -> Arc<ProtocolEntry> {
    let registry = ProtocolRegistry::new();
    registry
        .register(ProtocolContext::new(name, None, 1024), "", protocol)
        .expect("register");
    registry.lookup(name).expect("lookup")
}

#[fixture]
fn store() -> Arc<ResultStore> {
    Arc::new(ResultStore::new(9816))
}

fn ticketed(store: &ResultStore, entry: &Arc<ProtocolEntry>, input: &str) -> (Task, Ticket) {
    let ticket = store.allocate_ticket().expect("allocate");
    (Task::new(Arc::clone(entry), input, Some(ticket)), ticket)
}

#[test]
fn zero_sized_pool_is_rejected() {
    let error = WorkerPool::start(0, Arc::new(ResultStore::new(0))).expect_err("empty pool");
    assert!(matches!(error, DispatchError::Internal { .. }));
}

#[rstest]
fn ticketed_result_lands_in_store(store: Arc<ResultStore>) {
    let pool = WorkerPool::start(2, Arc::clone(&store)).expect("start pool");
    let echo = entry("echo", Box::new(EchoProtocol));
    let (task, ticket) = ticketed(&store, &echo, "payload");

    pool.submit(task).expect("submit");
    assert!(wait_until(|| store.ready().expect("ready") == 1));
    assert_eq!(store.read_single(ticket, 64).expect("read"), "payload");
}

#[rstest]
#[case::tasks_outnumber_workers(200, 4)]
#[case::single_worker(50, 1)]
#[case::workers_outnumber_tasks(3, 8)]
fn every_task_runs_exactly_once(
    store: Arc<ResultStore>,
    #[case] tasks: usize,
    #[case] workers: usize,
) {
    let recorder = RecordingProtocol::default();
    let pool = WorkerPool::start(workers, Arc::clone(&store)).expect("start pool");
    let recording = entry("recording", Box::new(recorder.clone()));

    let mut expected: Vec<String> = (0..tasks).map(|index| format!("task-{index}")).collect();
    for input in &expected {
        pool.submit(Task::new(Arc::clone(&recording), input.as_str(), None))
            .expect("submit");
    }
    let report = pool.shutdown(ShutdownPolicy::Drain).expect("shutdown");

    let mut seen = recorder.inputs();
    seen.sort();
    expected.sort();
    assert_eq!(seen, expected);
    assert_eq!(report.completed, tasks as u64);
    assert_eq!(report.cancelled, 0);
    assert_eq!(pool.submitted(), tasks as u64);
}

#[rstest]
fn failing_protocol_writes_tagged_error(store: Arc<ResultStore>) {
    let pool = WorkerPool::start(1, Arc::clone(&store)).expect("start pool");
    let failing = entry("failing", Box::new(FailingProtocol));
    let (task, ticket) = ticketed(&store, &failing, "bad");

    pool.submit(task).expect("submit");
    pool.shutdown(ShutdownPolicy::Drain).expect("shutdown");
    assert_eq!(
        store.read_single(ticket, 256).expect("read"),
        "ERROR:ProtocolExecutionError:protocol 'failing' failed: cannot handle 'bad'"
    );
}

#[rstest]
fn panicking_protocol_does_not_kill_worker(store: Arc<ResultStore>) {
    let pool = WorkerPool::start(1, Arc::clone(&store)).expect("start pool");
    let panicking = entry("panicky", Box::new(PanickingProtocol));
    let echo = entry("echo", Box::new(EchoProtocol));
    let (boom, boom_ticket) = ticketed(&store, &panicking, "x");
    let (after, after_ticket) = ticketed(&store, &echo, "still alive");

    pool.submit(boom).expect("submit panicking task");
    pool.submit(after).expect("submit follow-up task");
    let report = pool.shutdown(ShutdownPolicy::Drain).expect("shutdown");

    assert_eq!(report.completed, 2);
    let failure = store.read_single(boom_ticket, 256).expect("read failure");
    assert!(failure.starts_with("ERROR:ProtocolExecutionError:"));
    assert!(failure.contains("protocol exploded"));
    assert_eq!(
        store.read_single(after_ticket, 256).expect("read"),
        "still alive"
    );
}

#[rstest]
fn submit_after_shutdown_is_rejected(store: Arc<ResultStore>) {
    let pool = WorkerPool::start(1, store).expect("start pool");
    pool.shutdown(ShutdownPolicy::Drain).expect("shutdown");
    let echo = entry("echo", Box::new(EchoProtocol));
    assert_eq!(
        pool.submit(Task::new(echo, "late", None)),
        Err(DispatchError::PoolShuttingDown)
    );
    assert_eq!(pool.submitted(), 0);
}

#[rstest]
fn shutdown_is_idempotent(store: Arc<ResultStore>) {
    let pool = WorkerPool::start(2, Arc::clone(&store)).expect("start pool");
    let echo = entry("echo", Box::new(EchoProtocol));
    pool.submit(Task::new(echo, "one", None)).expect("submit");

    let first = pool.shutdown(ShutdownPolicy::Drain).expect("first shutdown");
    let second = pool.shutdown(ShutdownPolicy::Cancel).expect("second shutdown");
    assert_eq!(first, second);
    assert!(pool.is_closing());
}

#[rstest]
fn drain_runs_queued_tasks(store: Arc<ResultStore>) {
    let gate = Gate::new();
    let gated = GatedProtocol::new(gate.clone());
    let started = Arc::clone(&gated.started);
    let pool = WorkerPool::start(1, Arc::clone(&store)).expect("start pool");
    let gated = entry("gated", Box::new(gated));

    let tickets: Vec<Ticket> = (0..4)
        .map(|index| {
            let (task, ticket) = ticketed(&store, &gated, &index.to_string());
            pool.submit(task).expect("submit");
            ticket
        })
        .collect();
    assert!(wait_until(|| started.load(Ordering::SeqCst) == 1));
    assert_eq!(pool.queued(), 3);

    gate.open();
    let report = pool.shutdown(ShutdownPolicy::Drain).expect("shutdown");
    assert_eq!(report, ShutdownReport { completed: 4, cancelled: 0 });
    for ticket in tickets {
        assert_eq!(store.read_single(ticket, 64).expect("read"), "done");
    }
}

#[rstest]
fn cancel_reports_queued_tasks(store: Arc<ResultStore>) {
    let gate = Gate::new();
    let gated = GatedProtocol::new(gate.clone());
    let started = Arc::clone(&gated.started);
    let pool = Arc::new(WorkerPool::start(1, Arc::clone(&store)).expect("start pool"));
    let gated = entry("gated", Box::new(gated));

    let (running, running_ticket) = ticketed(&store, &gated, "first");
    pool.submit(running).expect("submit running task");
    assert!(wait_until(|| started.load(Ordering::SeqCst) == 1));

    let queued: Vec<Ticket> = (0..2)
        .map(|index| {
            let (task, ticket) = ticketed(&store, &gated, &index.to_string());
            pool.submit(task).expect("submit queued task");
            ticket
        })
        .collect();
    pool.submit(Task::new(Arc::clone(&gated), "oneway", None))
        .expect("submit oneway task");

    let stopping = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.shutdown(ShutdownPolicy::Cancel))
    };
    assert!(wait_until(|| pool.cancelled() == 3));
    gate.open();
    let report = stopping.join().expect("join").expect("shutdown");

    assert_eq!(report, ShutdownReport { completed: 1, cancelled: 3 });
    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.read_single(running_ticket, 64).expect("read running"),
        "done"
    );
    for ticket in queued {
        assert_eq!(
            store.read_single(ticket, 128).expect("read cancelled"),
            "ERROR:PoolShuttingDown:worker pool is shutting down"
        );
    }
}

#[rstest]
fn dropping_the_pool_drains_it(store: Arc<ResultStore>) {
    let echo = entry("echo", Box::new(EchoProtocol));
    let tickets: Vec<Ticket> = {
        let pool = WorkerPool::start(2, Arc::clone(&store)).expect("start pool");
        (0..10)
            .map(|index| {
                let (task, ticket) = ticketed(&store, &echo, &format!("drop-{index}"));
                pool.submit(task).expect("submit");
                ticket
            })
            .collect()
    };
    assert_eq!(store.pending().expect("pending"), 0);
    assert_eq!(store.ready().expect("ready"), tickets.len());
}

#[rstest]
fn workers_carry_pool_thread_names(store: Arc<ResultStore>) {
    struct ThreadName;
    impl Protocol for ThreadName {
        fn execute(&self, _input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
            Ok(thread::current().name().unwrap_or_default().to_owned())
        }
    }

    let pool = WorkerPool::start(1, Arc::clone(&store)).expect("start pool");
    let named = entry("named", Box::new(ThreadName));
    let (task, ticket) = ticketed(&store, &named, "");
    pool.submit(task).expect("submit");
    pool.shutdown(ShutdownPolicy::Drain).expect("shutdown");
    assert_eq!(
        store.read_single(ticket, 64).expect("read"),
        "extcall-worker-0"
    );
}
