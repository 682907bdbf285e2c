//! End-to-end scenarios for the task pool

use rust_task_pool::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

struct RangeSum {
    begin: u64,
    end: u64,
}

impl Task for RangeSum {
    fn run(&mut self) -> TypedBox {
        TypedBox::new((self.begin..=self.end).sum::<u64>())
    }

    fn task_type(&self) -> &str {
        "RangeSum"
    }
}

#[test]
fn test_sum_task_end_to_end() {
    init_logging();

    let pool = ThreadPool::new().expect("Failed to create pool");
    pool.start().expect("Failed to start pool");

    let future = pool.submit(RangeSum { begin: 1, end: 100 });
    assert!(future.is_valid());
    assert_eq!(future.get().cast::<u64>(), 5050);

    pool.stop();
}

#[test]
fn test_split_sum_across_workers() {
    init_logging();

    let pool = ThreadPool::with_workers(4).expect("Failed to create pool");
    pool.start().expect("Failed to start pool");

    let futures: Vec<_> = (0..10u64)
        .map(|chunk| {
            pool.submit(RangeSum {
                begin: chunk * 100_000 + 1,
                end: (chunk + 1) * 100_000,
            })
        })
        .collect();

    let total: u64 = futures
        .into_iter()
        .map(|f| f.wait().expect("Task should complete").cast::<u64>())
        .sum();
    assert_eq!(total, 1_000_000 * 1_000_001 / 2);

    pool.stop();
}

#[test]
fn test_elastic_pool_grows_then_shrinks() {
    init_logging();

    let pool = ThreadPool::new().expect("Failed to create pool");
    pool.set_mode(PoolMode::Elastic);
    pool.set_initial_workers(2);
    pool.set_max_workers(6);
    pool.set_idle_timeout(Duration::from_millis(300));
    pool.start().expect("Failed to start pool");
    assert_eq!(pool.current_workers(), 2);

    // Hold every worker until all six are busy.
    let barrier = Arc::new(Barrier::new(7));
    let futures: Vec<_> = (0..6)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            pool.execute(move || {
                barrier.wait();
                i
            })
        })
        .collect();

    barrier.wait();
    assert_eq!(pool.current_workers(), 6);
    for future in futures {
        future.get();
    }

    // Idle workers re-check once per poll interval (1s by default).
    assert!(eventually(Duration::from_secs(10), || {
        pool.current_workers() == 2
    }));
    assert_eq!(pool.stats().workers_reclaimed, 4);

    pool.stop();
}

#[test]
fn test_elastic_pool_respects_ceiling_under_burst() {
    init_logging();

    let config = PoolConfig::new(2)
        .with_mode(PoolMode::Elastic)
        .with_max_workers(6)
        .with_max_queue_size(256);
    let pool = ThreadPool::with_config(config).expect("Failed to create pool");
    pool.start().expect("Failed to start pool");

    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));

    let futures: Vec<_> = (0..100)
        .map(|_| {
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            pool.execute(move || {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(2));
                in_flight.fetch_sub(1, Ordering::SeqCst);
            })
        })
        .collect();

    for future in futures {
        future.wait().expect("Task should complete");
    }

    assert!(max_in_flight.load(Ordering::SeqCst) <= 6);
    assert!(pool.stats().peak_workers <= 6);
    assert!(pool.current_workers() >= 2);

    pool.stop();
}

#[test]
fn test_full_queue_rejects_within_timeout() {
    init_logging();

    let pool = ThreadPool::with_workers(1).expect("Failed to create pool");
    pool.set_max_queue_size(1);
    pool.set_submit_timeout(Duration::from_millis(200));
    pool.start().expect("Failed to start pool");

    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let slow = pool.execute(move || {
        started_tx.send(()).expect("test receiver dropped");
        let _ = release_rx.recv();
        "slow"
    });
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("slow task should start");

    let first = pool.execute(|| "first");
    assert!(first.is_valid());

    let start = Instant::now();
    let second = pool.execute(|| "second");
    let elapsed = start.elapsed();

    assert!(!second.is_valid());
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(200) + Duration::from_secs(1));
    assert!(second.rejection().is_some_and(PoolError::is_rejection));
    assert!(second.get().is_empty());

    release_tx.send(()).expect("slow task dropped its receiver");
    assert_eq!(slow.get().cast::<&str>(), "slow");
    assert_eq!(first.get().cast::<&str>(), "first");

    let stats = pool.stats();
    assert_eq!(stats.tasks_rejected, 1);
    assert!(stats.rejection_rate() > 0.0);

    pool.stop();
}

#[test]
fn test_stop_returns_with_queued_and_running_tasks() {
    init_logging();

    let pool = ThreadPool::with_workers(2).expect("Failed to create pool");
    pool.start().expect("Failed to start pool");

    let completed = Arc::new(AtomicUsize::new(0));
    let futures: Vec<_> = (0..20)
        .map(|_| {
            let completed = Arc::clone(&completed);
            pool.execute(move || {
                thread::sleep(Duration::from_millis(25));
                completed.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(10));
    let start = Instant::now();
    pool.stop();
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(pool.current_workers(), 0);

    let mut finished = 0;
    let mut abandoned = 0;
    for future in futures {
        match future.wait() {
            Ok(_) => finished += 1,
            Err(PoolError::TaskAbandoned { .. }) => abandoned += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(finished + abandoned, 20);
    assert_eq!(finished, completed.load(Ordering::SeqCst));
    assert!(abandoned > 0);
    assert_eq!(pool.stats().tasks_abandoned, abandoned as u64);
}

#[test]
fn test_panic_surfaces_as_failed_future() {
    init_logging();

    let pool = ThreadPool::with_workers(2).expect("Failed to create pool");
    pool.start().expect("Failed to start pool");

    let future = pool.execute(|| -> i32 {
        let values: Vec<i32> = Vec::new();
        values[3]
    });

    let err = future.wait().expect_err("Task should have panicked");
    assert!(matches!(err, PoolError::TaskPanicked { .. }));
    assert!(err.to_string().contains("index out of bounds"));

    assert_eq!(pool.execute(|| 1).get().cast::<i32>(), 1);
    pool.stop();
}

#[test]
fn test_dropping_future_does_not_disturb_pool() {
    init_logging();

    let pool = ThreadPool::with_workers(2).expect("Failed to create pool");
    pool.start().expect("Failed to start pool");

    for i in 0..50 {
        drop(pool.execute(move || vec![i; 64]));
    }
    assert!(eventually(Duration::from_secs(5), || {
        pool.stats().tasks_completed == 50
    }));

    assert_eq!(pool.execute(|| "still working").get().cast::<&str>(), "still working");
    pool.stop();
}

#[test]
fn test_config_from_json() {
    init_logging();

    let json = r#"{
        "mode": "elastic",
        "initial_workers": 2,
        "max_workers": 4,
        "max_queue_size": 32,
        "thread_name_prefix": "json-worker"
    }"#;

    let config: PoolConfig = serde_json::from_str(json).expect("Failed to parse config");
    assert_eq!(config.mode, PoolMode::Elastic);
    assert_eq!(config.max_workers, 4);
    assert_eq!(config.submit_timeout, Duration::from_secs(1));

    let pool = ThreadPool::with_config(config).expect("Failed to create pool");
    pool.start().expect("Failed to start pool");

    let name = pool
        .execute(|| thread::current().name().map(str::to_string))
        .get()
        .cast::<Option<String>>();
    assert!(name.is_some_and(|n| n.starts_with("json-worker-")));

    pool.stop();
}

#[test]
fn test_stats_serialize_to_json() {
    init_logging();

    let pool = ThreadPool::with_workers(2).expect("Failed to create pool");
    pool.start().expect("Failed to start pool");
    pool.execute(|| ()).get();

    let stats = pool.stats();
    let value = serde_json::to_value(&stats).expect("Failed to serialize stats");
    assert_eq!(value["mode"], "fixed");
    assert_eq!(value["running"], true);
    assert_eq!(value["current_workers"], 2);
    assert_eq!(value["tasks_completed"], 1);
    assert!(value["started_at"].is_string());

    pool.stop();
}

#[test]
fn test_try_submit_reports_not_running() {
    init_logging();

    let pool = ThreadPool::with_workers(1).expect("Failed to create pool");
    let err = pool
        .try_submit(RangeSum { begin: 1, end: 10 })
        .expect_err("Pool is not running");
    assert!(matches!(err, PoolError::NotRunning { .. }));
    assert!(err.is_rejection());
}
