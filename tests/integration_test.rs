mod common;

use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use weft_rs::prelude::*;

const CALLER: ContextKey<usize> = ContextKey::new("caller");

#[test]
fn test_concurrent_submitters_each_item_runs_once() {
    let pool = Arc::new(common::pool(5));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let pool = pool.clone();
            let seen = seen.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    let seen = seen.clone();
                    pool.submit(&Context::new(), move |_| {
                        seen.lock().push(p * 250 + i);
                    })
                    .unwrap();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    pool.shutdown();

    let mut seen = seen.lock().clone();
    seen.sort_unstable();
    assert_eq!(seen, (0..2000).collect::<Vec<_>>());
}

#[test]
fn test_single_worker_preserves_fifo_order() {
    let pool = common::pool(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let order = order.clone();
        pool.submit(&Context::new(), move |_| order.lock().push(i))
            .unwrap();
    }
    pool.shutdown();

    assert_eq!(*order.lock(), (0..100).collect::<Vec<_>>());
}

#[test]
fn test_context_follows_submission_to_worker() {
    let pool = common::pool(5);
    let submitter = thread::current().id();

    let tasks: Vec<Task> = (0..50)
        .map(|caller| {
            let cx = Context::new().with(CALLER, caller);
            Task::run(&pool, &cx, move |cx| {
                assert_ne!(thread::current().id(), submitter);
                match cx.get(&CALLER) {
                    Some(&seen) if seen == caller => Ok(()),
                    other => Err(format!("caller {} saw {:?}", caller, other).into()),
                }
            })
            .unwrap()
        })
        .collect();

    wait_all(&tasks).unwrap();
}

#[test]
fn test_unrelated_submission_sees_no_context() {
    let pool = common::pool(1);

    let tagged = Task::run(&pool, &Context::new().with(CALLER, 1), |cx| {
        assert_eq!(cx.get(&CALLER), Some(&1));
        Ok(())
    })
    .unwrap();
    let untagged = Task::run(&pool, &Context::new(), |cx| {
        assert!(cx.is_empty());
        Ok(())
    })
    .unwrap();

    tagged.wait().unwrap();
    untagged.wait().unwrap();
}

#[test]
fn test_hundred_random_sleeps_all_complete() {
    let pool = common::pool(5);
    let finished = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<Task> = (0..100)
        .map(|_| {
            let finished = finished.clone();
            let nap = Duration::from_millis(rand::thread_rng().gen_range(1..20));
            Task::run(&pool, &Context::new(), move |_| {
                thread::sleep(nap);
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap()
        })
        .collect();

    for task in &tasks {
        task.wait().unwrap();
    }

    assert_eq!(finished.load(Ordering::SeqCst), 100);
    assert!(tasks.iter().all(|t| t.state() == TaskState::Completed));
    assert_eq!(pool.metrics().tasks_faulted, 0);
}

#[test]
fn test_chained_continuation_runs_on_worker() {
    let pool = common::pool(5);
    let submitter = thread::current().id();
    let (tx, rx) = crossbeam_channel::bounded(1);

    let first = Task::run(&pool, &Context::new(), |_| {
        thread::sleep(Duration::from_millis(20));
        Ok(())
    })
    .unwrap();

    let second = first
        .continue_with(&Context::new(), move |antecedent, _| {
            let _ = tx.send((antecedent.outcome(), thread::current().id()));
            Ok(())
        })
        .unwrap();

    second.wait().unwrap();

    let (outcome, ran_on) = rx.recv().unwrap();
    assert!(matches!(outcome, Some(Ok(()))));
    assert_ne!(ran_on, submitter);
}

#[test]
fn test_continuation_observes_fault() {
    let pool = common::pool(2);

    let first = Task::run(&pool, &Context::new(), |_| Err("upstream failed".into())).unwrap();
    let second = first
        .continue_with(&Context::new(), |antecedent, _| match antecedent.outcome() {
            Some(Err(failure)) => Err(format!("because {}", failure).into()),
            _ => Ok(()),
        })
        .unwrap();

    assert_eq!(first.wait().unwrap_err().to_string(), "upstream failed");
    assert_eq!(
        second.wait().unwrap_err().to_string(),
        "because upstream failed"
    );
}

#[test]
fn test_each_continuation_runs_exactly_once() {
    let pool = common::pool(3);
    let runs = Arc::new(AtomicUsize::new(0));
    let gate = Task::pending(&pool);

    let mut chained = Vec::new();
    for _ in 0..10 {
        let runs = runs.clone();
        chained.push(
            gate.continue_with(&Context::new(), move |_, _| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap(),
        );
    }

    gate.set_result().unwrap();
    for _ in 0..10 {
        let runs = runs.clone();
        chained.push(
            gate.continue_with(&Context::new(), move |_, _| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap(),
        );
    }

    wait_all(&chained).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 20);
}

#[test]
fn test_racing_completions_only_one_wins() {
    let pool = common::pool(2);

    for _ in 0..50 {
        let task = Task::pending(&pool);
        let racers: Vec<_> = (0..4)
            .map(|i| {
                let task = task.clone();
                thread::spawn(move || {
                    if i % 2 == 0 {
                        task.set_result().is_ok()
                    } else {
                        task.set_exception(format!("racer {}", i)).is_ok()
                    }
                })
            })
            .collect();

        let winners = racers
            .into_iter()
            .map(|r| r.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(task.is_completed());

        let first = task.outcome().unwrap().map_err(|f| f.to_string());
        let again = task.wait().map_err(|f| f.to_string());
        assert_eq!(first, again);
    }
}

#[test]
fn test_raw_panic_is_counted_and_worker_survives() {
    let config = Config::builder()
        .num_threads(1)
        .panic_strategy(PanicStrategy::LogAndContinue)
        .build()
        .unwrap();
    let pool = WorkerPool::new(&config).unwrap();

    pool.submit(&Context::new(), |_| panic!("raw work failed"))
        .unwrap();
    let after = Task::run(&pool, &Context::new(), |_| Ok(())).unwrap();

    after.wait().unwrap();
    assert_eq!(pool.panic_count(), 1);
}

#[test]
fn test_shutdown_drains_queued_work() {
    let pool = common::pool(2);
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..20 {
        let done = done.clone();
        pool.submit(&Context::new(), move |_| {
            thread::sleep(Duration::from_millis(2));
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.shutdown();
    assert_eq!(done.load(Ordering::SeqCst), 20);
    assert_eq!(pool.pending(), 0);
    assert!(matches!(
        pool.submit(&Context::new(), |_| {}),
        Err(Error::ShutDown)
    ));
}
