use coldflow::time::sleep;
use coldflow::{
    EventKind, Flow, FlowError, FlowEvent, IO, JoinError, Outcome, RunOutcome, Runtime, collect,
    flow,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

/// An endless flow counting its completed emissions.
fn endless(produced: Arc<AtomicUsize>) -> Flow<usize> {
    flow(move |mut out| {
        let produced = produced.clone();
        async move {
            let mut i = 0;
            loop {
                sleep(Duration::from_millis(5)).await;
                out.emit(i).await?;
                produced.fetch_add(1, Ordering::SeqCst);
                i += 1;
            }
        }
    })
}

#[test]
fn test_cancel_after_k_invocations() {
    const K: usize = 3;

    let rt = Runtime::new().unwrap();
    let main = rt.main().clone();

    let produced = Arc::new(AtomicUsize::new(0));
    let invocations = Arc::new(AtomicUsize::new(0));
    let (reached, wait_reached) = mpsc::channel();

    let counter = invocations.clone();
    let run = endless(produced.clone()).launch(&main, move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) + 1 == K {
            let _ = reached.send(());
        }
        async {
            sleep(Duration::from_millis(40)).await;
            Ok(())
        }
    });

    wait_reached.recv_timeout(Duration::from_secs(5)).unwrap();
    run.cancel();
    assert!(run.is_cancelled());

    assert_eq!(run.wait().unwrap(), RunOutcome::Cancelled);

    let stopped_at = produced.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(60));

    assert_eq!(invocations.load(Ordering::SeqCst), K);
    assert_eq!(produced.load(Ordering::SeqCst), stopped_at);
}

#[test]
fn test_cancel_stops_producer_on_another_context() {
    let rt = Runtime::new().unwrap();
    let main = rt.main().clone();
    let io = rt.context(IO).unwrap().clone();

    let produced = Arc::new(AtomicUsize::new(0));
    let (first, wait_first) = mpsc::channel();

    let run = endless(produced.clone())
        .buffer(4)
        .on(&io)
        .launch(&main, move |_| {
            let _ = first.send(());
            async { Ok(()) }
        });

    wait_first.recv_timeout(Duration::from_secs(5)).unwrap();
    run.cancel();
    assert_eq!(run.wait().unwrap(), RunOutcome::Cancelled);

    // Let an in-flight producer poll observe the cancellation.
    thread::sleep(Duration::from_millis(20));
    let stopped_at = produced.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(60));

    assert_eq!(produced.load(Ordering::SeqCst), stopped_at);
}

#[test]
fn test_cancelled_run_reports_its_outcome() {
    let events = Arc::new(Mutex::new(Vec::<FlowEvent>::new()));
    let sink = events.clone();

    let rt = Runtime::builder()
        .observer(move |event| sink.lock().unwrap().push(event.clone()))
        .build()
        .unwrap();
    let main = rt.main().clone();

    let (first, wait_first) = mpsc::channel();
    let run = endless(Arc::new(AtomicUsize::new(0))).launch(&main, move |_| {
        let _ = first.send(());
        async { Ok(()) }
    });

    wait_first.recv_timeout(Duration::from_secs(5)).unwrap();
    run.cancel();
    run.cancel();
    assert_eq!(run.wait().unwrap(), RunOutcome::Cancelled);

    let finished: Vec<_> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::Finished { outcome } => Some(outcome),
            _ => None,
        })
        .collect();

    assert_eq!(finished, vec![Outcome::Cancelled]);
}

#[test]
fn test_concurrent_runs_are_independent() {
    let rt = Runtime::new().unwrap();
    let main = rt.main().clone();

    let numbers = flow(|mut out| async move {
        for i in 0..5 {
            sleep(Duration::from_millis(5)).await;
            out.emit(i).await?;
        }
        Ok(())
    });

    let first_values = Arc::new(Mutex::new(Vec::new()));
    let second_values = Arc::new(Mutex::new(Vec::new()));

    let sink = first_values.clone();
    let first = numbers.launch(&main, move |v| {
        sink.lock().unwrap().push(v);
        async { Ok(()) }
    });

    let sink = second_values.clone();
    let second = numbers.launch(&main, move |v| {
        sink.lock().unwrap().push(v);
        async { Ok(()) }
    });

    assert_ne!(first.id(), second.id());
    second.cancel();

    assert_eq!(first.wait().unwrap(), RunOutcome::Completed);
    assert_eq!(second.wait().unwrap(), RunOutcome::Cancelled);
    assert_eq!(*first_values.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_failure_in_one_run_does_not_affect_another() {
    let rt = Runtime::new().unwrap();
    let main = rt.main().clone();

    let numbers = flow(|mut out| async move {
        for i in 0..3 {
            sleep(Duration::from_millis(5)).await;
            out.emit(i).await?;
        }
        Ok(())
    });

    let failing = numbers.launch(&main, |v| async move {
        if v == 1 {
            return Err(FlowError::consumer("first consumer gave up"));
        }
        Ok(())
    });
    let healthy = numbers.launch(&main, |_| async { Ok(()) });

    assert!(failing.wait().unwrap_err().is_consumer());
    assert_eq!(healthy.wait().unwrap(), RunOutcome::Completed);
}

#[test]
fn test_dropping_the_handle_does_not_cancel() {
    let rt = Runtime::new().unwrap();
    let main = rt.main().clone();

    let numbers = flow(|mut out| async move {
        for i in 0..3 {
            sleep(Duration::from_millis(5)).await;
            out.emit(i).await?;
        }
        Ok(())
    });

    let (done, wait_done) = mpsc::channel();
    drop(numbers.launch(&main, move |v| {
        if v == 2 {
            let _ = done.send(());
        }
        async { Ok(()) }
    }));

    wait_done.recv_timeout(Duration::from_secs(5)).unwrap();
}

#[test]
fn test_cancel_after_completion_keeps_the_outcome() {
    let rt = Runtime::new().unwrap();
    let main = rt.main().clone();

    let run = coldflow::flow_of([1, 2, 3]).launch(&main, |_| async { Ok(()) });

    while !run.is_finished() {
        thread::sleep(Duration::from_millis(1));
    }
    run.cancel();

    assert_eq!(run.wait().unwrap(), RunOutcome::Completed);
}

#[test]
fn test_free_collect_launches_a_cancellable_run() {
    let rt = Runtime::new().unwrap();
    let main = rt.main().clone();

    let produced = Arc::new(AtomicUsize::new(0));
    let (first, wait_first) = mpsc::channel();

    let run = collect(&endless(produced), &main, move |_| {
        let _ = first.send(());
        async { Ok(()) }
    });

    wait_first.recv_timeout(Duration::from_secs(5)).unwrap();
    run.cancel();

    assert!(run.is_cancelled());
    assert_eq!(run.wait().unwrap(), RunOutcome::Cancelled);
}

/// A flow emitting one value, then panicking.
fn exploding() -> Flow<u32> {
    flow(|mut out| async move {
        out.emit(1u32).await?;
        panic!("sensor exploded")
    })
}

/// Launches `flow` on `main` and returns its error and the run's events.
fn run_to_failure(build: impl FnOnce(&Runtime) -> Flow<u32>) -> (FlowError, Vec<EventKind>) {
    let events = Arc::new(Mutex::new(Vec::<FlowEvent>::new()));
    let sink = events.clone();

    let rt = Runtime::builder()
        .observer(move |event| sink.lock().unwrap().push(event.clone()))
        .build()
        .unwrap();
    let main = rt.main().clone();

    let err = build(&rt)
        .launch(&main, |_| async { Ok(()) })
        .wait()
        .unwrap_err();

    let kinds = events.lock().unwrap().iter().map(|e| e.kind.clone()).collect();
    (err, kinds)
}

fn assert_panicked(err: &FlowError) {
    match err {
        FlowError::Join(JoinError::Panicked(message)) => assert_eq!(message, "sensor exploded"),
        other => panic!("expected a producer panic, got {other:?}"),
    }
}

#[test]
fn test_producer_panic_finishes_the_run() {
    let (err, kinds) = run_to_failure(|_| exploding());

    assert_panicked(&err);
    assert_eq!(
        kinds,
        vec![
            EventKind::Started,
            EventKind::Emitted { index: 0 },
            EventKind::Delivered { index: 0 },
            EventKind::Finished {
                outcome: Outcome::Failed
            },
        ]
    );
}

#[test]
fn test_buffered_producer_panic_keeps_its_message() {
    let (err, kinds) = run_to_failure(|_| exploding().buffer(2));

    assert_panicked(&err);
    assert_eq!(kinds.iter().filter(|k| matches!(k, EventKind::Delivered { .. })).count(), 1);
    assert_eq!(
        kinds.last(),
        Some(&EventKind::Finished {
            outcome: Outcome::Failed
        })
    );
}

#[test]
fn test_producer_panic_on_another_context_keeps_its_message() {
    let (err, kinds) = run_to_failure(|rt| exploding().on(rt.context(IO).unwrap()));

    assert_panicked(&err);
    assert_eq!(
        kinds.last(),
        Some(&EventKind::Finished {
            outcome: Outcome::Failed
        })
    );
}
