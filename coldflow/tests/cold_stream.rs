use coldflow::time::{instrumented, sleep};
use coldflow::{EventKind, ExecutionContext, Flow, FlowError, FlowEvent, Outcome, Runtime, flow, flow_of};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn main_context() -> ExecutionContext {
    ExecutionContext::current().expect("tests run on the main context")
}

fn counting(counter: Arc<AtomicUsize>) -> Flow<u32> {
    flow(move |mut out| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            for i in 0..4 {
                out.emit(i).await?;
            }
            Ok(())
        }
    })
}

#[coldflow::test]
async fn test_flow_is_cold_until_collected() {
    let runs = Arc::new(AtomicUsize::new(0));
    let numbers = counting(runs.clone());

    sleep(Duration::from_millis(20)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0, "building a flow must not run it");

    let main = main_context();
    assert_eq!(numbers.to_list(&main).await.unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(numbers.to_list(&main).await.unwrap(), vec![0, 1, 2, 3]);

    assert_eq!(runs.load(Ordering::SeqCst), 2, "every collection re-runs the producer");
}

#[coldflow::test]
async fn test_lockstep_without_buffer() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let producer_log = log.clone();

    let numbers = flow(move |mut out| {
        let log = producer_log.clone();
        async move {
            for i in 0..4u32 {
                sleep(Duration::from_millis(30)).await;
                log.lock().unwrap().push(("emit", i));
                out.emit(i).await?;
            }
            Ok(())
        }
    });

    let consumer_log = log.clone();
    let (result, elapsed) = instrumented(numbers.collect(&main_context(), move |v| {
        let log = consumer_log.clone();
        async move {
            log.lock().unwrap().push(("consume", v));
            sleep(Duration::from_millis(20)).await;
            Ok(())
        }
    }))
    .await;

    result.unwrap();

    assert!(
        elapsed >= Duration::from_millis(4 * (30 + 20)),
        "producer and consumer steps should add up, got {elapsed:?}"
    );

    let expected: Vec<_> = (0..4u32).flat_map(|i| [("emit", i), ("consume", i)]).collect();
    assert_eq!(*log.lock().unwrap(), expected);
}

#[test]
fn test_observer_sees_alternating_emissions_and_deliveries() {
    let events = Arc::new(Mutex::new(Vec::<FlowEvent>::new()));
    let sink = events.clone();

    let rt = Runtime::builder()
        .observer(move |event| sink.lock().unwrap().push(event.clone()))
        .build()
        .unwrap();

    let main = rt.main().clone();
    rt.block_on(async move {
        flow_of([10, 20, 30])
            .collect(&main, |_| async { Ok(()) })
            .await
            .unwrap();
    });

    let kinds: Vec<_> = events.lock().unwrap().iter().map(|e| e.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Started,
            EventKind::Emitted { index: 0 },
            EventKind::Delivered { index: 0 },
            EventKind::Emitted { index: 1 },
            EventKind::Delivered { index: 1 },
            EventKind::Emitted { index: 2 },
            EventKind::Delivered { index: 2 },
            EventKind::Finished {
                outcome: Outcome::Completed
            },
        ]
    );

    let events = events.lock().unwrap();
    assert!(events.iter().all(|e| e.run == events[0].run));
    assert!(events.iter().all(|e| &*e.context == coldflow::MAIN));
}

#[coldflow::test]
async fn test_map_and_from_iterator() {
    let numbers: Flow<u32> = (1..=3).collect();
    let scaled = numbers.map(|n| n * 10).map(|n| format!("#{n}"));

    assert_eq!(
        scaled.to_list(&main_context()).await.unwrap(),
        vec!["#10", "#20", "#30"]
    );
}

#[coldflow::test]
async fn test_on_each_delays_every_value() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();

    let slowed = flow_of([1, 2, 3]).on_each(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async {
            sleep(Duration::from_millis(15)).await;
            Ok(())
        }
    });

    let (values, elapsed) = instrumented(slowed.to_list(&main_context())).await;

    assert_eq!(values.unwrap(), vec![1, 2, 3]);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
    assert!(elapsed >= Duration::from_millis(45));
}

#[coldflow::test]
async fn test_on_each_failure_is_a_producer_failure() {
    let failing = flow_of([1, 2, 3]).on_each(|v| {
        let v = *v;
        async move {
            if v == 2 {
                return Err(FlowError::producer("value 2 rejected"));
            }
            Ok(())
        }
    });

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();

    let err = failing
        .collect(&main_context(), move |v| {
            sink.lock().unwrap().push(v);
            async { Ok(()) }
        })
        .await
        .unwrap_err();

    assert!(err.is_producer());
    assert_eq!(*delivered.lock().unwrap(), vec![1]);
}

#[coldflow::test]
async fn test_producer_failure_after_k_values() {
    let failing = flow(|mut out| async move {
        for i in 0..3 {
            out.emit(i).await?;
        }
        Err(FlowError::producer("sensor offline"))
    });

    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = invocations.clone();

    let err = failing
        .collect(&main_context(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await
        .unwrap_err();

    assert!(err.is_producer());
    assert!(err.to_string().contains("sensor offline"));
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
}

#[coldflow::test]
async fn test_consumer_failure_is_surfaced_even_if_swallowed() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let producer_attempts = attempts.clone();

    let stubborn = flow(move |mut out| {
        let attempts = producer_attempts.clone();
        async move {
            for i in 0..5 {
                // Errors from emit are deliberately ignored here.
                let _ = out.emit(i).await;
                attempts.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    });

    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = invocations.clone();

    let err = stubborn
        .collect(&main_context(), move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if v == 1 {
                    Err(FlowError::consumer("cannot display value"))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap_err();

    assert!(err.is_consumer());
    assert_eq!(attempts.load(Ordering::SeqCst), 5);
    assert_eq!(invocations.load(Ordering::SeqCst), 2, "no value reaches a failed consumer");
}

#[test]
fn test_collect_from_another_context_runs_consumer_on_target() {
    let rt = Runtime::new().unwrap();
    let main = rt.main().clone();
    let io = rt.context(coldflow::IO).unwrap().clone();

    let threads = Arc::new(Mutex::new(Vec::new()));
    let sink = threads.clone();
    let numbers = flow_of([1, 2]);

    let collected = io.spawn(async move {
        numbers
            .collect(&main, move |_| {
                let name = std::thread::current().name().map(str::to_string);
                sink.lock().unwrap().push(name);
                async { Ok(()) }
            })
            .await
    });

    collected.wait().unwrap().unwrap();

    let threads = threads.lock().unwrap();
    assert_eq!(threads.len(), 2);
    assert!(threads.iter().all(|n| n.as_deref() == Some("coldflow-main-0")));
}
