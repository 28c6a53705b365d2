use coldflow::task::{JoinHandle, spawn};
use coldflow::time::sleep;
use coldflow::{DEFAULT, ExecutionContext, IO, JoinError, MAIN, Runtime, RuntimeBuilder};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn thread_name() -> String {
    thread::current().name().unwrap_or_default().to_string()
}

#[test]
fn test_default_context_layout() {
    let rt = Runtime::new().unwrap();

    let names: Vec<_> = rt.contexts().iter().map(|c| c.name().to_string()).collect();
    assert_eq!(names, vec![MAIN, DEFAULT, IO]);

    assert_eq!(rt.main().threads(), 1);
    assert_eq!(rt.context(IO).unwrap().threads(), 4);
    assert!(rt.context("missing").is_none());
}

#[test]
fn test_single_worker_thread() {
    let rt = RuntimeBuilder::new().worker_threads(1).build().unwrap();

    let result = rt.block_on(async { 42 });
    assert_eq!(result, 42);
    assert_eq!(rt.context(DEFAULT).unwrap().threads(), 1);
}

#[test]
fn test_block_on_runs_on_main() {
    let rt = RuntimeBuilder::new().worker_threads(4).build().unwrap();

    let (name, current) = rt.block_on(async {
        let current = ExecutionContext::current().map(|c| c.name().to_string());
        (thread_name(), current)
    });

    assert_eq!(name, "coldflow-main-0");
    assert_eq!(current.as_deref(), Some(MAIN));
}

#[test]
fn test_tasks_stay_on_their_context() {
    let rt = Runtime::builder().io_threads(2).build().unwrap();
    let io = rt.context(IO).unwrap().clone();

    let names = rt.block_on(async move {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                io.spawn(async {
                    sleep(Duration::from_millis(1)).await;
                    assert!(ExecutionContext::current().unwrap().name() == IO);
                    thread_name()
                })
            })
            .collect();

        let mut names = HashSet::new();
        for handle in handles {
            names.insert(handle.await.unwrap());
        }
        names
    });

    assert!(!names.is_empty() && names.len() <= 2);
    assert!(names.iter().all(|n| n.starts_with("coldflow-io-")));
}

#[test]
fn test_worker_threads_parallel_execution() {
    let rt = RuntimeBuilder::new().worker_threads(4).build().unwrap();
    let default = rt.context(DEFAULT).unwrap().clone();

    let counter = Arc::new(Mutex::new(0));
    let results = Arc::new(Mutex::new(Vec::new()));

    let counter_clone = counter.clone();
    let results_clone = results.clone();

    rt.block_on(async move {
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let counter = counter_clone.clone();
                let results = results_clone.clone();

                default.spawn(async move {
                    *counter.lock().unwrap() += 1;
                    results.lock().unwrap().push(i);
                    i * 2
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    });

    assert_eq!(*counter.lock().unwrap(), 10);
    assert_eq!(results.lock().unwrap().len(), 10);
}

#[test]
fn test_worker_threads_chain_spawn() {
    let rt = RuntimeBuilder::new().worker_threads(4).build().unwrap();

    let result = rt.block_on(async {
        let handle1 = spawn(async {
            let handle2 = spawn(async {
                let handle3 = spawn(async { 10 });
                handle3.await.unwrap() + 20
            });
            handle2.await.unwrap() + 30
        });
        handle1.await.unwrap() + 40
    });

    assert_eq!(result, 100);
}

#[test]
#[should_panic(expected = "worker_threads must be > 0")]
fn test_worker_threads_zero_panics() {
    let _ = RuntimeBuilder::new().worker_threads(0).build();
}

#[test]
#[should_panic(expected = "single-threaded")]
fn test_main_context_cannot_be_resized() {
    let _ = RuntimeBuilder::new().context(MAIN, 2);
}

#[test]
fn test_sequential_runtimes() {
    for n in 1..=4 {
        let rt = RuntimeBuilder::new().worker_threads(n).build().unwrap();
        let result = rt.block_on(async move { n * 10 });
        assert_eq!(result, n * 10);
        drop(rt);
    }
}

#[test]
fn test_nested_spawns() {
    let rt = RuntimeBuilder::new().worker_threads(4).build().unwrap();

    let results = Arc::new(Mutex::new(Vec::new()));
    let results_clone = results.clone();

    rt.block_on(async move {
        let outer_handles: Vec<_> = (0..4)
            .map(|i| {
                let results = results_clone.clone();
                spawn(async move {
                    let inner_handles: Vec<_> = (0..5)
                        .map(|j| {
                            let results = results.clone();
                            spawn(async move {
                                results.lock().unwrap().push(i * 10 + j);
                            })
                        })
                        .collect();

                    for handle in inner_handles {
                        handle.await.unwrap();
                    }
                })
            })
            .collect();

        for handle in outer_handles {
            handle.await.unwrap();
        }
    });

    assert_eq!(results.lock().unwrap().len(), 20);
}

#[coldflow::test]
async fn test_panicking_task_reports_join_error() {
    let handle: JoinHandle<()> = spawn(async {
        panic!("sensor exploded");
    });

    let err = handle.await.unwrap_err();
    assert_eq!(err, JoinError::Panicked("sensor exploded".to_string()));
}

#[coldflow::test]
async fn test_abort_drops_the_future() {
    struct Flag(Arc<Mutex<bool>>);

    impl Drop for Flag {
        fn drop(&mut self) {
            *self.0.lock().unwrap() = true;
        }
    }

    let dropped = Arc::new(Mutex::new(false));
    let flag = Flag(dropped.clone());

    let handle = spawn(async move {
        let _flag = flag;
        sleep(Duration::from_secs(10)).await;
    });

    sleep(Duration::from_millis(10)).await;
    assert!(!handle.is_finished());

    handle.abort();
    assert!(handle.is_finished());
    assert!(*dropped.lock().unwrap());
    assert_eq!(handle.await.unwrap_err(), JoinError::Cancelled);
}

#[test]
fn test_spawn_after_shutdown_is_cancelled() {
    let rt = Runtime::new().unwrap();
    let io = rt.context(IO).unwrap().clone();
    drop(rt);

    assert_eq!(io.spawn(async { 1 }).wait(), Err(JoinError::Cancelled));
}

#[test]
#[should_panic(expected = "boom")]
fn test_block_on_reraises_panics() {
    let rt = Runtime::new().unwrap();
    let _: () = rt.block_on(async { panic!("boom") });
}

#[test]
fn test_join_handle_wait_from_outside() {
    let rt = Runtime::new().unwrap();
    let default = rt.context(DEFAULT).unwrap();

    let handle = default.spawn(async {
        sleep(Duration::from_millis(10)).await;
        "done"
    });

    assert_eq!(handle.wait(), Ok("done"));
}
