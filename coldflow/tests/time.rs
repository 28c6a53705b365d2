use coldflow::time::{instrumented, sleep, timeout};
use coldflow::{Elapsed, IO, Runtime, task};
use std::time::{Duration, Instant};

#[coldflow::test]
async fn test_sleep_basic() {
    let start = Instant::now();
    sleep(Duration::from_millis(50)).await;
    let elapsed = start.elapsed();

    assert!(
        elapsed >= Duration::from_millis(50),
        "Sleep should wait at least the specified duration"
    );
}

#[coldflow::test]
async fn test_sleep_zero_duration() {
    let start = Instant::now();
    sleep(Duration::from_millis(0)).await;

    assert!(
        start.elapsed() < Duration::from_millis(10),
        "Zero duration sleep should be fast"
    );
}

#[coldflow::test]
async fn test_concurrent_sleeps_overlap() {
    let start = Instant::now();

    let handles: Vec<_> = (0..5)
        .map(|_| task::spawn(sleep(Duration::from_millis(40))))
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(40));
    assert!(elapsed < Duration::from_millis(190), "sleeps ran one after another: {elapsed:?}");
}

#[coldflow::test]
async fn test_timeout_completes_before_deadline() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(10)).await;
        123
    });

    let result = timeout(Duration::from_millis(200), handle).await;

    assert!(
        matches!(result, Ok(Ok(123))),
        "Timeout should return Ok(123)"
    );
}

#[coldflow::test]
async fn test_timeout_expires() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(100)).await;
        456
    });

    let result = timeout(Duration::from_millis(20), handle).await;

    let err: Elapsed = result.unwrap_err();
    assert_eq!(err.to_string(), "deadline elapsed");
}

#[coldflow::test]
async fn test_instrumented_with_sleep() {
    let (_, elapsed) = instrumented(sleep(Duration::from_millis(50))).await;

    assert!(
        elapsed >= Duration::from_millis(50),
        "Time wrapper should measure at least the sleep duration"
    );
}

#[test]
fn test_context_sleep_runs_on_the_runtime_timer() {
    let rt = Runtime::new().unwrap();
    let io = rt.context(IO).unwrap().clone();

    let elapsed = rt.block_on(async move {
        let start = Instant::now();
        io.sleep(Duration::from_millis(30)).await;
        start.elapsed()
    });

    assert!(elapsed >= Duration::from_millis(30));
}
