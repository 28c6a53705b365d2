//! Replays three producer/consumer timing scenarios.
//!
//! The producer needs 100 ms per value, the consumer 200 ms:
//!
//! 1. plain collection: both steps add up, about 300 ms per value,
//! 2. `buffer(2)`: the producer runs ahead, the consumer sets the pace,
//! 3. `on(default)`: the producer moves to the `default` pool.
//!
//! Run with `RUST_LOG=coldflow=debug cargo run --example scenarios` to see
//! the runtime's own logs as well.

use coldflow::time::sleep;
use coldflow::{DEFAULT, ExecutionContext, Flow, FlowResult, Runtime, flow};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PRODUCER_STEP: Duration = Duration::from_millis(100);
const CONSUMER_STEP: Duration = Duration::from_millis(200);

fn thread_name() -> String {
    thread::current().name().unwrap_or("?").to_string()
}

fn numbers(start: Instant) -> Flow<u32> {
    flow(move |mut out| async move {
        for i in 0..4 {
            sleep(PRODUCER_STEP).await;
            info!(value = i, at = ?start.elapsed(), thread = %thread_name(), "emit");
            out.emit(i).await?;
        }
        Ok(())
    })
}

async fn consume(flow: Flow<u32>, main: &ExecutionContext, start: Instant) -> FlowResult {
    flow.collect(main, move |value| async move {
        info!(value, at = ?start.elapsed(), thread = %thread_name(), "collect");
        sleep(CONSUMER_STEP).await;
        Ok(())
    })
    .await
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let runtime = Runtime::new()?;
    let main = runtime.main().clone();
    let default = runtime
        .context(DEFAULT)
        .cloned()
        .ok_or_else(|| std::io::Error::other("missing default context"))?;

    let scenarios: [(&str, fn(Flow<u32>, &ExecutionContext) -> Flow<u32>); 3] = [
        ("plain", |flow, _| flow),
        ("buffer(2)", |flow, _| flow.buffer(2)),
        ("on(default)", |flow, default| flow.on(default)),
    ];

    for (name, stage) in scenarios {
        let main = main.clone();
        let default = default.clone();

        let outcome = runtime.block_on(async move {
            let start = Instant::now();
            let flow = stage(numbers(start), &default);
            let result = consume(flow, &main, start).await;
            (result, start.elapsed())
        });

        match outcome {
            (Ok(()), elapsed) => info!(scenario = name, ?elapsed, "scenario finished"),
            (Err(err), _) => tracing::error!(scenario = name, %err, "scenario failed"),
        }
    }

    Ok(())
}
