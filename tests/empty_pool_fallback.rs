//! With `max_workers: 0` no worker can ever be spawned, so every call runs
//! locally on the calling thread instead, and the one-time advisory
//! warning doesn't prevent the call from succeeding.

use goroutine::{StartOptions, Value, WorkerOptions};

fn bootstrap() {
    goroutine::register("echo", |args: Vec<Value>| async move { Ok(args.into_iter().next().unwrap_or(Value::Null)) });
}

#[tokio::test]
async fn empty_pool_falls_back_to_local_execution() {
    bootstrap();
    let options = StartOptions {
        max_workers: 0,
        worker: WorkerOptions::default(),
        ..StartOptions::default()
    };
    goroutine::start(options).await.expect("start failed");

    let first = goroutine::call_fn("echo", vec![Value::Number(1.0)]).await.expect("first call failed");
    assert_eq!(first.as_f64(), Some(1.0));

    let second = goroutine::call_fn("echo", vec![Value::Number(2.0)]).await.expect("second call failed");
    assert_eq!(second.as_f64(), Some(2.0));

    let metrics = goroutine::prometheus_metrics().expect("metrics unavailable");
    assert!(metrics.contains("goroutine_local_fallbacks 2"));

    goroutine::terminate().await.expect("terminate failed");
}
