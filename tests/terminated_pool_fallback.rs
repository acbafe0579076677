//! Once `terminate()` has torn down every worker, a subsequent call still
//! succeeds by falling back to local execution, and doesn't resurrect a
//! worker behind the caller's back.

use goroutine::{StartOptions, Value};

fn bootstrap() {
    goroutine::register("echo", |args: Vec<Value>| async move { Ok(args.into_iter().next().unwrap_or(Value::Null)) });
}

#[tokio::test]
async fn call_after_terminate_falls_back_locally_without_respawning() {
    bootstrap();
    let options = StartOptions {
        min_workers: 1,
        max_workers: 1,
        ..StartOptions::default()
    };
    goroutine::start(options).await.expect("start failed");

    let before = goroutine::call_fn("echo", vec![Value::Number(1.0)]).await.expect("first call failed");
    assert_eq!(before.as_f64(), Some(1.0));

    goroutine::terminate().await.expect("terminate failed");

    let after = goroutine::call_fn("echo", vec![Value::Number(2.0)]).await.expect("call after terminate failed");
    assert_eq!(after.as_f64(), Some(2.0));

    let workers = goroutine::workers().await.expect("workers() unavailable");
    assert!(workers.is_empty(), "terminate()+call() must not leave a worker running: {workers:?}");
}
