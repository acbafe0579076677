//! An error raised by the registered function on the worker side
//! propagates back to the caller as `GoroutineError::User` carrying the
//! worker's message.

use goroutine::{GoroutineError, StartOptions, Value};

fn bootstrap() {
    goroutine::register("always_fails", |_args: Vec<Value>| async move {
        Err(GoroutineError::User("deliberate failure".to_string()))
    });
}

#[tokio::test]
async fn worker_side_error_propagates_to_the_caller() {
    bootstrap();
    goroutine::start(StartOptions::default()).await.expect("start failed");

    let err = goroutine::call_fn("always_fails", vec![]).await.unwrap_err();
    match err {
        GoroutineError::User(message) => assert_eq!(message, "deliberate failure"),
        other => panic!("expected User error, got {other:?}"),
    }

    goroutine::terminate().await.expect("terminate failed");
}
