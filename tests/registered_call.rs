//! A function registered on both the facade side and (trivially, in the
//! thread transport) the worker side can be called by name and returns the
//! expected result.

use goroutine::{StartOptions, Value};

fn bootstrap() {
    goroutine::register("sum", |args: Vec<Value>| async move {
        let total: f64 = args.iter().filter_map(Value::as_f64).sum();
        Ok(Value::Number(total))
    });
}

#[tokio::test]
async fn registered_sum_call_returns_expected_result() {
    bootstrap();
    goroutine::start(StartOptions::default()).await.expect("start failed");

    let result = goroutine::call_fn("sum", vec![Value::Number(2.0), Value::Number(3.0), Value::Number(4.0)])
        .await
        .expect("call failed");

    assert_eq!(result.as_f64(), Some(9.0));

    goroutine::terminate().await.expect("terminate failed");
}
