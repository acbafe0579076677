//! A caller that never registered a function can still get it run on a
//! worker by shipping its source text for inline evaluation.

use goroutine::{StartOptions, Value};

#[tokio::test]
async fn unregistered_inline_call_evaluates_on_a_worker() {
    goroutine::start(StartOptions::default()).await.expect("start failed");

    let result = goroutine::call_inline("a0 * a1 + 1", vec![Value::Number(6.0), Value::Number(7.0)])
        .await
        .expect("inline call failed");

    assert_eq!(result.as_f64(), Some(43.0));

    goroutine::terminate().await.expect("terminate failed");
}
