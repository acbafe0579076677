//! A minimal demonstration of registering a function and calling it on a
//! worker. Run with `cargo run --bin goroutine-demo`.

use goroutine::{StartOptions, Value};
use tracing_subscriber::EnvFilter;

fn bootstrap() {
    goroutine::register("add", |args: Vec<Value>| async move {
        let a = args.first().and_then(Value::as_f64).unwrap_or(0.0);
        let b = args.get(1).and_then(Value::as_f64).unwrap_or(0.0);
        Ok(Value::Number(a + b))
    });
}

fn main() {
    // Must run before anything else: on a worker subprocess this exits the
    // process and never returns.
    goroutine::maybe_run_worker();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    bootstrap();

    let runtime = tokio::runtime::Runtime::new().expect("failed to build runtime");
    runtime.block_on(async {
        goroutine::start(StartOptions::default())
            .await
            .expect("failed to start pool");

        let result = goroutine::call_fn("add", vec![Value::Number(2.0), Value::Number(3.0)])
            .await
            .expect("call failed");
        println!("2 + 3 = {:?}", result.as_f64());

        let inline = goroutine::call_inline("a0 + a1", vec![Value::Number(4.0), Value::Number(5.0)])
            .await
            .expect("inline call failed");
        println!("4 + 5 (inline) = {:?}", inline.as_f64());

        goroutine::terminate().await.expect("failed to terminate pool");
    });
}
