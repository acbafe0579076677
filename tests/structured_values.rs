//! Structured values beyond plain numbers/strings — a `Map` and a `Regex`
//! — survive a call round trip.

use goroutine::{StartOptions, Value};

fn bootstrap() {
    goroutine::register("describe", |args: Vec<Value>| async move {
        let pattern = match args.first() {
            Some(Value::Regex { pattern, .. }) => pattern.clone(),
            _ => return Err(goroutine::GoroutineError::InvalidArgument("expected a Regex".into())),
        };
        Ok(Value::Map(vec![(Value::str("pattern"), Value::Str(pattern))]))
    });
}

#[tokio::test]
async fn map_and_regex_values_survive_a_call() {
    bootstrap();
    goroutine::start(StartOptions::default()).await.expect("start failed");

    let regex_arg = Value::regex("^ab+c$", "i").expect("pattern is valid");

    let result = goroutine::call_fn("describe", vec![regex_arg]).await.expect("call failed");
    match result {
        Value::Map(pairs) => {
            assert_eq!(pairs.len(), 1);
            assert_eq!(pairs[0].0.as_str(), Some("pattern"));
            assert_eq!(pairs[0].1.as_str(), Some("^ab+c$"));
        }
        other => panic!("expected Map, got {other:?}"),
    }

    goroutine::terminate().await.expect("terminate failed");
}
