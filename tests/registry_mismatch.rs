//! A call whose signature doesn't match the registry entry at that index —
//! or whose index has no entry at all — is rejected with
//! `GoroutineError::RegistryMismatch`, modeling main and worker having
//! bootstrapped with diverged code.

use goroutine::registry;
use goroutine::GoroutineError;
use goroutine::Value;

#[tokio::test]
async fn mismatched_signature_is_rejected() {
    let index = registry::global().register("mismatch_target", |_args: Vec<Value>| async move { Ok(Value::Null) });
    let real_sig = registry::global().signature_at(index).unwrap();
    let wrong_sig = real_sig.wrapping_add(1);

    let err = registry::global().call(index, wrong_sig, vec![]).await.unwrap_err();
    assert!(matches!(err, GoroutineError::RegistryMismatch));
    assert_eq!(err.to_string(), "Goroutine registry malformed, function call cannot be performed");
}

#[tokio::test]
async fn missing_index_is_also_a_registry_mismatch() {
    let err = registry::global().call(u32::MAX, 0, vec![]).await.unwrap_err();
    assert!(matches!(err, GoroutineError::RegistryMismatch));
}
