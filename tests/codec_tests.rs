//! Unit-style tests for the value codec: round-trip fidelity for the
//! special numeric cases and the cycle-elimination invariant. These don't
//! touch the facade or any worker, so they live in their own file without
//! needing a dedicated process per test.

use goroutine::{decode, encode, Encodable, Value};

#[test]
fn special_numerics_round_trip() {
    for n in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, -0.0, 1.5] {
        let encoded = encode(&Encodable::Number(n));
        let decoded = decode(&encoded);
        match decoded {
            Encodable::Number(m) => {
                if n.is_nan() {
                    assert!(m.is_nan());
                } else {
                    assert_eq!(n.to_bits(), m.to_bits());
                }
            }
            other => panic!("expected Number, got {other:?}"),
        }
    }
}

#[test]
fn array_and_object_round_trip() {
    let original = Encodable::object(vec![
        ("name".to_string(), Encodable::Str("widget".to_string())),
        (
            "tags".to_string(),
            Encodable::array(vec![Encodable::Str("a".to_string()), Encodable::Str("b".to_string())]),
        ),
    ]);

    let value = encode(&original);
    match &value {
        Value::Object(fields) => {
            assert_eq!(fields.len(), 2);
            assert_eq!(fields[0].0, "name");
        }
        other => panic!("expected Object, got {other:?}"),
    }

    let round_tripped = decode(&value);
    let re_encoded = encode(&round_tripped);
    match re_encoded {
        Value::Object(fields) => assert_eq!(fields.len(), 2),
        other => panic!("expected Object, got {other:?}"),
    }
}

/// A self-referential object `{foo: "Hello, World", bar: <cycle back to
/// root>}` encodes to `{foo: "Hello, World"}` — the cyclic `bar` key
/// disappears entirely rather than being replaced by a sentinel.
#[test]
fn cyclic_object_drops_the_back_edge_not_a_placeholder() {
    let root = Encodable::object(vec![("foo".to_string(), Encodable::Str("Hello, World".to_string()))]);
    let handle = root.object_handle().expect("root is an Object");
    handle.borrow_mut().push(("bar".to_string(), root.clone()));

    let encoded = encode(&root);
    match encoded {
        Value::Object(fields) => {
            assert_eq!(fields.len(), 1, "the cyclic 'bar' field must be omitted, not sentinel-replaced");
            assert_eq!(fields[0].0, "foo");
            assert_eq!(fields[0].1.as_str(), Some("Hello, World"));
        }
        other => panic!("expected Object, got {other:?}"),
    }
}

#[test]
fn regex_value_rejects_an_invalid_pattern_up_front() {
    assert!(Value::regex("valid(", "").is_err());
    assert!(Value::regex("^valid$", "i").is_ok());
}

#[test]
fn map_and_set_round_trip() {
    let original = Encodable::Map(std::rc::Rc::new(std::cell::RefCell::new(vec![(
        Encodable::Str("k".to_string()),
        Encodable::Number(42.0),
    )])));
    let value = encode(&original);
    match value {
        Value::Map(pairs) => {
            assert_eq!(pairs.len(), 1);
            assert_eq!(pairs[0].1.as_f64(), Some(42.0));
        }
        other => panic!("expected Map, got {other:?}"),
    }
}
