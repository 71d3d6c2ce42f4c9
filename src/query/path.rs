//! Path Resolver
//!
//! Walks a dot-separated path through a JSON value. At an object a segment
//! is a key; at an array a segment must be a non-negative index. Anything
//! else (missing key, bad index, descending into a scalar) is "not found".

use serde_json::Value;

/// Resolve `path` against `data`, returning the value it points at
pub fn get_deep<'a>(path: &str, data: &'a Value) -> Option<&'a Value> {
    path.split('.').try_fold(data, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|idx| items.get(idx)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> Value {
        serde_json::from_str(
            r#"{
                "a": 1,
                "b": "foo",
                "c": {
                    "d": 2
                },
                "array": [2,3]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_get_deep_table() {
        let data = fixture();
        let cases: Vec<(&str, Option<Value>)> = vec![
            ("a", Some(json!(1.0))),
            ("b", Some(json!("foo"))),
            ("not_there", None),
            ("c", Some(json!({"d": 2}))),
            ("c.d", Some(json!(2.0))),
            ("array.2", None),
            ("c.d.not_there", None),
            ("array.1", Some(json!(3.0))),
            ("array.foo", None),
        ];

        for (key, expected) in cases {
            let found = get_deep(key, &data);
            assert_eq!(found.is_some(), expected.is_some(), "ok mismatch for '{}'", key);
            if let (Some(found), Some(expected)) = (found, expected) {
                // Compare numerically so 1 and 1.0 are the same leaf
                match (found.as_f64(), expected.as_f64()) {
                    (Some(a), Some(b)) => assert_eq!(a, b, "value mismatch for '{}'", key),
                    _ => assert_eq!(found, &expected, "value mismatch for '{}'", key),
                }
            }
        }
    }

    #[test]
    fn test_negative_index_not_found() {
        let data = fixture();
        assert!(get_deep("array.-1", &data).is_none());
    }
}
