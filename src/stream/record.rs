//! Field projection over structured records (`serde_json::Value`).
//!
//! Missing fields and non-object elements project to `Value::Null`;
//! projection never fails.

use serde_json::{Map, Value};
use std::sync::Arc;

use super::core::Stream;
use super::transform::TransformStreamExt;

pub trait RecordStreamExt: Sized {
    /// The value under `key` of each record
    fn pluck(self, key: &str) -> Stream<Value>;

    /// An array holding the value of each of `keys`, in order
    fn pluck_many<K: AsRef<str>>(self, keys: &[K]) -> Stream<Value>;

    /// Wrap each element as `{key: element}`
    fn unpluck(self, key: &str) -> Stream<Value>;

    /// Zip each array element with `keys` into an object.
    /// Missing positions become `null`.
    fn unpluck_many<K: AsRef<str>>(self, keys: &[K]) -> Stream<Value>;

    /// Leave objects untouched and wrap anything else as `{key: element}`
    fn into_record(self, key: &str) -> Stream<Value>;
}

impl RecordStreamExt for Stream<Value> {
    fn pluck(self, key: &str) -> Stream<Value> {
        let key = key.to_string();
        self.map(move |record| field(&record, &key))
    }

    fn pluck_many<K: AsRef<str>>(self, keys: &[K]) -> Stream<Value> {
        let keys = owned_keys(keys);
        self.map(move |record| Value::Array(keys.iter().map(|key| field(&record, key)).collect()))
    }

    fn unpluck(self, key: &str) -> Stream<Value> {
        let key = key.to_string();
        self.map(move |value| wrap(&key, value))
    }

    fn unpluck_many<K: AsRef<str>>(self, keys: &[K]) -> Stream<Value> {
        let keys = owned_keys(keys);
        self.map(move |value| {
            let mut values = match value {
                Value::Array(values) => values.into_iter(),
                other => vec![other].into_iter(),
            };
            let object: Map<String, Value> = keys
                .iter()
                .map(|key| (key.clone(), values.next().unwrap_or(Value::Null)))
                .collect();
            Value::Object(object)
        })
    }

    fn into_record(self, key: &str) -> Stream<Value> {
        let key = key.to_string();
        self.map(move |value| {
            if value.is_object() {
                value
            } else {
                wrap(&key, value)
            }
        })
    }
}

fn field(record: &Value, key: &str) -> Value {
    record.get(key).cloned().unwrap_or(Value::Null)
}

fn wrap(key: &str, value: Value) -> Value {
    let mut object = Map::new();
    object.insert(key.to_string(), value);
    Value::Object(object)
}

fn owned_keys<K: AsRef<str>>(keys: &[K]) -> Arc<Vec<String>> {
    Arc::new(keys.iter().map(|key| key.as_ref().to_string()).collect())
}
