//! Flattening of nested argument structures into span attributes.

use opentelemetry::{Array, KeyValue, StringValue, Value};

use crate::encoder::safe_json_dumps;
use crate::value::{ArgMap, ArgValue};

/// Flattens a nested mapping into dotted-key attributes.
///
/// Absent values are skipped, nested maps extend the key with `.<key>`, and
/// lists holding at least one map extend it with `.<index>` for every element.
/// Everything else becomes a single attribute through [`to_attribute_value`].
pub fn flatten(mapping: Option<&ArgMap>) -> Vec<KeyValue> {
    let mut attributes = Vec::new();
    if let Some(mapping) = mapping {
        flatten_map(&mut attributes, None, mapping);
    }
    attributes
}

fn flatten_map(attributes: &mut Vec<KeyValue>, prefix: Option<&str>, mapping: &ArgMap) {
    for (key, value) in mapping.iter() {
        if key.is_empty() {
            continue;
        }
        let key = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.to_string(),
        };
        flatten_value(attributes, key, value);
    }
}

fn flatten_value(attributes: &mut Vec<KeyValue>, key: String, value: &ArgValue) {
    match value {
        ArgValue::None => {}
        ArgValue::Map(mapping) => flatten_map(attributes, Some(&key), mapping),
        ArgValue::List(items) if items.iter().any(|item| matches!(item, ArgValue::Map(_))) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(attributes, format!("{key}.{index}"), item);
            }
        }
        other => {
            if let Some(value) = to_attribute_value(other) {
                attributes.push(KeyValue::new(key, value));
            }
        }
    }
}

/// Converts a single value into an attribute value.
///
/// Scalars pass through, enumeration members are unwrapped, homogeneous scalar
/// lists become arrays, and every other shape is JSON-encoded. Returns `None`
/// only for the absent marker.
pub fn to_attribute_value(value: &ArgValue) -> Option<Value> {
    match value {
        ArgValue::None => None,
        ArgValue::Bool(value) => Some(Value::Bool(*value)),
        ArgValue::Int(value) => Some(Value::I64(*value)),
        ArgValue::Float(value) => Some(Value::F64(*value)),
        ArgValue::Str(value) => Some(Value::from(value.clone())),
        ArgValue::Enum(member) => to_attribute_value(&member.value),
        ArgValue::List(items) => Some(
            scalar_array(items)
                .map(Value::Array)
                .unwrap_or_else(|| Value::from(safe_json_dumps(items))),
        ),
        ArgValue::Map(_) | ArgValue::Object(_) => Some(Value::from(safe_json_dumps(value))),
    }
}

fn unwrap_enum(value: &ArgValue) -> &ArgValue {
    match value {
        ArgValue::Enum(member) => unwrap_enum(&member.value),
        other => other,
    }
}

fn scalar_array(items: &[ArgValue]) -> Option<Array> {
    let items: Vec<&ArgValue> = items.iter().map(unwrap_enum).collect();
    if items.is_empty() {
        return Some(Array::String(Vec::new()));
    }

    if let Some(values) = collect(&items, |item| match item {
        ArgValue::Str(value) => Some(StringValue::from(value.clone())),
        _ => None,
    }) {
        return Some(Array::String(values));
    }
    if let Some(values) = collect(&items, |item| match item {
        ArgValue::Bool(value) => Some(*value),
        _ => None,
    }) {
        return Some(Array::Bool(values));
    }
    if let Some(values) = collect(&items, |item| match item {
        ArgValue::Int(value) => Some(*value),
        _ => None,
    }) {
        return Some(Array::I64(values));
    }
    collect(&items, |item| match item {
        ArgValue::Int(value) => Some(*value as f64),
        ArgValue::Float(value) => Some(*value),
        _ => None,
    })
    .map(Array::F64)
}

fn collect<T>(items: &[&ArgValue], pick: impl Fn(&ArgValue) -> Option<T>) -> Option<Vec<T>> {
    items.iter().map(|&item| pick(item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semconv::SpanKind;
    use crate::value::Inspect;
    use serde_json::json;

    fn keys(attributes: &[KeyValue]) -> Vec<&str> {
        attributes.iter().map(|kv| kv.key.as_str()).collect()
    }

    fn value_of<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a Value> {
        attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }

    #[test]
    fn absent_or_empty_input_yields_nothing() {
        assert!(flatten(None).is_empty());
        assert!(flatten(Some(&ArgMap::new())).is_empty());
    }

    #[test]
    fn absent_values_are_omitted() {
        let mapping = ArgMap::from([("present", ArgValue::from("yes")), ("missing", ArgValue::None)]);
        let attributes = flatten(Some(&mapping));

        assert_eq!(keys(&attributes), vec!["present"]);
    }

    #[test]
    fn nested_mappings_extend_the_key() {
        let mapping: ArgMap = ArgMap::from([(
            "llm",
            ArgValue::from(json!({"model_name": "gpt", "token_count": {"prompt": 3, "unset": null}})),
        )]);
        let attributes = flatten(Some(&mapping));

        assert_eq!(keys(&attributes), vec!["llm.model_name", "llm.token_count.prompt"]);
        assert_eq!(value_of(&attributes, "llm.token_count.prompt"), Some(&Value::I64(3)));
    }

    #[test]
    fn sequences_of_mappings_get_index_segments() {
        let message = |role: &str, content: &str| {
            ArgValue::from(ArgMap::from([(
                "message",
                ArgMap::from([("role", role), ("content", content)]),
            )]))
        };
        let mapping = ArgMap::from([(
            "llm.input_messages",
            ArgValue::List(vec![message("system", "be brief"), message("user", "hi")]),
        )]);
        let attributes = flatten(Some(&mapping));

        assert_eq!(
            keys(&attributes),
            vec![
                "llm.input_messages.0.message.role",
                "llm.input_messages.0.message.content",
                "llm.input_messages.1.message.role",
                "llm.input_messages.1.message.content",
            ]
        );
        assert_eq!(
            value_of(&attributes, "llm.input_messages.1.message.content"),
            Some(&Value::from("hi"))
        );
    }

    #[test]
    fn non_mapping_elements_in_mixed_sequences_are_singletons() {
        let mapping = ArgMap::from([("items", ArgValue::from(json!([{"a": 1}, "loose", null])))]);
        let attributes = flatten(Some(&mapping));

        assert_eq!(keys(&attributes), vec!["items.0.a", "items.1"]);
        assert_eq!(value_of(&attributes, "items.1"), Some(&Value::from("loose")));
    }

    #[test]
    fn enumerations_are_unwrapped() {
        let mapping = ArgMap::from([("openinference.span.kind", SpanKind::Agent)]);
        let attributes = flatten(Some(&mapping));

        assert_eq!(
            value_of(&attributes, "openinference.span.kind"),
            Some(&Value::from("AGENT"))
        );
    }

    #[test]
    fn scalar_lists_become_arrays() {
        let mapping = ArgMap::from([
            ("names", ArgValue::from(vec!["search", "python"])),
            ("sizes", ArgValue::from(vec![1, 2])),
            ("mixed", ArgValue::List(vec![1.into(), 2.5.into()])),
            ("empty", ArgValue::List(Vec::new())),
        ]);
        let attributes = flatten(Some(&mapping));

        assert_eq!(
            value_of(&attributes, "names"),
            Some(&Value::Array(Array::String(vec!["search".into(), "python".into()])))
        );
        assert_eq!(
            value_of(&attributes, "sizes"),
            Some(&Value::Array(Array::I64(vec![1, 2])))
        );
        assert_eq!(
            value_of(&attributes, "mixed"),
            Some(&Value::Array(Array::F64(vec![1.0, 2.5])))
        );
        assert_eq!(
            value_of(&attributes, "empty"),
            Some(&Value::Array(Array::String(Vec::new())))
        );
    }

    #[test]
    fn heterogeneous_lists_and_objects_are_encoded() {
        #[derive(Debug)]
        struct Handle;
        impl Inspect for Handle {}

        let mapping = ArgMap::from([
            ("mixed", ArgValue::List(vec!["a".into(), 1.into()])),
            ("handle", ArgValue::object(Handle)),
        ]);
        let attributes = flatten(Some(&mapping));

        assert_eq!(value_of(&attributes, "mixed"), Some(&Value::from(r#"["a",1]"#)));
        assert_eq!(value_of(&attributes, "handle"), Some(&Value::from(r#""Handle""#)));
    }

    #[test]
    fn empty_key_segments_are_skipped() {
        let mapping = ArgMap::from([("", ArgValue::from("x")), ("ok", ArgValue::from("y"))]);
        assert_eq!(keys(&flatten(Some(&mapping))), vec!["ok"]);
    }
}
