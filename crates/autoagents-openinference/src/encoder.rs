use serde::Serialize;
use std::fmt::Debug;

/// Serializes any value to a JSON string without ever failing.
///
/// Standard serde serialization is tried first. Opaque framework objects
/// inside an [`ArgValue`](crate::ArgValue) escalate on their own through
/// their JSON export, their `model_dump` and finally their `Debug` text, so
/// the only fallback left here is the `Debug` representation of a value whose
/// `Serialize` impl errors.
pub fn safe_json_dumps<T>(value: &T) -> String
where
    T: Serialize + Debug + ?Sized,
{
    match serde_json::to_string(value) {
        Ok(json) => json,
        Err(err) => {
            tracing::debug!(
                target: "autoagents.openinference.encoder",
                error = %err,
                "serialization failed, using debug representation"
            );
            format!("{value:?}")
        }
    }
}
