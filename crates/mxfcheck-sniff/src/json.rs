//! JSON payload identification and pointer sniffing.

use std::sync::Arc;

use serde_json::Value;

use mxfcheck_tree::{CType, DataIdentifier, SniffContext, SniffKey, SniffResult, Sniffer};

/// Content type reported for JSON payloads.
pub const CONTENT_TYPE: &str = "application/json";

const FUNCTION_NAME: &str = "the pointer sniffer using serde_json";

/// The JSON data identifier.
pub fn identifier() -> DataIdentifier {
    DataIdentifier {
        content_type: CType::from(CONTENT_TYPE),
        data_fn: Arc::new(is_json),
    }
}

fn is_json(data: &[u8]) -> bool {
    serde_json::from_slice::<Value>(data).is_ok()
}

/// Build a sniffer that extracts the value at a JSON pointer path (RFC
/// 6901, e.g. `/metadata/name`), memoized through the sniff context.
///
/// String values are reported verbatim; other values in their JSON
/// rendering. A missing pointer yields a zero certainty result.
pub fn pointer_sniffer(sc: &SniffContext, pointer: &str) -> Sniffer {
    let key = SniffKey::new(pointer, FUNCTION_NAME);
    if let Some(cached) = sc.get::<Sniffer>(&key) {
        return (*cached).clone();
    }

    let pointer_owned = pointer.to_string();
    let sniffer: Sniffer = Arc::new(move |data| {
        let Ok(doc) = serde_json::from_slice::<Value>(data) else {
            return SniffResult::default();
        };
        let Some(found) = doc.pointer(&pointer_owned) else {
            return SniffResult::default();
        };

        let field = match found {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        SniffResult {
            key: pointer_owned.clone(),
            field,
            certainty: 100.0,
            data: None,
        }
    });

    sc.cache(key, sniffer.clone());
    sniffer
}
