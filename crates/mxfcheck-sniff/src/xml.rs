//! XML payload identification and path sniffing.

use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::Reader;

use mxfcheck_tree::{CType, DataIdentifier, SniffContext, SniffKey, SniffResult, Sniffer};

/// Content type reported for XML payloads.
pub const CONTENT_TYPE: &str = "text/xml";

/// Path understood by [`path_sniffer`] that extracts the default namespace
/// of the root element.
pub const ROOT_NAMESPACE: &str = "namespace-uri(/*)";

const FUNCTION_NAME: &str = "the path sniffer using element paths";

/// The XML data identifier.
pub fn identifier() -> DataIdentifier {
    DataIdentifier {
        content_type: CType::from(CONTENT_TYPE),
        data_fn: Arc::new(is_xml),
    }
}

/// Whether the payload is a well formed XML document.
fn is_xml(data: &[u8]) -> bool {
    // a quick first-byte check keeps json and yaml out
    if data.len() < 4 || data[0] != b'<' {
        return false;
    }

    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                open.push(e.name().as_ref().to_vec());
                seen_root = true;
            }
            Ok(Event::End(e)) => match open.pop() {
                Some(name) if name == e.name().as_ref() => {}
                _ => return false,
            },
            Ok(Event::Empty(_)) => seen_root = true,
            Ok(Event::Eof) => return seen_root && open.is_empty(),
            Ok(_) => {}
            Err(_) => return false,
        }
        buf.clear();
    }
}

/// Build a sniffer that extracts a value at an XML path, memoized through
/// the sniff context.
///
/// Supported paths:
///
/// - `/*` - the name of the root element
/// - `namespace-uri(/*)` - the default namespace of the root element
/// - `/a/b/c` - the text of the first element at that absolute path
pub fn path_sniffer(sc: &SniffContext, path: &str) -> Sniffer {
    let key = SniffKey::new(path, FUNCTION_NAME);
    if let Some(cached) = sc.get::<Sniffer>(&key) {
        return (*cached).clone();
    }

    let path_owned = path.to_string();
    let sniffer: Sniffer = Arc::new(move |data| sniff_path(data, &path_owned));

    sc.cache(key, sniffer.clone());
    sniffer
}

fn sniff_path(data: &[u8], path: &str) -> SniffResult {
    let found = match path {
        ROOT_NAMESPACE => root_namespace(data),
        "/*" => root_name(data),
        _ => element_text(data, path),
    };

    match found {
        Some(field) => SniffResult {
            key: path.to_string(),
            field,
            certainty: 100.0,
            data: None,
        },
        None => SniffResult::default(),
    }
}

fn root_name(data: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
        buf.clear();
    }
}

fn root_namespace(data: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"xmlns" {
                        return Some(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
                return None;
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
        buf.clear();
    }
}

/// Text of the first element matching an absolute `/a/b/c` path.
fn element_text(data: &[u8], path: &str) -> Option<String> {
    let target: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if target.is_empty() {
        return None;
    }

    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                if stack.len() == target.len()
                    && stack.iter().zip(&target).all(|(a, b)| a == b)
                {
                    let text = t.decode().ok()?.trim().to_string();
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
        buf.clear();
    }
}
