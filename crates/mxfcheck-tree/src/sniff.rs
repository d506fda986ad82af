//! Essence content sniffing.
//!
//! Each registered [`DataIdentifier`] can claim a payload; the first one
//! whose probe returns true wins and only its sniffers run, so exactly one
//! content type applies per payload. Sniff results are attached to essence
//! nodes during the tree build and queried later through `sniff:<key>`
//! search fields.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Key under which the detected content type is stored on a node.
pub const CONTENT_TYPE_KEY: &str = "ContentType";

/// Content type of a data payload, e.g. `text/xml`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CType(pub String);

impl From<&str> for CType {
    fn from(s: &str) -> Self {
        CType(s.to_string())
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A content type and the probe that recognises it.
#[derive(Clone)]
pub struct DataIdentifier {
    pub content_type: CType,
    pub data_fn: Arc<dyn Fn(&[u8]) -> bool>,
}

impl fmt::Debug for DataIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataIdentifier")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// A sniffer takes a quick look at a payload and reports what it found.
pub type Sniffer = Arc<dyn Fn(&[u8]) -> SniffResult>;

/// Result of one sniff probe.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SniffResult {
    /// The probe's key, used to store and query the result.
    pub key: String,
    /// The value the probe extracted.
    pub field: String,
    /// How certain the probe is, as a percentage. Zero results are dropped.
    pub certainty: f64,
    /// The content type the payload was identified as.
    pub data: Option<CType>,
}

/// A content type identifier together with the sniffers to run on any
/// payload it claims.
#[derive(Clone)]
pub struct SniffTest {
    pub data_id: DataIdentifier,
    pub sniffs: Vec<Sniffer>,
}

/// Identify the payload's content type and run the attached sniffers.
///
/// Identification short-circuits on the first matching identifier. Returns
/// the recorded results keyed by probe name, with the content type stored
/// under [`CONTENT_TYPE_KEY`]; an empty map when no identifier claims the
/// payload.
pub fn sniff(data: &[u8], sets: &[(DataIdentifier, Vec<Sniffer>)]) -> HashMap<String, SniffResult> {
    let mut results = HashMap::new();

    for (id, sniffers) in sets {
        if !(id.data_fn)(data) {
            continue;
        }

        results.insert(
            CONTENT_TYPE_KEY.to_string(),
            SniffResult {
                key: CONTENT_TYPE_KEY.to_string(),
                field: id.content_type.0.clone(),
                certainty: 0.0,
                data: None,
            },
        );

        for sniffer in sniffers {
            let mut res = sniffer(data);
            if res.certainty > 0.0 {
                res.data = Some(id.content_type.clone());
                results.insert(res.key.clone(), res);
            }
        }

        return results;
    }

    results
}

/// Cache key for [`SniffContext`] entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SniffKey {
    pub path: String,
    pub function: String,
}

impl SniffKey {
    pub fn new(path: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            function: function.into(),
        }
    }
}

/// Request scoped cache used by sniffer factories to memoize compiled
/// schemas, paths and similar artifacts. Entries are appended, never
/// overwritten.
#[derive(Clone, Default)]
pub struct SniffContext {
    cache: Rc<RefCell<HashMap<SniffKey, Rc<dyn Any>>>>,
}

impl SniffContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a cached entry, if one of the right type is present.
    pub fn get<T: 'static>(&self, key: &SniffKey) -> Option<Rc<T>> {
        let cache = self.cache.borrow();
        cache.get(key).and_then(|any| any.clone().downcast().ok())
    }

    /// Store an entry under the key. An existing entry is kept untouched.
    pub fn cache<T: 'static>(&self, key: SniffKey, data: T) {
        self.cache
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| Rc::new(data));
    }
}
