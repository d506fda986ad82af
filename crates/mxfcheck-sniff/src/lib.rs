//! Content sniffers for MXF essence payloads.
//!
//! Two handlers, each exposing a [`DataIdentifier`](mxfcheck_tree::DataIdentifier)
//! and sniffer factories that cache their compiled probes in a
//! [`SniffContext`](mxfcheck_tree::SniffContext):
//!
//! - [`xml`] - well-formedness identification via quick-xml, plus a path
//!   sniffer for the root element, its default namespace, or a simple
//!   absolute element path
//! - [`json`] - identification via serde_json, plus a JSON pointer sniffer
//!
//! ```
//! use mxfcheck_sniff::xml;
//! use mxfcheck_tree::{SniffContext, SniffTest};
//!
//! let sc = SniffContext::new();
//! let sniff_test = SniffTest {
//!     data_id: xml::identifier(),
//!     sniffs: vec![xml::path_sniffer(&sc, "/*"), xml::path_sniffer(&sc, xml::ROOT_NAMESPACE)],
//! };
//! # let _ = sniff_test;
//! ```

pub mod json;
pub mod xml;
