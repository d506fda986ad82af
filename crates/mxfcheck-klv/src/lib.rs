//! KLV framing primitives for MXF byte streams.
//!
//! MXF files are a sequence of KLV triplets: a 16-byte universal label key,
//! a BER-encoded length and the value bytes. This crate provides:
//!
//! - [`Klv`] - one decoded packet, keeping the raw length bytes
//! - [`stream_klv`] - a blocking reader that feeds packets into a bounded
//!   channel, for use as the producer half of a parsing pipeline
//! - [`ber_decode`] - BER short/long form length decoding
//! - [`full_name`] / [`full_name_masked`] - the canonical dotted-hex
//!   rendering of a universal label, with optional `7f` wildcard bytes
//!
//! # Example
//!
//! ```
//! use mxfcheck_klv::full_name;
//!
//! let key = [
//!     0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01,
//!     0x0d, 0x01, 0x02, 0x01, 0x01, 0x02, 0x04, 0x00,
//! ];
//! assert_eq!(full_name(&key), "060e2b34.02050101.0d010201.01020400");
//! ```

mod error;
mod packet;
mod reader;
mod ul;

pub use error::{KlvError, Result};
pub use packet::{ber_decode, Klv};
pub use reader::stream_klv;
pub use ul::{full_name, full_name_masked};
