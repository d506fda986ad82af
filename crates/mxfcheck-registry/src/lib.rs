//! Universal label registry for MXF header metadata.
//!
//! Header metadata groups are pseudo-typed: the wire carries only ULs and
//! raw bytes, and the meaning of each local item comes from an external
//! registry of group and field descriptors. This crate provides:
//!
//! - [`DecodedValue`] - the sum type produced by field decoders, carrying
//!   reference kinds as explicit variants
//! - [`Registry`] / [`GroupDef`] / [`FieldDef`] - an injectable registry so
//!   tests can substitute small fakes
//! - [`Registry::builtin`] - a subset of the SMPTE structural metadata
//!   registry baked in at compile time
//! - [`decode`] - the primitive decoders the tables are built from
//!
//! Group map keys use the registered prototype form of each UL, with `7f`
//! at the version byte (byte 5), matching how lookups mask packet keys.
//!
//! The registry is incomplete by design: callers treat a missing group or
//! field as "skip this item", never as a fatal error.

pub mod decode;
mod descriptor;
mod tables;
mod value;

pub use descriptor::{DecodeFn, FieldDef, GroupDef, Registry};
pub use value::{DecodedValue, RefKind};

/// UL of the Instance-ID field present on every metadata group.
pub const INSTANCE_ID_UL: &str = "060e2b34.01010101.01011502.00000000";
