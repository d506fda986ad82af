//! Registry and descriptor types.

use std::collections::{HashMap, HashSet};

use crate::tables;
use crate::DecodedValue;

/// Decoder function for a single field.
pub type DecodeFn = fn(&[u8]) -> DecodedValue;

/// One field of a metadata group.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name used as the key of decoded group maps.
    pub name: String,
    /// Full UL of the field.
    pub ul: String,
    /// Decoder for the field's value bytes.
    pub decode: DecodeFn,
}

/// A metadata group: its name and field descriptors.
#[derive(Debug, Clone, Default)]
pub struct GroupDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl GroupDef {
    /// Look up a field descriptor by its full UL.
    pub fn field(&self, ul: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.ul == ul)
    }
}

/// Registry of known groups and essence container keys.
///
/// Injected into the tree builder rather than read from a process global so
/// unit tests can substitute small fakes. Group keys are stored in the
/// registered prototype form (`7f` at byte 5).
#[derive(Debug, Clone, Default)]
pub struct Registry {
    groups: HashMap<String, GroupDef>,
    essence: HashSet<String>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in subset of the SMPTE structural metadata registry.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        for group in tables::GROUPS {
            reg.add_group(
                group.ul,
                GroupDef {
                    name: group.name.to_string(),
                    fields: group
                        .fields
                        .iter()
                        .map(|f| FieldDef {
                            name: f.name.to_string(),
                            ul: f.ul.to_string(),
                            decode: f.decode,
                        })
                        .collect(),
                },
            );
        }
        for ul in tables::ESSENCE.iter() {
            reg.add_essence(*ul);
        }
        reg
    }

    /// Register a group under its UL string.
    pub fn add_group(&mut self, ul: impl Into<String>, group: GroupDef) {
        self.groups.insert(ul.into(), group);
    }

    /// Register a known essence container key.
    pub fn add_essence(&mut self, ul: impl Into<String>) {
        self.essence.insert(ul.into());
    }

    /// Look up a group by UL string, exact match only; callers apply any
    /// wildcard masking before the lookup.
    pub fn group(&self, ul: &str) -> Option<&GroupDef> {
        self.groups.get(ul)
    }

    /// Whether the UL names a known essence key.
    pub fn is_essence(&self, ul: &str) -> bool {
        self.essence.contains(ul)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;

    #[test]
    fn builtin_knows_structural_groups() {
        let reg = Registry::builtin();

        let preface = reg
            .group("060e2b34.027f0101.0d010101.01012f00")
            .expect("preface registered");
        assert_eq!(preface.name, "Preface");
        assert!(preface
            .field("060e2b34.01010102.06010104.02010000")
            .is_some());

        assert!(reg.group("060e2b34.027f0101.0d010101.01011800").is_some());
        assert!(reg.group("deadbeef.00000000.00000000.00000000").is_none());
    }

    #[test]
    fn builtin_knows_essence_keys() {
        let reg = Registry::builtin();
        assert!(reg.is_essence("060e2b34.0101010c.0d010509.01000000"));
        assert!(!reg.is_essence("060e2b34.00000000.00000000.00000000"));
    }

    #[test]
    fn fake_registries_are_buildable() {
        let mut reg = Registry::new();
        reg.add_group(
            "060e2b34.027f0101.0d010101.01010100",
            GroupDef {
                name: "Fake".to_string(),
                fields: vec![FieldDef {
                    name: "Child".to_string(),
                    ul: "060e2b34.01010102.06010104.02040000".to_string(),
                    decode: decode::decode_strong_ref,
                }],
            },
        );

        let group = reg.group("060e2b34.027f0101.0d010101.01010100").unwrap();
        assert_eq!(group.name, "Fake");
        assert!(group.field("060e2b34.01010102.06010104.02040000").is_some());
        assert!(group.field("unknown").is_none());
    }
}
