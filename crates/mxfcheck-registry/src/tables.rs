//! Built-in registry tables.
//!
//! A subset of the SMPTE ST 377-1 structural metadata registry: the groups
//! and fields needed to stitch the header metadata object graph (instance
//! IDs, strong reference sets, package/track/sequence structure) plus a few
//! widely used descriptors. Group keys carry `7f` at byte 5, the registered
//! prototype form.

use phf::phf_set;

use crate::decode;
use crate::DecodeFn;

pub(crate) struct StaticField {
    pub name: &'static str,
    pub ul: &'static str,
    pub decode: DecodeFn,
}

pub(crate) struct StaticGroup {
    pub ul: &'static str,
    pub name: &'static str,
    pub fields: &'static [StaticField],
}

const INSTANCE_ID: StaticField = StaticField {
    name: "InstanceID",
    ul: "060e2b34.01010101.01011502.00000000",
    decode: decode::decode_uuid,
};

const GENERATION_ID: StaticField = StaticField {
    name: "GenerationID",
    ul: "060e2b34.01010102.05200701.08000000",
    decode: decode::decode_auid,
};

static PREFACE_FIELDS: &[StaticField] = &[
    INSTANCE_ID,
    GENERATION_ID,
    StaticField {
        name: "FileLastModified",
        ul: "060e2b34.01010102.07020110.02040000",
        decode: decode::decode_timestamp,
    },
    StaticField {
        name: "FormatVersion",
        ul: "060e2b34.01010102.03010201.05000000",
        decode: decode::decode_version,
    },
    StaticField {
        name: "ObjectModelVersion",
        ul: "060e2b34.01010102.03010201.04000000",
        decode: decode::decode_u32,
    },
    StaticField {
        name: "PrimaryPackage",
        ul: "060e2b34.01010104.06010104.01080000",
        decode: decode::decode_weak_ref,
    },
    StaticField {
        name: "IdentificationList",
        ul: "060e2b34.01010102.06010104.06040000",
        decode: decode::decode_strong_ref_batch,
    },
    StaticField {
        name: "ContentStorageObject",
        ul: "060e2b34.01010102.06010104.02010000",
        decode: decode::decode_strong_ref,
    },
    StaticField {
        name: "OperationalPattern",
        ul: "060e2b34.01010105.01020203.00000000",
        decode: decode::decode_auid,
    },
    StaticField {
        name: "EssenceContainers",
        ul: "060e2b34.01010105.01020210.02010000",
        decode: decode::decode_weak_ref_batch,
    },
    StaticField {
        name: "DescriptiveSchemes",
        ul: "060e2b34.01010105.01020210.02020000",
        decode: decode::decode_weak_ref_batch,
    },
];

static IDENTIFICATION_FIELDS: &[StaticField] = &[
    INSTANCE_ID,
    StaticField {
        name: "ThisGenerationID",
        ul: "060e2b34.01010102.05200701.01000000",
        decode: decode::decode_auid,
    },
    StaticField {
        name: "ApplicationSupplierName",
        ul: "060e2b34.01010102.05200701.02010000",
        decode: decode::decode_utf16,
    },
    StaticField {
        name: "ApplicationName",
        ul: "060e2b34.01010102.05200701.03010000",
        decode: decode::decode_utf16,
    },
    StaticField {
        name: "ApplicationVersionString",
        ul: "060e2b34.01010102.05200701.05010000",
        decode: decode::decode_utf16,
    },
    StaticField {
        name: "ApplicationProductID",
        ul: "060e2b34.01010102.05200701.07000000",
        decode: decode::decode_auid,
    },
    StaticField {
        name: "FileModificationDate",
        ul: "060e2b34.01010102.07020110.02030000",
        decode: decode::decode_timestamp,
    },
];

static CONTENT_STORAGE_FIELDS: &[StaticField] = &[
    INSTANCE_ID,
    StaticField {
        name: "Packages",
        ul: "060e2b34.01010102.06010104.05010000",
        decode: decode::decode_strong_ref_batch,
    },
    StaticField {
        name: "EssenceDataObjects",
        ul: "060e2b34.01010102.06010104.05020000",
        decode: decode::decode_strong_ref_batch,
    },
];

static ESSENCE_DATA_FIELDS: &[StaticField] = &[
    INSTANCE_ID,
    StaticField {
        name: "LinkedPackageID",
        ul: "060e2b34.01010102.06010106.01000000",
        decode: decode::decode_bytes,
    },
    StaticField {
        name: "IndexSID",
        ul: "060e2b34.01010104.01030405.00000000",
        decode: decode::decode_u32,
    },
    StaticField {
        name: "BodySID",
        ul: "060e2b34.01010104.01030404.00000000",
        decode: decode::decode_u32,
    },
];

static PACKAGE_FIELDS: &[StaticField] = &[
    INSTANCE_ID,
    StaticField {
        name: "PackageID",
        ul: "060e2b34.01010101.01011510.00000000",
        decode: decode::decode_bytes,
    },
    StaticField {
        name: "PackageName",
        ul: "060e2b34.01010103.01030302.01000000",
        decode: decode::decode_utf16,
    },
    StaticField {
        name: "PackageTracks",
        ul: "060e2b34.01010102.06010104.06050000",
        decode: decode::decode_strong_ref_batch,
    },
    StaticField {
        name: "CreationTime",
        ul: "060e2b34.01010102.07020110.01030000",
        decode: decode::decode_timestamp,
    },
    StaticField {
        name: "PackageLastModified",
        ul: "060e2b34.01010102.07020110.02050000",
        decode: decode::decode_timestamp,
    },
    StaticField {
        name: "EssenceDescription",
        ul: "060e2b34.01010102.06010104.02030000",
        decode: decode::decode_strong_ref,
    },
];

static TRACK_FIELDS: &[StaticField] = &[
    INSTANCE_ID,
    StaticField {
        name: "TrackID",
        ul: "060e2b34.01010102.01070101.00000000",
        decode: decode::decode_u32,
    },
    StaticField {
        name: "EssenceTrackNumber",
        ul: "060e2b34.01010102.01040103.00000000",
        decode: decode::decode_u32,
    },
    StaticField {
        name: "TrackName",
        ul: "060e2b34.01010102.01070102.01000000",
        decode: decode::decode_utf16,
    },
    StaticField {
        name: "TrackSegment",
        ul: "060e2b34.01010102.06010104.02040000",
        decode: decode::decode_strong_ref,
    },
    StaticField {
        name: "EditRate",
        ul: "060e2b34.01010102.05300405.00000000",
        decode: decode::decode_rational,
    },
    StaticField {
        name: "Origin",
        ul: "060e2b34.01010102.07020103.01030000",
        decode: decode::decode_u64,
    },
];

static SEQUENCE_FIELDS: &[StaticField] = &[
    INSTANCE_ID,
    StaticField {
        name: "ComponentDataDefinition",
        ul: "060e2b34.01010102.04070100.00000000",
        decode: decode::decode_auid,
    },
    StaticField {
        name: "ComponentLength",
        ul: "060e2b34.01010102.07020201.01030000",
        decode: decode::decode_u64,
    },
    StaticField {
        name: "ComponentObjects",
        ul: "060e2b34.01010102.06010104.06090000",
        decode: decode::decode_strong_ref_batch,
    },
];

static SOURCE_CLIP_FIELDS: &[StaticField] = &[
    INSTANCE_ID,
    StaticField {
        name: "StartPosition",
        ul: "060e2b34.01010102.07020103.01040000",
        decode: decode::decode_u64,
    },
    StaticField {
        name: "SourcePackageID",
        ul: "060e2b34.01010102.06010103.01000000",
        decode: decode::decode_bytes,
    },
    StaticField {
        name: "SourceTrackID",
        ul: "060e2b34.01010102.06010103.02000000",
        decode: decode::decode_u32,
    },
];

static DATA_DESCRIPTOR_FIELDS: &[StaticField] = &[
    INSTANCE_ID,
    StaticField {
        name: "SampleRate",
        ul: "060e2b34.01010101.04060101.00000000",
        decode: decode::decode_rational,
    },
    StaticField {
        name: "ContainerFormat",
        ul: "060e2b34.01010102.06010104.01020000",
        decode: decode::decode_weak_ref,
    },
    StaticField {
        name: "LinkedTrackID",
        ul: "060e2b34.01010105.06010103.05000000",
        decode: decode::decode_u32,
    },
    StaticField {
        name: "DataEssenceCoding",
        ul: "060e2b34.01010105.04030302.00000000",
        decode: decode::decode_auid,
    },
    StaticField {
        name: "NamespaceURI",
        ul: "060e2b34.0101010c.04060908.00000000",
        decode: decode::decode_utf16,
    },
];

pub(crate) static GROUPS: &[StaticGroup] = &[
    StaticGroup {
        ul: "060e2b34.027f0101.0d010101.01012f00",
        name: "Preface",
        fields: PREFACE_FIELDS,
    },
    StaticGroup {
        ul: "060e2b34.027f0101.0d010101.01013000",
        name: "Identification",
        fields: IDENTIFICATION_FIELDS,
    },
    StaticGroup {
        ul: "060e2b34.027f0101.0d010101.01011800",
        name: "ContentStorage",
        fields: CONTENT_STORAGE_FIELDS,
    },
    StaticGroup {
        ul: "060e2b34.027f0101.0d010101.01012300",
        name: "EssenceContainerData",
        fields: ESSENCE_DATA_FIELDS,
    },
    StaticGroup {
        ul: "060e2b34.027f0101.0d010101.01013600",
        name: "MaterialPackage",
        fields: PACKAGE_FIELDS,
    },
    StaticGroup {
        ul: "060e2b34.027f0101.0d010101.01013700",
        name: "SourcePackage",
        fields: PACKAGE_FIELDS,
    },
    StaticGroup {
        ul: "060e2b34.027f0101.0d010101.01013a00",
        name: "StaticTrack",
        fields: TRACK_FIELDS,
    },
    StaticGroup {
        ul: "060e2b34.027f0101.0d010101.01013b00",
        name: "TimelineTrack",
        fields: TRACK_FIELDS,
    },
    StaticGroup {
        ul: "060e2b34.027f0101.0d010101.01010f00",
        name: "Sequence",
        fields: SEQUENCE_FIELDS,
    },
    StaticGroup {
        ul: "060e2b34.027f0101.0d010101.01011100",
        name: "SourceClip",
        fields: SOURCE_CLIP_FIELDS,
    },
    StaticGroup {
        ul: "060e2b34.027f0101.0d010101.01014300",
        name: "GenericDataEssenceDescriptor",
        fields: DATA_DESCRIPTOR_FIELDS,
    },
    StaticGroup {
        ul: "060e2b34.027f0105.0e090607.01010103",
        name: "ISXDDescriptor",
        fields: DATA_DESCRIPTOR_FIELDS,
    },
];

/// Known essence container keys, including the `7f` wildcard family forms
/// matched after masking bytes 15 and 13 of a packet key.
pub(crate) static ESSENCE: phf::Set<&'static str> = phf_set! {
    // generic stream data element
    "060e2b34.0101010c.0d010509.01000000",
    // frame wrapped ISXD data, family form
    "060e2b34.01020105.0e090502.017f017f",
    // generic container picture element, family form
    "060e2b34.01020101.0d010301.157f057f",
    // generic container sound element, family form
    "060e2b34.01020101.0d010301.167f017f",
    // generic container data element, family form
    "060e2b34.01020101.0d010301.177f017f",
};
