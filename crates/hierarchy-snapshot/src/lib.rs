//! Point-in-time capture of a live UI hierarchy.
//!
//! [`SnapshotBuilder`] walks a [`LiveHierarchy`] once into an arena-backed
//! [`SnapshotTree`] whose attributes are faulted in lazily, and
//! [`Document`] renders that tree into an addressable markup document.

pub mod attributes;
pub mod builder;
pub mod document;
pub mod errors;
pub mod kinds;
pub mod memory;
pub mod model;
pub mod ports;

pub use attributes::{
    aliases, canonical_bool, canonical_number, canonicalize, name_for, protocol_names,
    Attribute, AttributeSet, CanonicalValue, NativeValue, RECT_FIELDS,
};
pub use builder::SnapshotBuilder;
pub use document::{DocNode, Document, XmlOptions, INDEX_PATH_ATTRIBUTE};
pub use errors::SnapshotError;
pub use kinds::ElementKind;
pub use memory::{
    load_fixture, parse_fixture_str, FixtureError, FixtureNode, MemHandle, MemoryHierarchy,
};
pub use model::{NodeId, PartialCapture, SnapshotNode, SnapshotTree};
pub use ports::{HostError, LiveHierarchy};
