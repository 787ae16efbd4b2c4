#![deny(unsafe_code)]

//! Schema-driven record mapping engine.
//!
//! Converts flat, tagged source records (each field an ordered list of
//! (code, value) subfields) into nested destination records conforming to a
//! target schema tree, under a declarative per-tag rule set. Array-of-object
//! boundaries are reconstructed on the fly from overwrite and fullness
//! signals; no "close this object" marker exists in the input.
//!
//! The crate is pure computation: no I/O, no global state. Rule sets,
//! schemas, and the transformation registry are shared read-only; each
//! [`MappingEngine`] owns its [`MigrationReport`].

pub mod engine;
pub mod entity;
pub mod evaluate;
pub mod path;
pub mod report;

pub use engine::{MappingEngine, dedupe_lists};
pub use entity::{AdmissionPolicy, Entity};
pub use evaluate::RuleKind;
pub use report::{DestinationTally, MigrationReport, SourceTally, topic};
