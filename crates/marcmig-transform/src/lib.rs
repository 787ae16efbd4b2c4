//! Named value-transformation pipeline for the record mapping engine.
//!
//! Mapping rules name their transformations; this crate resolves those names
//! through a [`TransformRegistry`] and ships the built-in pure string
//! transformations the default rule documents use. Integrations register
//! their own transformations on top.

pub mod builtin;
pub mod registry;

pub use registry::{Parameter, TransformFn, TransformRegistry};
