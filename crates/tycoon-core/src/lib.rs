#![deny(warnings)]

//! Core records for Phone Tycoon's generated content.
//!
//! This crate defines the typed requests and results exchanged with the
//! generation pipeline, the declarative schemas every result must satisfy,
//! and the injectable randomness used by local generators.

pub mod model;
pub mod random;
pub mod schema;

pub use model::*;
pub use random::{RandomExt, RandomSource, ScriptedRandom, SeededRandom};
pub use schema::{
    defined_count, is_well_formed_id, validate, validate_kind, CrossFieldRule, FieldKind, FieldSpec,
    OutputSchema, Violation, ID_MIN_SUFFIX,
};
