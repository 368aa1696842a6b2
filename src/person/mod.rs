//! The person import: record type, line mapping, database binding and the
//! name transformation.

pub mod model;

pub mod processor;

pub mod repository;

pub use model::{FIELD_NAMES, PERSON_COLUMNS, Person, PersonBinder, PersonFieldSetMapper};
pub use processor::UpperCaseNameProcessor;
