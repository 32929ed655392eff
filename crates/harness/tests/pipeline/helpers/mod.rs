//! Shared pipeline test helpers.

pub mod predicates;
pub mod testdata;
