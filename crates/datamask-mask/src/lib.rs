//! Masking engine for datamask.
//!
//! Column rules are resolved to value providers once per table; rows are then
//! masked one at a time with per-row seeded randomness so that a fixed seed
//! reproduces the same output.

pub mod engine;
pub mod faker_rs;
pub mod providers;

pub use engine::{MaskingEngine, TableMasker};
pub use providers::{
    LookupProvider, ProviderFailure, SyntheticProvider, ValueProvider, ValueRequest,
    default_providers,
};
