//! targeted-id core library.
//!
//! This crate derives pseudonymous, per-relying-party identifiers
//! ("eduPersonTargetedID"-style values) inside an identity provider's
//! attribute-release pipeline: layered configuration resolution, ordered
//! attribute-path lookup, regex admission filters, and salted-hash token
//! derivation, with optional structured name-identifier output.

pub mod config;
pub mod derive;
pub mod errors;
pub mod events;
pub mod filter;
pub mod generator;
pub mod hash;
pub mod nameid;
pub mod state;

// Re-exports for convenience.
pub use config::{EffectiveConfig, ModuleConfig};
pub use errors::ConfigError;
pub use generator::{TargetedIdGenerator, OUTPUT_ATTRIBUTE};
pub use hash::HashAlgorithm;
pub use state::RequestState;
