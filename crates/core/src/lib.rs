//! ilnorm-core
//!
//! Core library for producing a deterministic, comparable IL disassembly of a
//! managed module.
//!
//! This crate owns the whole pipeline: workspace lifecycle, provisioning and
//! invoking the external disassembler, the line-normalization rules that strip
//! build noise, and collecting the resulting artifacts. Frontends (the CLI)
//! only wire configuration into it.

pub mod config;
pub mod normalize;
pub mod services;
pub mod workspace;

pub use config::DisassemblerConfig;
pub use services::disassembly::{
    DisassemblyBackend, DisassemblyError, DisassemblyRequest, DisassemblyResult, Disassembler,
};

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
