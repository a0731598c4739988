//! ilpfx-core
//!
//! Core library for prefixing the namespaces of compiled .NET IL assemblies.
//!
//! This crate defines the data model (binaries, IL dumps, rewrite maps),
//! toolchain discovery and process invocation for ildasm/ilasm, and the
//! pipeline stages that disassemble a binary, rewrite its namespaces and
//! known-bad literals, and reassemble it under a new prefix.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, build scripts, etc.).

pub mod model;
pub mod pipeline;
pub mod toolchain;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
