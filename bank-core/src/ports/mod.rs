//! Port definitions
//!
//! Ports define the capabilities records expose to the rest of the crate.
//! Records depend on the executor only through these traits' signatures.

mod persist;

pub use persist::Persist;
