//! # Models
//!
//! Read-only descriptions of the system handed to the engine by its caller:
//! per-atom masses and backbone descriptors ([`system`]) and the partition of
//! atoms into diagonalization blocks ([`block`]).

pub mod block;
pub mod system;
