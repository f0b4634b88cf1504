//! # Access Control
//!
//! Declarative capability checks for manifest interfaces.
//!
//! ## Rules
//! - An operation with an explicit restriction always uses it
//! - Unmarked operations fall back to the interface's default policy:
//!   `Deny` rejects everything, `AllowRead` permits only `Read`-mode calls,
//!   `AllowAll` permits everything
//! - Declarations are resolved once per type and cached
//! - Denials are reported, never retried

mod errors;
mod gate;
mod policy;

pub use errors::{AccessError, AccessResult};
pub use gate::AccessGate;
pub use policy::{
    AccessDeclaration, AccessMode, AccessPolicy, AccessRestriction, Guarded, Requirement,
    ResolvedPolicy,
};
