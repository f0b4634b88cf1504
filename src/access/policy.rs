//! # Access Policy Declarations
//!
//! A guarded interface declares, once, a default policy and a table of
//! per-operation restrictions. The declaration is static type metadata:
//! it never depends on runtime configuration.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The mode a caller supplies when invoking a guarded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    None,
    Read,
    Write,
}

impl AccessMode {
    /// Whether this mode meets a restriction's required mode.
    ///
    /// `Write` implies `Read`; anything meets `None`.
    pub fn satisfies(self, required: AccessMode) -> bool {
        match required {
            AccessMode::None => true,
            AccessMode::Read => matches!(self, AccessMode::Read | AccessMode::Write),
            AccessMode::Write => self == AccessMode::Write,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::None => "none",
            AccessMode::Read => "read",
            AccessMode::Write => "write",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default policy for operations without an explicit restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    /// Reject every unmarked call
    Deny,
    /// Permit only `Read`-mode calls
    AllowRead,
    /// Permit every call
    AllowAll,
}

impl AccessPolicy {
    pub fn requirement(self) -> Requirement {
        match self {
            AccessPolicy::Deny => Requirement::Forbidden,
            AccessPolicy::AllowRead => Requirement::ReadOnly,
            AccessPolicy::AllowAll => Requirement::AtLeast(AccessMode::None),
        }
    }
}

/// Explicit per-operation restriction, overriding the default policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessRestriction {
    required: AccessMode,
}

impl AccessRestriction {
    pub fn new(required: AccessMode) -> Self {
        Self { required }
    }

    /// Callable by anyone, even under a `Deny` default
    pub fn open() -> Self {
        Self::new(AccessMode::None)
    }

    pub fn read() -> Self {
        Self::new(AccessMode::Read)
    }

    pub fn write() -> Self {
        Self::new(AccessMode::Write)
    }

    pub fn required(&self) -> AccessMode {
        self.required
    }
}

/// What an operation demands of the caller's mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Nothing is permitted
    Forbidden,
    /// Exactly `Read`
    ReadOnly,
    /// Any mode satisfying the given one
    AtLeast(AccessMode),
}

impl Requirement {
    pub fn permits(self, mode: AccessMode) -> bool {
        match self {
            Requirement::Forbidden => false,
            Requirement::ReadOnly => mode == AccessMode::Read,
            Requirement::AtLeast(required) => mode.satisfies(required),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Forbidden => f.write_str("no access (denied by default)"),
            Requirement::ReadOnly => f.write_str("read-only"),
            Requirement::AtLeast(mode) => f.write_str(mode.as_str()),
        }
    }
}

/// Static access declaration of one guarded interface
#[derive(Debug, Clone)]
pub struct AccessDeclaration {
    interface: &'static str,
    default_policy: AccessPolicy,
    restrictions: Vec<(&'static str, AccessRestriction)>,
}

impl AccessDeclaration {
    pub fn new(interface: &'static str, default_policy: AccessPolicy) -> Self {
        Self {
            interface,
            default_policy,
            restrictions: Vec::new(),
        }
    }

    /// Mark one operation with an explicit restriction.
    pub fn restrict(mut self, operation: &'static str, restriction: AccessRestriction) -> Self {
        self.restrictions.push((operation, restriction));
        self
    }

    pub fn interface(&self) -> &'static str {
        self.interface
    }

    /// Flatten into a lookup table. A later restriction on the same
    /// operation replaces an earlier one.
    pub fn resolve(&self) -> ResolvedPolicy {
        ResolvedPolicy {
            interface: self.interface,
            default_policy: self.default_policy,
            restrictions: self
                .restrictions
                .iter()
                .map(|(op, r)| (op.to_string(), *r))
                .collect(),
        }
    }
}

/// An interface type carrying an access declaration.
pub trait Guarded: 'static {
    fn access_declaration() -> AccessDeclaration;
}

/// Resolved, immutable capability table of one interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPolicy {
    interface: &'static str,
    default_policy: AccessPolicy,
    restrictions: HashMap<String, AccessRestriction>,
}

impl ResolvedPolicy {
    pub fn interface(&self) -> &'static str {
        self.interface
    }

    pub fn default_policy(&self) -> AccessPolicy {
        self.default_policy
    }

    pub fn restriction(&self, operation: &str) -> Option<AccessRestriction> {
        self.restrictions.get(operation).copied()
    }

    /// Requirement for one operation: its restriction, else the default.
    pub fn requirement(&self, operation: &str) -> Requirement {
        match self.restrictions.get(operation) {
            Some(restriction) => Requirement::AtLeast(restriction.required()),
            None => self.default_policy.requirement(),
        }
    }

    pub fn permits(&self, operation: &str, mode: AccessMode) -> bool {
        self.requirement(operation).permits(mode)
    }
}
