//! User roles.
//!
//! [`Role`] mirrors the backend's role tag. Tags the dashboard does not know
//! are kept as [`Role::Unknown`] instead of failing deserialization, so a new
//! backend role never locks users out of the directory listing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a directory user.
///
/// # Variants
///
/// | Variant | Tag | Restricted |
/// |---------|-----|------------|
/// | `GeneralAdmin` | `general_admin` | no |
/// | `AccountAdmin` | `account_admin` | yes |
/// | `BranchAdmin` | `branch_admin` | yes |
/// | `Inspector` | `inspector` | yes |
/// | `Unknown` | anything else | no |
///
/// Restricted roles are subject to the path policy table. Everything else
/// is unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    GeneralAdmin,
    AccountAdmin,
    BranchAdmin,
    Inspector,
    /// A tag not known to this build.
    Unknown(String),
}

impl Role {
    /// Restricted roles, in the order the navigation gate checks them.
    pub const RESTRICTED: [Role; 3] = [Role::AccountAdmin, Role::BranchAdmin, Role::Inspector];

    /// Parses a role tag. Never fails: unrecognized tags become [`Role::Unknown`].
    ///
    /// Surrounding whitespace is ignored and matching is case-insensitive.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        let trimmed = tag.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "general_admin" => Self::GeneralAdmin,
            "account_admin" => Self::AccountAdmin,
            "branch_admin" => Self::BranchAdmin,
            "inspector" => Self::Inspector,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }

    /// Returns the wire tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::GeneralAdmin => "general_admin",
            Self::AccountAdmin => "account_admin",
            Self::BranchAdmin => "branch_admin",
            Self::Inspector => "inspector",
            Self::Unknown(tag) => tag,
        }
    }

    /// Returns `true` for roles gated by the path policy table.
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        matches!(self, Self::AccountAdmin | Self::BranchAdmin | Self::Inspector)
    }

    /// Human label as shown by the backend admin.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::GeneralAdmin => "Administrador general",
            Self::AccountAdmin => "Administrador de cuentas",
            Self::BranchAdmin => "Administrador de sucursal",
            Self::Inspector => "Inspector",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<String> for Role {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<&str> for Role {
    fn from(tag: &str) -> Self {
        Self::parse(tag)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
