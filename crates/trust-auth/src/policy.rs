//! Role policy table.
//!
//! Each restricted role owns two prefix lists:
//!
//! 1. **Blocked prefixes**: always denied, checked first
//! 2. **Allowed prefixes**: the only routes the role may reach
//!
//! A path is reachable by a restricted role if and only if it matches no
//! blocked prefix and at least one allowed prefix. Roles without an entry
//! are unrestricted.
//!
//! # Built-in Table
//!
//! | Role | Sees | Cannot create / schedule |
//! |------|------|-------------------------|
//! | `account_admin` | branches, areas, dispensers, products, calendar, visits, incidents | branches, areas, visits, incidents, incident scheduling |
//! | `branch_admin` | areas, dispensers, products, calendar, visits, incidents | branches (at all), areas, visits, incident scheduling |
//! | `inspector` | calendar, visits, incidents | visits, incidents |
//!
//! All three may reach `/dashboard`.

use crate::error::PolicyError;
use crate::prefix::{first_match, matches_any};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use trust_types::Role;

/// Blocked paths for `account_admin`.
pub const ACCOUNT_ADMIN_BLOCKED_PATH_PREFIXES: &[&str] = &[
    "/clientes/sucursales/nueva",
    "/clientes/areas/nueva",
    "/clientes/calendario/nueva",
    "/clientes/incidencias/nueva",
    "/clientes/incidencias/agendar",
];

/// Allowed paths for `account_admin`.
pub const ACCOUNT_ADMIN_ALLOWED_PATH_PREFIXES: &[&str] = &[
    "/dashboard",
    "/clientes/sucursales",
    "/clientes/areas",
    "/clientes/dispensadores",
    "/clientes/productos",
    "/clientes/calendario",
    "/clientes/visitas",
    "/clientes/incidencias",
];

/// Blocked paths for `branch_admin`.
pub const BRANCH_ADMIN_BLOCKED_PATH_PREFIXES: &[&str] = &[
    "/clientes/sucursales",
    "/clientes/areas/nueva",
    "/clientes/calendario/nueva",
    "/clientes/incidencias/agendar",
];

/// Allowed paths for `branch_admin`.
pub const BRANCH_ADMIN_ALLOWED_PATH_PREFIXES: &[&str] = &[
    "/dashboard",
    "/clientes/areas",
    "/clientes/dispensadores",
    "/clientes/productos",
    "/clientes/calendario",
    "/clientes/visitas",
    "/clientes/incidencias",
];

/// Blocked paths for `inspector`.
pub const INSPECTOR_BLOCKED_PATH_PREFIXES: &[&str] =
    &["/clientes/calendario/nueva", "/clientes/incidencias/nueva"];

/// Allowed paths for `inspector`.
pub const INSPECTOR_ALLOWED_PATH_PREFIXES: &[&str] = &[
    "/dashboard",
    "/clientes/calendario",
    "/clientes/visitas",
    "/clientes/incidencias",
];

/// Blocked and allowed prefixes for one role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathPolicy {
    /// Checked first; any match denies.
    pub blocked: Vec<String>,
    /// A path must match one of these to be allowed.
    pub allowed: Vec<String>,
}

impl PathPolicy {
    /// Builds a policy from static lists.
    #[must_use]
    pub fn from_static(blocked: &[&str], allowed: &[&str]) -> Self {
        Self {
            blocked: blocked.iter().map(|p| (*p).to_string()).collect(),
            allowed: allowed.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Builds a policy, rejecting prefixes that cannot be matched.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidPrefix`] for a prefix that is empty,
    /// does not start with `/`, ends with `/`, or is `/` itself.
    pub fn new(blocked: Vec<String>, allowed: Vec<String>) -> Result<Self, PolicyError> {
        for prefix in blocked.iter().chain(allowed.iter()) {
            validate_prefix(prefix)?;
        }
        Ok(Self { blocked, allowed })
    }

    /// Returns `true` if `path` matches a blocked prefix.
    #[must_use]
    pub fn is_blocked(&self, path: &str) -> bool {
        matches_any(path, &self.blocked)
    }

    /// Returns `true` if the path is reachable under this policy.
    ///
    /// Blocked membership wins over allowed membership.
    #[must_use]
    pub fn is_allowed(&self, path: &str) -> bool {
        if self.is_blocked(path) {
            return false;
        }
        matches_any(path, &self.allowed)
    }

    /// Returns the blocked prefix responsible for a denial, if any.
    #[must_use]
    pub fn blocking_prefix(&self, path: &str) -> Option<&str> {
        first_match(path, &self.blocked)
    }
}

fn validate_prefix(prefix: &str) -> Result<(), PolicyError> {
    if !prefix.starts_with('/') {
        return Err(PolicyError::invalid_prefix(prefix, "must start with '/'"));
    }
    if prefix == "/" {
        return Err(PolicyError::invalid_prefix(prefix, "'/' would match every path"));
    }
    if prefix.ends_with('/') {
        return Err(PolicyError::invalid_prefix(prefix, "must not end with '/'"));
    }
    Ok(())
}

/// Maps restricted roles to their [`PathPolicy`].
///
/// # Example
///
/// ```
/// use trust_auth::RolePolicyTable;
/// use trust_types::Role;
///
/// let table = RolePolicyTable::builtin();
///
/// // Blocked sub-path inside an allowed prefix
/// assert!(!table.is_path_allowed(Some(&Role::AccountAdmin), "/clientes/sucursales/nueva"));
/// assert!(table.is_path_allowed(Some(&Role::AccountAdmin), "/clientes/sucursales"));
///
/// // Unrestricted roles reach everything
/// assert!(table.is_path_allowed(Some(&Role::GeneralAdmin), "/ajustes"));
/// assert!(table.is_path_allowed(None, "/ajustes"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePolicyTable {
    entries: HashMap<Role, PathPolicy>,
}

impl RolePolicyTable {
    /// Returns a table with no restricted roles.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the built-in table.
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            Role::AccountAdmin,
            PathPolicy::from_static(
                ACCOUNT_ADMIN_BLOCKED_PATH_PREFIXES,
                ACCOUNT_ADMIN_ALLOWED_PATH_PREFIXES,
            ),
        );
        entries.insert(
            Role::BranchAdmin,
            PathPolicy::from_static(
                BRANCH_ADMIN_BLOCKED_PATH_PREFIXES,
                BRANCH_ADMIN_ALLOWED_PATH_PREFIXES,
            ),
        );
        entries.insert(
            Role::Inspector,
            PathPolicy::from_static(
                INSPECTOR_BLOCKED_PATH_PREFIXES,
                INSPECTOR_ALLOWED_PATH_PREFIXES,
            ),
        );
        Self { entries }
    }

    /// Replaces the policy of a restricted role.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::UnrestrictedRole`] for `general_admin` and
    /// unknown roles. Those bypass the table by definition.
    pub fn with_policy(mut self, role: Role, policy: PathPolicy) -> Result<Self, PolicyError> {
        if !role.is_restricted() {
            return Err(PolicyError::UnrestrictedRole(role));
        }
        self.entries.insert(role, policy);
        Ok(self)
    }

    /// Returns the policy for a role, or `None` if the role is unrestricted.
    #[must_use]
    pub fn policy(&self, role: &Role) -> Option<&PathPolicy> {
        self.entries.get(role)
    }

    /// Returns `true` if `role` is gated by this table.
    #[must_use]
    pub fn restricts(&self, role: &Role) -> bool {
        self.entries.contains_key(role)
    }

    /// Decides whether `role` may reach `path`.
    ///
    /// `None` and roles without an entry are unrestricted.
    #[must_use]
    pub fn is_path_allowed(&self, role: Option<&Role>, path: &str) -> bool {
        match role.and_then(|r| self.policy(r)) {
            Some(policy) => policy.is_allowed(path),
            None => true,
        }
    }
}

fn builtin_table() -> &'static RolePolicyTable {
    static TABLE: OnceLock<RolePolicyTable> = OnceLock::new();
    TABLE.get_or_init(RolePolicyTable::builtin)
}

/// Built-in `account_admin` check.
#[must_use]
pub fn is_account_admin_allowed_path(path: &str) -> bool {
    builtin_table().is_path_allowed(Some(&Role::AccountAdmin), path)
}

/// Built-in `branch_admin` check.
#[must_use]
pub fn is_branch_admin_allowed_path(path: &str) -> bool {
    builtin_table().is_path_allowed(Some(&Role::BranchAdmin), path)
}

/// Built-in `inspector` check.
#[must_use]
pub fn is_inspector_allowed_path(path: &str) -> bool {
    builtin_table().is_path_allowed(Some(&Role::Inspector), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn account_admin_paths() {
        assert!(is_account_admin_allowed_path("/dashboard"));
        assert!(is_account_admin_allowed_path("/clientes/sucursales/4"));
        assert!(!is_account_admin_allowed_path("/clientes/sucursales/nueva"));
        assert!(!is_account_admin_allowed_path("/clientes/incidencias/agendar"));
        assert!(!is_account_admin_allowed_path("/clientes"));
        assert!(!is_account_admin_allowed_path("/ajustes"));
    }

    #[test]
    fn branch_admin_paths() {
        assert!(!is_branch_admin_allowed_path("/clientes/sucursales"));
        assert!(!is_branch_admin_allowed_path("/clientes/sucursales/9"));
        assert!(is_branch_admin_allowed_path("/clientes/areas/3"));
        assert!(!is_branch_admin_allowed_path("/clientes/areas/nueva"));
        assert!(is_branch_admin_allowed_path("/clientes/incidencias/nueva"));
        assert!(!is_branch_admin_allowed_path("/clientes/incidencias/agendar"));
    }

    #[test]
    fn inspector_paths() {
        assert!(is_inspector_allowed_path("/clientes/calendario"));
        assert!(is_inspector_allowed_path("/clientes/visitas/12/realizar"));
        assert!(is_inspector_allowed_path("/clientes/incidencias/agendar"));
        assert!(!is_inspector_allowed_path("/clientes/calendario/nueva"));
        assert!(!is_inspector_allowed_path("/clientes/productos"));
    }

    #[test]
    fn default_path_reachable_by_every_restricted_role() {
        let table = RolePolicyTable::builtin();
        for role in Role::RESTRICTED {
            assert!(table.is_path_allowed(Some(&role), "/dashboard"), "{role}");
        }
    }

    #[test]
    fn blocking_prefix_reports_cause() {
        let table = RolePolicyTable::builtin();
        let policy = table.policy(&Role::AccountAdmin).unwrap();
        assert_eq!(
            policy.blocking_prefix("/clientes/areas/nueva"),
            Some("/clientes/areas/nueva")
        );
        assert_eq!(policy.blocking_prefix("/clientes/areas"), None);
    }

    #[test]
    fn with_policy_replaces_entry() {
        let table = RolePolicyTable::builtin()
            .with_policy(
                Role::Inspector,
                PathPolicy::new(vec![], vec!["/clientes/productos".into()]).unwrap(),
            )
            .unwrap();
        assert!(table.is_path_allowed(Some(&Role::Inspector), "/clientes/productos"));
        assert!(!table.is_path_allowed(Some(&Role::Inspector), "/dashboard"));
    }

    #[test]
    fn with_policy_rejects_unrestricted_role() {
        let result = RolePolicyTable::builtin().with_policy(Role::GeneralAdmin, PathPolicy::default());
        assert!(matches!(result, Err(PolicyError::UnrestrictedRole(_))));
    }

    #[test]
    fn invalid_prefixes_rejected() {
        for bad in ["clientes", "/", "/clientes/", ""] {
            let result = PathPolicy::new(vec![bad.to_string()], vec![]);
            assert!(result.is_err(), "{bad:?} should be rejected");
        }
    }

    fn restricted_role() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::AccountAdmin),
            Just(Role::BranchAdmin),
            Just(Role::Inspector),
        ]
    }

    fn path_suffix() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), "(/[a-z0-9-]{1,8}){1,3}"]
    }

    proptest! {
        #[test]
        fn blocked_prefix_always_denies(role in restricted_role(), pick in 0usize..8, suffix in path_suffix()) {
            let table = RolePolicyTable::builtin();
            let policy = table.policy(&role).unwrap();
            let prefix = &policy.blocked[pick % policy.blocked.len()];
            let path = format!("{prefix}{suffix}");
            prop_assert!(!table.is_path_allowed(Some(&role), &path));
        }

        #[test]
        fn unrestricted_roles_reach_every_path(path in "(/[a-z0-9-]{0,10}){0,4}", tag in "[a-z_]{1,12}") {
            let table = RolePolicyTable::builtin();
            let unknown = Role::parse(&tag);
            prop_assume!(!unknown.is_restricted());
            prop_assert!(table.is_path_allowed(None, &path));
            prop_assert!(table.is_path_allowed(Some(&Role::GeneralAdmin), &path));
            prop_assert!(table.is_path_allowed(Some(&unknown), &path));
        }

        #[test]
        fn allowed_iff_not_blocked_and_allowed(role in restricted_role(), path in "(/[a-z]{1,12}){1,4}") {
            let table = RolePolicyTable::builtin();
            let policy = table.policy(&role).unwrap();
            let expected = !matches_any(&path, &policy.blocked) && matches_any(&path, &policy.allowed);
            prop_assert_eq!(table.is_path_allowed(Some(&role), &path), expected);
        }
    }
}
