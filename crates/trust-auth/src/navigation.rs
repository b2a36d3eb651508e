//! Dashboard shell navigation model.
//!
//! The sidebar and the mobile bottom bar only list destinations the viewer's
//! role may reach, and highlight one "active" entry derived from the current
//! pathname.

use crate::policy::RolePolicyTable;
use crate::prefix::first_match;
use serde::Serialize;
use trust_types::Role;

/// One navigation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
    /// Material Symbols icon name.
    pub icon: &'static str,
}

impl NavItem {
    const fn new(label: &'static str, href: &'static str, icon: &'static str) -> Self {
        Self { label, href, icon }
    }
}

/// Sidebar entries, in display order.
pub const SIDEBAR_ITEMS: &[NavItem] = &[
    NavItem::new("Dashboard", "/dashboard", "dashboard"),
    NavItem::new("Usuarios", "/clientes", "group"),
    NavItem::new("Clientes", "/clientes/data", "apartment"),
    NavItem::new("Sucursales", "/clientes/sucursales", "storefront"),
    NavItem::new("Áreas", "/clientes/areas", "map"),
    NavItem::new("Dosificadores", "/clientes/dispensadores", "water_drop"),
    NavItem::new("Productos", "/clientes/productos", "inventory_2"),
    NavItem::new("Historial de Visitas", "/clientes/visitas", "history"),
    NavItem::new("Incidencias", "/clientes/incidencias", "report_problem"),
];

/// Mobile bottom-bar entries. Shown to restricted roles only.
pub const MOBILE_ITEMS: &[NavItem] = &[
    NavItem::new("Dashboard", "/dashboard", "dashboard"),
    NavItem::new("Calendario", "/clientes/calendario", "calendar_today"),
    NavItem::new("Historial", "/clientes/visitas", "history"),
    NavItem::new("Incidencias", "/clientes/incidencias", "report_problem"),
];

/// Most specific first; `/clientes` must come after its children.
const ACTIVE_PRIORITY: &[&str] = &[
    "/ajustes",
    "/clientes/incidencias",
    "/clientes/calendario",
    "/clientes/visitas",
    "/clientes/productos",
    "/clientes/dispensadores",
    "/clientes/areas",
    "/clientes/sucursales",
    "/clientes/data",
    "/clientes",
    "/dashboard",
];

const FALLBACK_ACTIVE: &str = "/dashboard";

/// Sidebar entries `role` may reach.
///
/// `None` (identity not resolved) is unrestricted, matching the gate.
#[must_use]
pub fn sidebar_items(table: &RolePolicyTable, role: Option<&Role>) -> Vec<NavItem> {
    visible(SIDEBAR_ITEMS, table, role)
}

/// Mobile entries for `role`; empty for roles the table does not restrict.
#[must_use]
pub fn mobile_items(table: &RolePolicyTable, role: Option<&Role>) -> Vec<NavItem> {
    match role {
        Some(r) if table.restricts(r) => visible(MOBILE_ITEMS, table, role),
        _ => Vec::new(),
    }
}

fn visible(items: &[NavItem], table: &RolePolicyTable, role: Option<&Role>) -> Vec<NavItem> {
    items
        .iter()
        .filter(|item| table.is_path_allowed(role, item.href))
        .copied()
        .collect()
}

/// Maps a pathname to the `href` that should be highlighted.
///
/// User creation lives under `/clientes/nuevo-usuario` and highlights
/// "Usuarios"; client creation lives under `/clientes/nuevo` and highlights
/// "Clientes".
#[must_use]
pub fn resolve_active_path(path: &str) -> &'static str {
    if path.is_empty() {
        return FALLBACK_ACTIVE;
    }
    if path.starts_with("/clientes/nuevo-usuario") {
        return "/clientes";
    }
    if path.starts_with("/clientes/nuevo") {
        return "/clientes/data";
    }
    first_match(path, ACTIVE_PRIORITY).unwrap_or(FALLBACK_ACTIVE)
}

/// Whether the dashboard shell (sidebar, header) wraps `path`.
///
/// The login page renders bare.
#[must_use]
pub fn shows_shell(path: &str) -> bool {
    !path.is_empty() && path != "/"
}
