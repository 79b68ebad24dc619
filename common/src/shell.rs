// common/src/shell.rs
//! Dashboard shell gate, evaluated on every protected render.

use serde::Serialize;

use crate::models::{Role, UserSession};
use crate::router::{AuthState, Route};
use crate::utils::short_address;

/// Session lookup as seen by a render: still in flight, or resolved
#[derive(Debug, Clone)]
pub enum SessionLoad {
    Pending,
    Resolved(Option<UserSession>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderView {
    pub display_name: String,
    pub initials: String,
    pub role_label: String,
    pub short_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidebarItem {
    pub href: String,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellView {
    pub role: Role,
    pub header: HeaderView,
    pub sidebar_title: String,
    pub sidebar: Vec<SidebarItem>,
    pub content_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Loading,
    Redirect(Route),
    Render(ShellView),
}

pub struct DashboardGate;

impl DashboardGate {
    pub fn evaluate(load: &SessionLoad, requested_path: &str) -> GateDecision {
        let session = match load {
            SessionLoad::Pending => return GateDecision::Loading,
            SessionLoad::Resolved(session) => session.as_ref(),
        };

        let role = match AuthState::from_session(session) {
            AuthState::AuthenticatedWithRole(role) => role,
            other => return GateDecision::Redirect(other.target()),
        };

        // from_session only yields a role for a present session
        let Some(session) = session else {
            return GateDecision::Redirect(Route::Login);
        };

        if !role.owns_path(requested_path) {
            tracing::debug!("Path {} is outside the {} dashboard", requested_path, role);
            return GateDecision::Redirect(Route::Dashboard(role));
        }

        GateDecision::Render(ShellView {
            role,
            header: HeaderView {
                display_name: session.display_name().to_string(),
                initials: session.initials(),
                role_label: role.display_name().to_string(),
                short_address: short_address(&session.wallet_address),
            },
            sidebar_title: role.sidebar_title().to_string(),
            sidebar: sidebar(role, requested_path),
            content_path: requested_path.to_string(),
        })
    }
}

fn sidebar(role: Role, path: &str) -> Vec<SidebarItem> {
    let root = role.dashboard_path();
    role.navigation()
        .iter()
        .map(|item| {
            let active = if item.href == root {
                path == root
            } else {
                path == item.href || path.starts_with(&format!("{}/", item.href))
            };
            SidebarItem {
                href: item.href.to_string(),
                label: item.label.to_string(),
                active,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileExtension;

    fn resolved(role: Option<Role>) -> SessionLoad {
        SessionLoad::Resolved(Some(UserSession::open(
            "s".into(),
            "0x1234567890abcdef1234567890abcdef1234abcd".into(),
            "Main Wallet".into(),
            ProfileExtension { role, ..Default::default() },
        )))
    }

    #[test]
    fn test_pending_load_shows_loading() {
        assert_eq!(DashboardGate::evaluate(&SessionLoad::Pending, "/supplier"), GateDecision::Loading);
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let decision = DashboardGate::evaluate(&SessionLoad::Resolved(None), "/supplier");
        assert_eq!(decision, GateDecision::Redirect(Route::Login));
    }

    #[test]
    fn test_missing_role_redirects_to_selection() {
        let decision = DashboardGate::evaluate(&resolved(None), "/vendor");
        assert_eq!(decision, GateDecision::Redirect(Route::RoleSelection));
    }

    #[test]
    fn test_foreign_dashboard_redirects_home() {
        let decision = DashboardGate::evaluate(&resolved(Some(Role::Customer)), "/supplier/inventory");
        assert_eq!(decision, GateDecision::Redirect(Route::Dashboard(Role::Customer)));
    }

    #[test]
    fn test_render_builds_header_and_sidebar() {
        let decision = DashboardGate::evaluate(&resolved(Some(Role::Vendor)), "/vendor/orders");
        let GateDecision::Render(view) = decision else {
            panic!("expected render, got {:?}", decision);
        };

        assert_eq!(view.header.display_name, "Main Wallet");
        assert_eq!(view.header.initials, "MW");
        assert_eq!(view.header.role_label, "VENDOR");
        assert_eq!(view.header.short_address, "0x1234...abcd");
        assert_eq!(view.sidebar_title, "Vendor Portal");
        assert_eq!(view.sidebar.len(), 7);

        let active: Vec<_> = view.sidebar.iter().filter(|i| i.active).map(|i| i.label.as_str()).collect();
        assert_eq!(active, vec!["Orders"]);
        assert_eq!(view.content_path, "/vendor/orders");
    }

    #[test]
    fn test_dashboard_root_marks_only_dashboard() {
        let GateDecision::Render(view) = DashboardGate::evaluate(&resolved(Some(Role::Supplier)), "/supplier") else {
            panic!("expected render");
        };
        let active: Vec<_> = view.sidebar.iter().filter(|i| i.active).map(|i| i.label.as_str()).collect();
        assert_eq!(active, vec!["Dashboard"]);
    }
}
