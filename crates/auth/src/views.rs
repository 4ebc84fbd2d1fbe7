//! Portal view registry, route resolution and navigation filtering.
//!
//! Both the route guard and the navigation menu consult the same role gate,
//! so a menu entry is shown exactly when its route would render.

use serde::Serialize;

use crate::roles::{ADMIN, COMERCIAL, FINANCEIRO, OPERACIONAL, RH};
use crate::{Principal, SessionState, can_access};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Public,
    Principal,
    Setores,
    Sistema,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::Public => "PÚBLICO",
            Section::Principal => "PRINCIPAL",
            Section::Setores => "SETORES",
            Section::Sistema => "SISTEMA",
        }
    }
}

/// Navigation order of the menu sections.
const MENU_SECTIONS: [Section; 3] = [Section::Principal, Section::Setores, Section::Sistema];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct View {
    pub path: &'static str,
    pub title: &'static str,
    pub section: Section,
    /// Empty means any authenticated principal may open the view.
    pub required_roles: &'static [&'static str],
}

impl View {
    pub fn is_admin_only(&self) -> bool {
        self.required_roles == [ADMIN]
    }

    pub fn admits(&self, principal: &Principal) -> bool {
        can_access(principal.roles.as_slice(), self.required_roles)
    }
}

pub const LOGIN: View = View {
    path: LOGIN_PATH,
    title: "Login",
    section: Section::Public,
    required_roles: &[],
};

pub const HOME: View = View {
    path: HOME_PATH,
    title: "Início",
    section: Section::Principal,
    required_roles: &[],
};

pub const TASKS: View = View {
    path: "/tarefas",
    title: "Tarefas Pessoais",
    section: Section::Principal,
    required_roles: &[],
};

pub const USERS: View = View {
    path: "/usuarios",
    title: "Gerenciar Usuários",
    section: Section::Sistema,
    required_roles: &[ADMIN],
};

/// Every protected view, in menu order.
pub const PROTECTED_VIEWS: &[View] = &[
    HOME,
    TASKS,
    View {
        path: "/financeiro",
        title: "Financeiro",
        section: Section::Setores,
        required_roles: &[FINANCEIRO],
    },
    View {
        path: "/operacional",
        title: "Operacional",
        section: Section::Setores,
        required_roles: &[OPERACIONAL],
    },
    View {
        path: "/comercial",
        title: "Comercial",
        section: Section::Setores,
        required_roles: &[COMERCIAL],
    },
    View {
        path: "/rh",
        title: "RH",
        section: Section::Setores,
        required_roles: &[RH],
    },
    USERS,
    View {
        path: "/relatorios",
        title: "Relatórios",
        section: Section::Sistema,
        required_roles: &[ADMIN],
    },
    View {
        path: "/configuracoes",
        title: "Configurações",
        section: Section::Sistema,
        required_roles: &[ADMIN],
    },
];

pub fn find_view(path: &str) -> Option<&'static View> {
    let path = normalize(path);
    PROTECTED_VIEWS.iter().find(|v| v.path == path)
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim();
    if trimmed.len() > 1 {
        trimmed.trim_end_matches('/')
    } else {
        trimmed
    }
}

/// Outcome of asking "what happens if this session opens `path`?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteDecision {
    Render { view: View },
    Redirect { to: &'static str },
    NotFound,
}

/// Resolve a client route against the current session.
///
/// - `/login` renders for anonymous sessions and bounces authenticated ones home.
/// - unknown paths are 404s regardless of session.
/// - protected views send non-authenticated sessions to `/login`, and
///   authenticated principals lacking the role back to `/`.
pub fn resolve(state: &SessionState, path: &str) -> RouteDecision {
    let principal = state.principal();

    if normalize(path) == LOGIN_PATH {
        return match principal {
            Some(_) => RouteDecision::Redirect { to: HOME_PATH },
            None => RouteDecision::Render { view: LOGIN },
        };
    }

    let Some(view) = find_view(path) else {
        return RouteDecision::NotFound;
    };

    match principal {
        None => RouteDecision::Redirect { to: LOGIN_PATH },
        Some(p) if view.admits(p) => RouteDecision::Render { view: *view },
        Some(p) => {
            tracing::debug!(
                principal_id = %p.id,
                path = view.path,
                "route denied by role gate; redirecting home"
            );
            RouteDecision::Redirect { to: HOME_PATH }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub path: &'static str,
    pub title: &'static str,
    /// Admin-only entries are flagged so the menu can mark them.
    pub restricted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavSection {
    pub section: Section,
    pub title: &'static str,
    pub items: Vec<NavItem>,
}

/// Menu entries visible to `principal`, grouped by section; empty sections are omitted.
pub fn navigation(principal: &Principal) -> Vec<NavSection> {
    MENU_SECTIONS
        .iter()
        .filter_map(|section| {
            let items: Vec<NavItem> = PROTECTED_VIEWS
                .iter()
                .filter(|v| v.section == *section && v.admits(principal))
                .map(|v| NavItem {
                    path: v.path,
                    title: v.title,
                    restricted: v.is_admin_only(),
                })
                .collect();

            (!items.is_empty()).then(|| NavSection {
                section: *section,
                title: section.title(),
                items,
            })
        })
        .collect()
}
