// src/dashboard_routes.rs

/// Pages of the browser dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardPage {
    Dashboard,
    Roads,
    Gps,
    Alerts,
}

impl DashboardPage {
    /// Component name the dashboard mounts for this page.
    pub fn component(&self) -> &'static str {
        match self {
            DashboardPage::Dashboard => "Dashboard",
            DashboardPage::Roads => "Roads",
            DashboardPage::Gps => "GPS",
            DashboardPage::Alerts => "Alerts",
        }
    }

    /// Canonical path of the page.
    pub fn path(&self) -> &'static str {
        match self {
            DashboardPage::Dashboard => "/dashboard",
            DashboardPage::Roads => "/roads",
            DashboardPage::Gps => "/gps",
            DashboardPage::Alerts => "/alerts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Redirect(&'static str),
    Page(DashboardPage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardRoute {
    pub path: &'static str,
    pub name: Option<&'static str>,
    pub target: RouteTarget,
}

pub const DASHBOARD_ROUTES: [DashboardRoute; 5] = [
    DashboardRoute {
        path: "/",
        name: None,
        target: RouteTarget::Redirect("/dashboard"),
    },
    DashboardRoute {
        path: "/dashboard",
        name: Some("dashboard"),
        target: RouteTarget::Page(DashboardPage::Dashboard),
    },
    DashboardRoute {
        path: "/roads",
        name: Some("roads"),
        target: RouteTarget::Page(DashboardPage::Roads),
    },
    DashboardRoute {
        path: "/gps",
        name: Some("gps"),
        target: RouteTarget::Page(DashboardPage::Gps),
    },
    DashboardRoute {
        path: "/alerts",
        name: Some("alerts"),
        target: RouteTarget::Page(DashboardPage::Alerts),
    },
];

const MAX_REDIRECTS: usize = 4;

/// Raw table entry for `path`, without following redirects.
pub fn find(path: &str) -> Option<&'static DashboardRoute> {
    DASHBOARD_ROUTES.iter().find(|route| route.path == path)
}

/// Page shown for `path` once redirects are followed.
pub fn resolve(path: &str) -> Option<DashboardPage> {
    let mut current = path;
    for _ in 0..=MAX_REDIRECTS {
        match find(current)?.target {
            RouteTarget::Page(page) => return Some(page),
            RouteTarget::Redirect(to) => current = to,
        }
    }
    None
}

/// Minimal HTML shell served for a page path; the dashboard bundle takes over from here.
pub fn page_shell(page: DashboardPage) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Traffic Monitor - {name}</title></head>\n<body><div id=\"app\" data-page=\"{name}\" data-path=\"{path}\"></div></body>\n</html>\n",
        name = page.component(),
        path = page.path()
    )
}
