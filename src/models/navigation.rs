//! Navigation section model for the role-gated menu

use serde::{Deserialize, Serialize};

use super::Role;

/// Icon shown next to a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavIcon {
    Home,
    Users,
    GraduationCap,
    DollarSign,
    Package,
    BarChart,
    Settings,
}

impl std::fmt::Display for NavIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::Users => write!(f, "users"),
            Self::GraduationCap => write!(f, "graduationcap"),
            Self::DollarSign => write!(f, "dollarsign"),
            Self::Package => write!(f, "package"),
            Self::BarChart => write!(f, "barchart"),
            Self::Settings => write!(f, "settings"),
        }
    }
}

/// A sub-section link. Carries no role list of its own: visibility comes
/// from the parent section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub name: String,
    pub href: String,
}

impl NavLink {
    pub fn new(name: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            href: href.into(),
        }
    }
}

/// Top-level navigation section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavSection {
    pub name: String,
    pub href: String,
    pub icon: NavIcon,
    /// Roles allowed to see and enter this section
    pub roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_sections: Vec<NavLink>,
}

impl NavSection {
    pub fn new(name: impl Into<String>, href: impl Into<String>, icon: NavIcon, roles: Vec<Role>) -> Self {
        Self {
            name: name.into(),
            href: href.into(),
            icon,
            roles,
            sub_sections: Vec::new(),
        }
    }

    pub fn with_sub_sections(mut self, sub_sections: Vec<NavLink>) -> Self {
        self.sub_sections = sub_sections;
        self
    }

    /// Whether `role` appears in this section's role list.
    /// An unrecognized role never matches.
    pub fn permits(&self, role: &Role) -> bool {
        role.is_recognized() && self.roles.contains(role)
    }

    /// Whether `path` is this section, one of its links, or nested below it
    pub fn covers_path(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');
        if path == self.href || self.sub_sections.iter().any(|s| s.href == path) {
            return true;
        }
        path.strip_prefix(self.href.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finance() -> NavSection {
        NavSection::new(
            "Finance",
            "/finance",
            NavIcon::DollarSign,
            vec![Role::Admin, Role::Accountant],
        )
        .with_sub_sections(vec![NavLink::new("Fees", "/finance/fees")])
    }

    #[test]
    fn test_permits() {
        let section = finance();
        assert!(section.permits(&Role::Accountant));
        assert!(!section.permits(&Role::Clerk));
        assert!(!section.permits(&Role::Unrecognized("accountant ".to_string())));
    }

    #[test]
    fn test_covers_path() {
        let section = finance();
        assert!(section.covers_path("/finance"));
        assert!(section.covers_path("/finance/"));
        assert!(section.covers_path("/finance/fees"));
        assert!(section.covers_path("/finance/fees/12"));
        assert!(!section.covers_path("/financeteam"));
        assert!(!section.covers_path("/stock"));
    }

    #[test]
    fn test_section_serializes_roles_as_strings() {
        let json = serde_json::to_value(finance()).unwrap();
        assert_eq!(json["roles"], serde_json::json!(["admin", "accountant"]));
        assert_eq!(json["icon"], "dollarsign");
        assert_eq!(json["sub_sections"][0]["href"], "/finance/fees");
    }
}
