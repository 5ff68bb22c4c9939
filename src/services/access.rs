//! Access control resolver
//!
//! Decides which navigation sections a role may see and enter. Everything
//! here is a pure function of (role, navigation tree).
//!
//! Sub-sections inherit their parent's role list: once a section is visible
//! all of its links are visible too.

use crate::models::{NavIcon, NavLink, NavSection, Role};

/// The institute's navigation tree
pub fn default_navigation() -> Vec<NavSection> {
    use Role::*;

    vec![
        NavSection::new(
            "Dashboard",
            "/dashboard",
            NavIcon::Home,
            vec![Admin, Principal, Faculty, Accountant, Clerk, Student],
        ),
        NavSection::new("Students", "/students", NavIcon::Users, vec![Admin, Principal, Faculty])
            .with_sub_sections(vec![
                NavLink::new("Admissions", "/students/admissions"),
                NavLink::new("Records", "/students/records"),
                NavLink::new("Attendance", "/students/attendance"),
            ]),
        NavSection::new("Faculty", "/faculty", NavIcon::GraduationCap, vec![Admin, Principal])
            .with_sub_sections(vec![
                NavLink::new("Faculty List", "/faculty/list"),
                NavLink::new("Leave Management", "/faculty/leaves"),
                NavLink::new("Workload", "/faculty/workload"),
            ]),
        NavSection::new(
            "Finance",
            "/finance",
            NavIcon::DollarSign,
            vec![Admin, Principal, Accountant],
        )
        .with_sub_sections(vec![
            NavLink::new("Salary", "/finance/salary"),
            NavLink::new("Fees", "/finance/fees"),
            NavLink::new("Expenses", "/finance/expenses"),
        ]),
        NavSection::new("Stock", "/stock", NavIcon::Package, vec![Admin, Principal, Clerk])
            .with_sub_sections(vec![
                NavLink::new("Stock Register", "/stock/register"),
                NavLink::new("Requisitions", "/stock/requisitions"),
                NavLink::new("Items", "/stock/items"),
            ]),
        NavSection::new("Reports", "/reports", NavIcon::BarChart, vec![Admin, Principal])
            .with_sub_sections(vec![
                NavLink::new("Student Reports", "/reports/students"),
                NavLink::new("Financial Reports", "/reports/financial"),
                NavLink::new("Stock Reports", "/reports/stock"),
            ]),
        NavSection::new("Settings", "/settings", NavIcon::Settings, vec![Admin]),
    ]
}

/// Sections visible to `role`, in tree order, sub-sections included whole.
///
/// An unrecognized role gets an empty list; this never fails.
pub fn resolve_navigation(role: &Role, tree: &[NavSection]) -> Vec<NavSection> {
    let sections: Vec<NavSection> = tree
        .iter()
        .filter(|section| section.permits(role))
        .cloned()
        .collect();

    if !role.is_recognized() {
        tracing::debug!("Unrecognized role '{}' resolved to no navigation", role);
    }

    sections
}

/// Whether `role` may enter `path`: the path must be a visible section, one
/// of its links, or nested below a visible section.
pub fn is_section_permitted(role: &Role, path: &str, tree: &[NavSection]) -> bool {
    tree.iter()
        .any(|section| section.permits(role) && section.covers_path(path))
}

/// Shared, immutable navigation tree handed to request handlers
#[derive(Debug, Clone)]
pub struct AccessControl {
    tree: Vec<NavSection>,
}

impl AccessControl {
    pub fn new(tree: Vec<NavSection>) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &[NavSection] {
        &self.tree
    }

    pub fn navigation_for(&self, role: &Role) -> Vec<NavSection> {
        resolve_navigation(role, &self.tree)
    }

    pub fn can_enter(&self, role: &Role, path: &str) -> bool {
        is_section_permitted(role, path, &self.tree)
    }
}

impl Default for AccessControl {
    fn default() -> Self {
        Self::new(default_navigation())
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn known_role_strategy() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::KNOWN.to_vec())
    }

    fn unknown_role_strategy() -> impl Strategy<Value = Role> {
        "[A-Za-z_ ]{0,12}"
            .prop_map(|s| Role::parse(&s))
            .prop_filter("must be unrecognized", |r| !r.is_recognized())
    }

    proptest! {
        /// Every returned section lists the role; every omitted section does not.
        #[test]
        fn resolved_sections_match_role_lists(role in known_role_strategy()) {
            let tree = default_navigation();
            let sections = resolve_navigation(&role, &tree);

            for section in &sections {
                prop_assert!(section.roles.contains(&role));
            }
            for section in tree.iter().filter(|s| !sections.contains(s)) {
                prop_assert!(!section.roles.contains(&role));
            }
        }

        /// Ordering of the tree is preserved.
        #[test]
        fn resolved_sections_keep_tree_order(role in known_role_strategy()) {
            let tree = default_navigation();
            let sections = resolve_navigation(&role, &tree);
            let positions: Vec<usize> = sections
                .iter()
                .map(|s| tree.iter().position(|t| t == s).unwrap())
                .collect();
            let mut sorted = positions.clone();
            sorted.sort();
            prop_assert_eq!(positions, sorted);
        }

        /// Unknown roles only ever see sections open to every known role.
        #[test]
        fn unknown_roles_get_no_special_access(role in unknown_role_strategy()) {
            let tree = default_navigation();
            for section in resolve_navigation(&role, &tree) {
                prop_assert!(Role::KNOWN.iter().all(|r| section.roles.contains(r)));
            }
        }
    }
}
