//! Services layer - Business logic
//!
//! This module contains the rules of the AINE backend:
//! - `access`: which navigation sections a role may see and enter
//! - `metrics`: pure reductions from row-sets to displayed aggregates
//! - `views`: concurrent reads feeding the metrics engine, per page
//! - `user`: login, sessions and the identity gate
//! - `student`, `leave`, `stock`, `finance`: validated mutations

pub mod access;
pub mod finance;
pub mod leave;
pub mod metrics;
pub mod password;
pub mod stock;
pub mod student;
pub mod user;
pub mod views;

pub use access::{default_navigation, is_section_permitted, resolve_navigation, AccessControl};
pub use finance::{FinanceError, FinanceService};
pub use leave::{LeaveError, LeaveService};
pub use metrics::{compute_metrics, Aggregate, Aggregates, MetricSpec, RowSets};
pub use password::{hash_password, verify_password};
pub use stock::{StockError, StockService};
pub use student::{StudentError, StudentService};
pub use user::{AuthError, LoginInput, UserService, UserServiceError};
pub use views::{
    DashboardSummary, FinanceOverview, FinancialReport, ReportsOverview, StockOverview,
    StockReport, StudentReport, ViewService,
};
