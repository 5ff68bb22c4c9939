//! Data models
//!
//! This module contains all data structures used throughout the AINE backend.
//! Models represent:
//! - Store rows (User, Session, Student, Course, Faculty, LeaveApplication,
//!   StockItem, Requisition, StockTransaction, FeeRecord, Expense, SalaryRecord)
//! - The static navigation tree (NavSection, NavLink)
//! - Report periods (DateRange)
//! - API request inputs

mod finance;
mod leave;
mod navigation;
mod period;
mod session;
mod stock;
mod student;
mod user;

pub use finance::{
    Expense, FeeRecord, RecordExpenseInput, RecordFeeInput, RecordSalaryInput, SalaryRecord,
};
pub use leave::{
    ApplyLeaveInput, ApprovalStatus, CreateFacultyInput, Faculty, LeaveApplication,
    LeaveWithFaculty,
};
pub use navigation::{NavIcon, NavLink, NavSection};
pub use period::DateRange;
pub use session::Session;
pub use stock::{
    AdjustStockInput, ClassifiedStockItem, CreateRequisitionInput, CreateStockItemInput,
    Requisition, StockItem, StockStatus, StockTransaction, TransactionKind,
};
pub use student::{
    generate_admission_no, AdmitStudentInput, Course, FeeStatus, Student, StudentFilter,
    StudentWithCourse,
};
pub use user::{CreateUserInput, Role, User};
