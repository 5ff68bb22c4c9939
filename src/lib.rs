//! AINE - Institute management backend
//!
//! This library provides role-gated navigation, per-page summary views and
//! the record services behind the AINE dashboard.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
