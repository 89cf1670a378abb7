//! Opsboard Server
//!
//! Multi-tenant task collaboration backend: organizations, teams, task lists,
//! and per-organization role-based access control over a REST API.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod orgs;
pub mod users;
