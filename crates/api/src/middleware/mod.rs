//! Request extractors: authentication, role checks, client IP.

pub mod auth;
pub mod client_ip;
pub mod rbac;
