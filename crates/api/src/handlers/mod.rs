//! HTTP handlers, one module per resource.

pub mod auth;
pub mod community;
pub mod subscription;
