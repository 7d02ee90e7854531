//! Hearth domain core.
//!
//! Pure domain types and lifecycle logic shared by the database layer, the
//! API server, and the sweep worker: the role model, the login-throttle
//! state machine, the role snapshot used across subscription lapse
//! episodes, and subscription status rules. Nothing in this crate touches
//! the network or the database.

pub mod error;
pub mod roles;
pub mod snapshot;
pub mod subscription;
pub mod throttle;
pub mod types;
