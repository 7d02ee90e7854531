//! Hearth sweep worker library.
//!
//! Houses the trial data-deletion sweep so the binary entrypoint and
//! integration tests share one implementation.

pub mod sweep;
