//! Command implementations.

pub mod config;
pub mod inspect;
pub mod strip;
