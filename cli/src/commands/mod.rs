//! Command implementations

pub mod config;
pub mod install;
pub mod reconcile;
pub mod version;
