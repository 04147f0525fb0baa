//! Infrastructure layer — implementations of the application ports.

pub mod checkpoint;
pub mod command_runner;
pub mod config;
pub mod host;
pub mod operator;
