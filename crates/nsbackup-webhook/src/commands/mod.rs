//! CLI commands

pub mod config;
pub mod decide;
pub mod serve;
