//! CLI command implementations.

pub mod build;
pub mod common;
pub mod evaluate;
pub mod run;
pub mod scenarios;
pub mod version;
