//! CLI command implementations.

pub mod daemon;
pub mod disable;
pub mod enable;
pub mod help;
pub mod status;
