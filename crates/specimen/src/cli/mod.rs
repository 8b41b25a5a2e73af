//! Command handlers.

pub mod assess;
pub mod config;
pub mod process;
