//! Data models.

pub mod config;
pub mod f29;
