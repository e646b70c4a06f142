//! Shared utilities for Tsudoi packages.

pub mod logger;
pub mod time;
