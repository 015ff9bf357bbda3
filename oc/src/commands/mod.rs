//! Command implementations

pub mod exchange;
pub mod keys;
