//! Command implementations

pub mod cvo;
pub mod profile;
pub mod progress;
