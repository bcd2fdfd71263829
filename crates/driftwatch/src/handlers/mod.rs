//! Command handlers

pub mod analyze;
pub mod reports;
pub mod research;
pub mod seed;
pub mod status;
