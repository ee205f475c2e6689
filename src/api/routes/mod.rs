//! API route handlers

pub mod health;
pub mod records;
pub mod targets;
