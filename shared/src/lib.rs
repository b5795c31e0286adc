//! Shared types and models for the Obra Operations Platform
//!
//! This crate contains domain types shared between the backend and any
//! other components of the system (reporting jobs, CLIs).

pub mod allocation;
pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
