//! Middleware for the Obra Operations Platform

mod auth;

pub use auth::{auth_middleware, check_permission, AuthUser, CurrentUser};
