//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own validation and persistence so route handlers can stay
//! focused on protocol translation and auth plumbing.

pub mod annotation;
pub mod render;
pub mod session;
