//! Alicia Libros application library
//!
//! Marketplace modules for bookstores, authors and readers, plus the
//! bootstrap that wires them into the HTTP server.

pub mod auth;
pub mod bootstrap;
pub mod modules;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use bootstrap::{build, run, Application};
