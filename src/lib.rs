//! # Snap
//!
//! Repository discovery and bootstrapping for a git-compatible revision
//! control tool.

/// Git's INI-like configuration format.
pub mod config;
mod error;
/// Upward search for the `.git` entry.
pub mod locate;
/// Filesystem helpers rooted at one directory.
pub mod path_store;
/// Opening and creating repositories.
pub mod repository;

pub use error::{Error, Result};
pub use repository::Repository;
