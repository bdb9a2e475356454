//! Git write-path operations LFC needs beyond plumbing (see
//! [`crate::git_plumbing`] for the read-only subprocess helpers).

pub mod client;

pub use client::GitClient;
