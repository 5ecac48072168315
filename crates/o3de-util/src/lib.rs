#![forbid(unsafe_code)]
//! Filesystem, hashing, archive, download, and process helpers shared by the O3DE tooling crates.

pub mod archive;
pub mod download;
pub mod error;
pub mod fs;
pub mod hash;
pub mod json;
pub mod process;
