//! Core data types for tarn.
//!
//! Everything the resolver reasons about lives here: normalized package
//! names, PEP 440 versions and specifiers, environment markers, links and
//! hashes, install requirements, package metadata, and the two external
//! collaborators, the package index and the installed-package registry.

pub mod config;
pub mod hashes;
pub mod index;
pub mod installed;
pub mod link;
pub mod marker;
pub mod metadata;
pub mod name;
pub mod requirement;
pub mod requirements_file;
pub mod specifier;
pub mod version;

pub use name::{ExtraName, PackageName};
pub use requirement::InstallRequirement;
pub use version::Version;
