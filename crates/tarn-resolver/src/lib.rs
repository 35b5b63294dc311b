//! Dependency resolution engine: a generic backtracking resolver driven by a
//! provider contract, lazily materialized candidate sequences, version/hash/link
//! constraints, conflict explanations, and installed-set consistency checks.

pub mod cache;
pub mod candidates;
pub mod check;
pub mod conflict;
pub mod constraint;
pub mod factory;
pub mod found_candidates;
pub mod graph;
pub mod package_provider;
pub mod package_resolver;
pub mod provider;
pub mod reporter;
pub mod requirements;
pub mod resolver;

pub use candidates::Candidate;
pub use constraint::Constraint;
pub use package_resolver::{PackageResolver, Resolution, ResolveOptions};
pub use requirements::Requirement;
