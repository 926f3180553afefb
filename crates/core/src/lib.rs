//! Domain primitives shared by the persistence and HTTP crates.
//!
//! - [`error`] -- domain error taxonomy.
//! - [`types`] -- identifier and timestamp aliases.
//! - [`roles`] -- well-known role names carried in access tokens.
//! - [`validation`] -- schema checks run before anything is persisted.
//! - [`artifact`] -- storage of uploaded binaries outside the database.
//! - [`image_upload`] -- accepted image formats and upload limits.

pub mod artifact;
pub mod error;
pub mod image_upload;
pub mod roles;
pub mod types;
pub mod validation;
