//! Core of sherror: keeps application error codes in sync with discussion threads.
//!
//! This crate is transport-agnostic. The discussion platform, the repository
//! lookup and the artifact writer live behind ports (traits) implemented in
//! adapter crates or in tests.

pub mod accessor;
pub mod artifact;
pub mod client;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod styling;
pub mod sync;

pub use accessor::{ErrorHandle, StyledError};
pub use client::Sherror;
pub use domain::{ErrorDefinition, SherrorConfig};
pub use errors::{Error, Result};
pub use sync::Remote;
