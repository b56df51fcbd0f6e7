//! Ambient infrastructure shared by every crate in the workspace: structured
//! logging, the wire-level error taxonomy, password hashing and time helpers.
//!
//! This mirrors the role `flux` plays in the teacher codebase: a small,
//! dependency-light crate that every other crate leans on instead of
//! reinventing logging or error plumbing locally.

pub mod crypto;
pub mod error;
pub mod logging;
pub mod time;
pub mod util;

pub use error::{DomainError, DomainResult, ErrorType, ErrorUtils, NetworkError, NetworkResult};
