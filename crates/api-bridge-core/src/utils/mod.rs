//! Small, focused helpers shared across the service layer.
//!
//! # Module Organization
//!
//! - [`path`] - Target URL construction (base URL + path + query string) for
//!   outbound calls to a backend.

pub mod path;
