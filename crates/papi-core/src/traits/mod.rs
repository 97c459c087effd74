//! Core traits for the PAPI client
//!
//! This module defines the abstract interfaces that implementations must follow.
//!
//! - [`Transport`]: Execute HTTP requests against the API host

pub mod transport;

pub use transport::{HttpRequest, HttpResponse, Method, Transport};
