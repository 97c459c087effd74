// # papi-core
//
// Core library for the Property Manager (PAPI) rule tree client.
//
// ## Architecture Overview
//
// - **rules**: The recursive rule tree (`RuleNode`, `MatchEntry`, `OptionValue`),
//   its JSON encoding and its traversal helpers
// - **validation**: Declarative field validation producing multi-field reports
// - **Transport**: Trait for putting HTTP requests on the wire
// - **PapiClient**: Request pipeline and the rule tree, include and include
//   version operations
// - **ClientConfig**: Credentials and client settings, from serde or `AKAMAI_*` env vars
//
// ## Design Principles
//
// 1. **Library-First**: No logging setup, no retries, no background tasks
// 2. **Validate Before Send**: Invalid requests never reach the transport
// 3. **Presence-Preserving**: Rule trees round-trip through JSON unchanged

pub mod client;
pub mod config;
pub mod error;
pub mod rules;
pub mod traits;
pub mod validation;

// Re-export core types for convenience
pub use client::{PapiClient, parse_response_link};
pub use config::ClientConfig;
pub use error::{ApiError, Error, Result};
pub use rules::{MatchEntry, OptionValue, RuleNode, RuleOptionsMap};
pub use traits::{HttpRequest, HttpResponse, Method, Transport};
pub use validation::{ValidationErrors, Violation};
