// # PAPI Client
//
// Request pipeline shared by every operation:
//
// 1. log the operation at debug level
// 2. validate the request record (nothing is sent on failure)
// 3. build an `HttpRequest` and tag it with `PAPI-Use-Prefixes`
// 4. execute it once through the `Transport`
// 5. map an unexpected status to `Error::Remote`
// 6. decode the body and post-process (singleton lists, links, headers)
//
// Operations live in the submodules, one per resource.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Error, Result};
use crate::traits::{HttpRequest, HttpResponse, Transport};

pub mod include_rules;
pub mod include_versions;
pub mod includes;
pub mod rule_tree;

pub use include_rules::{
    GetIncludeRuleTreeRequest, IncludeRuleTreeResponse, UpdateIncludeResponseHeaders,
    UpdateIncludeRuleTreeRequest, UpdateIncludeRuleTreeResponse,
};
pub use include_versions::{
    AvailableBehaviorsResponse, AvailableCriteriaResponse, AvailableItem, AvailableItems,
    CreateIncludeVersionRequest, CreateIncludeVersionResponse, GetIncludeVersionRequest,
    GetIncludeVersionResponse, IncludeVersion, IncludeVersionItems, ListAvailableBehaviorsRequest,
    ListAvailableCriteriaRequest, ListIncludeVersionsRequest, ListIncludeVersionsResponse,
    VersionStatus,
};
pub use includes::{
    CloneIncludeFrom, CreateIncludeRequest, CreateIncludeResponse, CreateIncludeResponseHeaders,
    DeleteIncludeRequest, DeleteIncludeResponse, GetIncludeRequest, GetIncludeResponse, Include,
    IncludeItems, IncludeType, ListIncludeParentsRequest, ListIncludeParentsResponse,
    ListIncludesRequest, ListIncludesResponse, ParentProperty, ParentPropertyItems,
};
pub use rule_tree::{
    GetRuleTreeRequest, GetRuleTreeResponse, RuleError, RuleTreeResponse, RuleWarning,
    UpdateRulesRequest, UpdateRulesResponse,
};

/// Header carrying the ID prefix preference
pub const USE_PREFIXES_HEADER: &str = "PAPI-Use-Prefixes";

/// Fast validation: structural checks only
pub const VALIDATE_MODE_FAST: &str = "fast";

/// Full validation: structural and semantic checks
pub const VALIDATE_MODE_FULL: &str = "full";

pub(crate) const VALIDATE_MODES: &[&str] = &[VALIDATE_MODE_FAST, VALIDATE_MODE_FULL];

/// Accepted rule format names: `latest` or a dated version like `v2023-01-05`
pub static RULE_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(latest|v\d{4}-\d{2}-\d{2})$").expect("rule format pattern is a valid regex")
});

/// `Accept` header value selecting a rule format
pub(crate) fn rule_format_media_type(rule_format: &str) -> String {
    format!("application/vnd.akamai.papirules.{}+json", rule_format)
}

/// Envelope fields common to rule tree responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contract_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group_id: String,

    /// Entity tag of the returned document
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etag: String,

    /// Problems the API found in the rule tree
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RuleError>,

    /// Non-blocking remarks on the rule tree
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RuleWarning>,
}

/// Client for the Property Manager API
///
/// Holds no mutable state; share it behind an `Arc` to use it from
/// several tasks.
pub struct PapiClient {
    transport: Box<dyn Transport>,
    use_prefixes: bool,
}

impl std::fmt::Debug for PapiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PapiClient")
            .field("transport", &self.transport.transport_name())
            .field("use_prefixes", &self.use_prefixes)
            .finish()
    }
}

impl PapiClient {
    /// Create a client sending `PAPI-Use-Prefixes: true`
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            use_prefixes: true,
        }
    }

    /// Choose the `PAPI-Use-Prefixes` value
    pub fn with_use_prefixes(mut self, use_prefixes: bool) -> Self {
        self.use_prefixes = use_prefixes;
        self
    }

    /// Current `PAPI-Use-Prefixes` value
    pub fn use_prefixes(&self) -> bool {
        self.use_prefixes
    }

    /// Name of the underlying transport
    pub fn transport_name(&self) -> &'static str {
        self.transport.transport_name()
    }

    /// Execute a request and check its status
    async fn exec(
        &self,
        operation: &'static str,
        request: HttpRequest,
        expected_status: u16,
    ) -> Result<HttpResponse> {
        let request = request.header(USE_PREFIXES_HEADER, self.use_prefixes.to_string());

        tracing::debug!(
            "{}: {} {} via {}",
            operation,
            request.method,
            request.path_and_query(),
            self.transport.transport_name()
        );

        let response = self.transport.execute(request).await?;

        if response.status != expected_status {
            let err = ApiError::from_response(response.status, &response.body);
            tracing::warn!(
                "{} failed: expected status {}, got {} ({})",
                operation,
                expected_status,
                response.status,
                err.title
            );
            return Err(Error::Remote(err));
        }

        Ok(response)
    }
}

/// Decode a response body that carries a rule tree
///
/// Any decoding failure is reported as a malformed tree. Tree depth is not
/// limited.
pub(crate) fn decode_tree_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    crate::rules::from_slice_unbounded(&response.body).map_err(|e| Error::malformed_tree(e.to_string()))
}

/// Extract the resource ID from a link returned by the API
///
/// The ID is the last path segment, query string ignored:
/// `/papi/v1/includes/inc_123456?contractId=ctr_1` yields `inc_123456`.
pub fn parse_response_link(link: &str) -> Result<String> {
    let base = url::Url::parse("https://papi.invalid/")
        .map_err(|e| Error::invalid_link(e.to_string()))?;
    let url = base
        .join(link)
        .map_err(|e| Error::invalid_link(format!("{}: {}", link, e)))?;

    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_link(format!("no resource ID in link {:?}", link)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_link() {
        assert_eq!(
            parse_response_link("/papi/v1/includes/inc_123456?contractId=ctr_1&groupId=grp_2").unwrap(),
            "inc_123456"
        );
        assert_eq!(
            parse_response_link("/papi/v1/includes/inc_12345/versions/5").unwrap(),
            "5"
        );
        assert_eq!(
            parse_response_link("https://host.example/papi/v1/includes/inc_9/").unwrap(),
            "inc_9"
        );
    }

    #[test]
    fn test_parse_response_link_rejects_empty() {
        assert!(matches!(
            parse_response_link(""),
            Err(Error::InvalidResponseLink(_))
        ));
        assert!(matches!(
            parse_response_link("?contractId=ctr_1"),
            Err(Error::InvalidResponseLink(_))
        ));
    }

    #[test]
    fn test_rule_format_pattern() {
        assert!(RULE_FORMAT.is_match("latest"));
        assert!(RULE_FORMAT.is_match("v2023-01-05"));
        assert!(!RULE_FORMAT.is_match("v2023-1-5"));
        assert!(!RULE_FORMAT.is_match("newest"));
        assert_eq!(
            rule_format_media_type("v2023-01-05"),
            "application/vnd.akamai.papirules.v2023-01-05+json"
        );
    }

    #[test]
    fn test_response_meta_defaults() {
        let meta: ResponseMeta = serde_json::from_str("{}").unwrap();
        assert_eq!(meta, ResponseMeta::default());
    }
}
