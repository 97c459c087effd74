//! Include version rule trees

use serde::{Deserialize, Serialize};

use super::includes::IncludeType;
use super::rule_tree::RulesBody;
use super::{
    PapiClient, RULE_FORMAT, ResponseMeta, VALIDATE_MODES, decode_tree_body,
    rule_format_media_type,
};
use crate::error::Result;
use crate::rules::{self, RuleNode};
use crate::traits::{HttpRequest, HttpResponse};
use crate::validation::{Rule, Validation, ValidationErrors};

/// Parameters for fetching an include version's rule tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetIncludeRuleTreeRequest {
    pub contract_id: String,
    pub group_id: String,
    pub include_id: String,
    pub include_version: u32,
    pub rule_format: String,
    pub validate_mode: String,
    pub validate_rules: bool,
}

impl GetIncludeRuleTreeRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("ContractID", &self.contract_id, &[Rule::Required])
            .field("GroupID", &self.group_id, &[Rule::Required])
            .field("IncludeID", &self.include_id, &[Rule::Required])
            .field("IncludeVersion", self.include_version, &[Rule::Required])
            .field("RuleFormat", &self.rule_format, &[Rule::Pattern(&RULE_FORMAT)])
            .field("ValidateMode", &self.validate_mode, &[Rule::OneOf(VALIDATE_MODES)])
            .finish()
    }
}

/// Parameters for replacing an include version's rule tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateIncludeRuleTreeRequest {
    pub contract_id: String,
    pub dry_run: bool,
    pub group_id: String,
    pub include_id: String,
    pub include_version: u32,
    pub rules: RuleNode,
    pub comments: String,
    pub validate_mode: String,
    pub validate_rules: bool,
}

impl UpdateIncludeRuleTreeRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("ContractID", &self.contract_id, &[Rule::Required])
            .field("GroupID", &self.group_id, &[Rule::Required])
            .field("IncludeID", &self.include_id, &[Rule::Required])
            .field("IncludeVersion", self.include_version, &[Rule::Required])
            .nested("Rules", self.rules.validate())
            .field("ValidateMode", &self.validate_mode, &[Rule::OneOf(VALIDATE_MODES)])
            .finish()
    }
}

/// An include version's rule tree as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeRuleTreeResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,

    #[serde(default)]
    pub include_id: String,

    #[serde(default)]
    pub include_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_type: Option<IncludeType>,

    #[serde(default)]
    pub include_version: u32,

    #[serde(default)]
    pub rule_format: String,

    pub rules: RuleNode,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comments: String,
}

/// Quota headers returned by a rule tree update
///
/// Values the server omits, or sends in a non-numeric form, are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateIncludeResponseHeaders {
    pub elements_per_property_remaining: Option<u64>,
    pub elements_per_property_total: Option<u64>,
    pub max_nested_rules_per_include_remaining: Option<u64>,
    pub max_nested_rules_per_include_total: Option<u64>,
}

impl UpdateIncludeResponseHeaders {
    fn from_response(response: &HttpResponse) -> Self {
        let read = |name: &str| response.header(name).and_then(|v| v.trim().parse().ok());
        Self {
            elements_per_property_remaining: read("x-limit-elements-per-property-remaining"),
            elements_per_property_total: read("x-limit-elements-per-property-limit"),
            max_nested_rules_per_include_remaining: read(
                "x-limit-max-nested-rules-per-include-remaining",
            ),
            max_nested_rules_per_include_total: read("x-limit-max-nested-rules-per-include-limit"),
        }
    }
}

/// Result of an include rule tree update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateIncludeRuleTreeResponse {
    pub rule_tree: IncludeRuleTreeResponse,
    pub response_headers: UpdateIncludeResponseHeaders,
}

fn include_rules_path(include_id: &str, include_version: u32) -> String {
    format!(
        "/papi/v1/includes/{}/versions/{}/rules",
        include_id, include_version
    )
}

impl PapiClient {
    /// Fetch the rule tree of an include version
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /papi/v1/includes/{includeId}/versions/{version}/rules?contractId=..&groupId=..
    /// ```
    pub async fn get_include_rule_tree(
        &self,
        params: &GetIncludeRuleTreeRequest,
    ) -> Result<IncludeRuleTreeResponse> {
        tracing::debug!("GetIncludeRuleTree");
        params.validate()?;

        let mut request = HttpRequest::get(include_rules_path(&params.include_id, params.include_version))
            .query("contractId", &params.contract_id)
            .query("groupId", &params.group_id)
            .query_if(!params.validate_mode.is_empty(), "validateMode", &params.validate_mode)
            .query_if(!params.validate_rules, "validateRules", false);
        if !params.rule_format.is_empty() {
            request = request.header("Accept", rule_format_media_type(&params.rule_format));
        }

        let response = self.exec("GetIncludeRuleTree", request, 200).await?;
        decode_tree_body(&response)
    }

    /// Replace the rule tree of an include version
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /papi/v1/includes/{includeId}/versions/{version}/rules?contractId=..&groupId=..
    /// ```
    pub async fn update_include_rule_tree(
        &self,
        params: &UpdateIncludeRuleTreeRequest,
    ) -> Result<UpdateIncludeRuleTreeResponse> {
        tracing::debug!("UpdateIncludeRuleTree");
        params.validate()?;

        let body = rules::to_value_unbounded(&RulesBody {
            comments: &params.comments,
            rules: &params.rules,
        })?;

        let request = HttpRequest::put(include_rules_path(&params.include_id, params.include_version))
            .query("contractId", &params.contract_id)
            .query("groupId", &params.group_id)
            .query_if(!params.validate_mode.is_empty(), "validateMode", &params.validate_mode)
            .query_if(!params.validate_rules, "validateRules", false)
            .query_if(params.dry_run, "dryRun", true)
            .json(body);

        let response = self.exec("UpdateIncludeRuleTree", request, 200).await?;
        let rule_tree = decode_tree_body(&response)?;

        Ok(UpdateIncludeRuleTreeResponse {
            rule_tree,
            response_headers: UpdateIncludeResponseHeaders::from_response(&response),
        })
    }
}
