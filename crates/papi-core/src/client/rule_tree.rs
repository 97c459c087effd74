//! Property version rule trees

use serde::{Deserialize, Serialize};

use super::{
    PapiClient, RULE_FORMAT, ResponseMeta, VALIDATE_MODES, decode_tree_body,
    rule_format_media_type,
};
use crate::error::Result;
use crate::rules::{self, RuleLocation, RuleNode};
use crate::traits::HttpRequest;
use crate::validation::{Rule, Validation, ValidationErrors};

/// Parameters for fetching a property version's rule tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetRuleTreeRequest {
    pub property_id: String,
    pub property_version: u32,
    pub contract_id: String,
    pub group_id: String,
    /// `fast`, `full` or empty for the server default
    pub validate_mode: String,
    /// When false, `validateRules=false` is sent
    pub validate_rules: bool,
    /// `latest`, a dated format, or empty for the version's own format
    pub rule_format: String,
}

impl GetRuleTreeRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("PropertyID", &self.property_id, &[Rule::Required])
            .field("PropertyVersion", self.property_version, &[Rule::Required])
            .field("ValidateMode", &self.validate_mode, &[Rule::OneOf(VALIDATE_MODES)])
            .field("RuleFormat", &self.rule_format, &[Rule::Pattern(&RULE_FORMAT)])
            .finish()
    }
}

/// Parameters for replacing a property version's rule tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRulesRequest {
    pub property_id: String,
    pub property_version: u32,
    pub contract_id: String,
    pub group_id: String,
    /// Validate without saving
    pub dry_run: bool,
    pub validate_mode: String,
    pub validate_rules: bool,
    /// New rule tree
    pub rules: RuleNode,
    /// Version comment sent alongside the tree
    pub comments: String,
}

impl UpdateRulesRequest {
    /// Checks the identifiers and the shape of the whole tree
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("PropertyID", &self.property_id, &[Rule::Required])
            .field("PropertyVersion", self.property_version, &[Rule::Required])
            .field("ValidateMode", &self.validate_mode, &[Rule::OneOf(VALIDATE_MODES)])
            .nested("Rules", self.rules.validate())
            .finish()
    }
}

/// Body of a rule tree update
#[derive(Serialize)]
pub(crate) struct RulesBody<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    pub comments: &'a str,
    pub rules: &'a RuleNode,
}

/// A property version's rule tree as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTreeResponse {
    #[serde(flatten)]
    pub meta: ResponseMeta,

    #[serde(default)]
    pub property_id: String,

    #[serde(default)]
    pub property_version: u32,

    #[serde(default)]
    pub rule_format: String,

    pub rules: RuleNode,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comments: String,
}

pub type GetRuleTreeResponse = RuleTreeResponse;
pub type UpdateRulesResponse = RuleTreeResponse;

/// A problem the API found in a submitted rule tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleError {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub behavior_name: String,
    /// JSON pointer into the tree, e.g. `#/rules/children/0/behaviors/1`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_location: String,
}

impl RuleError {
    /// Find the part of `tree` this error points at
    pub fn locate<'a>(&self, tree: &'a RuleNode) -> Option<RuleLocation<'a>> {
        tree.locate(&self.error_location)
    }
}

/// A non-blocking remark on a submitted rule tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleWarning {
    #[serde(rename = "type", default)]
    pub warning_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_location: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_rule_format: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suggested_rule_format: String,
}

impl RuleWarning {
    /// Find the part of `tree` this warning points at
    pub fn locate<'a>(&self, tree: &'a RuleNode) -> Option<RuleLocation<'a>> {
        tree.locate(&self.error_location)
    }
}

fn rules_path(property_id: &str, property_version: u32) -> String {
    format!(
        "/papi/v1/properties/{}/versions/{}/rules",
        property_id, property_version
    )
}

impl PapiClient {
    /// Fetch the rule tree of a property version
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /papi/v1/properties/{propertyId}/versions/{version}/rules?contractId=..&groupId=..
    /// ```
    pub async fn get_rule_tree(&self, params: &GetRuleTreeRequest) -> Result<GetRuleTreeResponse> {
        tracing::debug!("GetRuleTree");
        params.validate()?;

        let mut request = HttpRequest::get(rules_path(&params.property_id, params.property_version))
            .query("contractId", &params.contract_id)
            .query("groupId", &params.group_id)
            .query_if(!params.validate_mode.is_empty(), "validateMode", &params.validate_mode)
            .query_if(!params.validate_rules, "validateRules", false);
        if !params.rule_format.is_empty() {
            request = request.header("Accept", rule_format_media_type(&params.rule_format));
        }

        let response = self.exec("GetRuleTree", request, 200).await?;
        decode_tree_body(&response)
    }

    /// Replace the rule tree of a property version
    ///
    /// The tree is validated locally before anything is sent. Problems the
    /// API finds are returned in `meta.errors`, not as an `Err`.
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /papi/v1/properties/{propertyId}/versions/{version}/rules?contractId=..&groupId=..
    /// Content-Type: application/json
    ///
    /// {"comments": "...", "rules": {...}}
    /// ```
    pub async fn update_rule_tree(&self, params: &UpdateRulesRequest) -> Result<UpdateRulesResponse> {
        tracing::debug!("UpdateRuleTree");
        params.validate()?;

        let body = rules::to_value_unbounded(&RulesBody {
            comments: &params.comments,
            rules: &params.rules,
        })?;

        let request = HttpRequest::put(rules_path(&params.property_id, params.property_version))
            .query("contractId", &params.contract_id)
            .query("groupId", &params.group_id)
            .query_if(!params.validate_mode.is_empty(), "validateMode", &params.validate_mode)
            .query_if(!params.validate_rules, "validateRules", false)
            .query_if(params.dry_run, "dryRun", true)
            .json(body);

        let response = self.exec("UpdateRuleTree", request, 200).await?;
        decode_tree_body(&response)
    }
}
