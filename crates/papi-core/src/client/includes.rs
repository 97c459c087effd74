//! Includes: reusable rule trees shared between properties

use serde::{Deserialize, Serialize};

use super::{PapiClient, parse_response_link};
use crate::error::{Error, Result};
use crate::traits::{HttpRequest, HttpResponse};
use crate::validation::{Rule, Validation, ValidationErrors};

/// Kind of include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncludeType {
    /// Rules for a single microservice
    Microservices,
    /// Settings shared across properties
    CommonSettings,
    /// A type this client does not know; never accepted on create
    #[serde(other)]
    Unknown,
}

const INCLUDE_TYPES: &[&str] = &["MICROSERVICES", "COMMON_SETTINGS"];

impl IncludeType {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            IncludeType::Microservices => "MICROSERVICES",
            IncludeType::CommonSettings => "COMMON_SETTINGS",
            IncludeType::Unknown => "UNKNOWN",
        }
    }
}

/// An include
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Include {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub contract_id: String,
    #[serde(default)]
    pub group_id: String,
    pub include_id: String,
    #[serde(default)]
    pub include_name: String,
    #[serde(default)]
    pub include_type: Option<IncludeType>,
    #[serde(default)]
    pub latest_version: u32,
    #[serde(default)]
    pub production_version: Option<u32>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub staging_version: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncludeItems {
    #[serde(default)]
    pub items: Vec<Include>,
}

/// A property that references an include
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentProperty {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub contract_id: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_version: Option<u32>,
    pub property_id: String,
    #[serde(default)]
    pub property_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_version: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParentPropertyItems {
    #[serde(default)]
    pub items: Vec<ParentProperty>,
}

/// Parameters for listing includes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListIncludesRequest {
    pub contract_id: String,
    /// Optional group filter
    pub group_id: String,
}

impl ListIncludesRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("ContractID", &self.contract_id, &[Rule::Required])
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListIncludesResponse {
    pub includes: IncludeItems,
}

/// Parameters for listing the properties that use an include
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListIncludeParentsRequest {
    pub contract_id: String,
    pub group_id: String,
    pub include_id: String,
}

impl ListIncludeParentsRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("IncludeID", &self.include_id, &[Rule::Required])
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListIncludeParentsResponse {
    pub properties: ParentPropertyItems,
}

/// Parameters for fetching one include
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetIncludeRequest {
    pub contract_id: String,
    pub group_id: String,
    pub include_id: String,
}

impl GetIncludeRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("ContractID", &self.contract_id, &[Rule::Required])
            .field("GroupID", &self.group_id, &[Rule::Required])
            .field("IncludeID", &self.include_id, &[Rule::Required])
            .finish()
    }
}

/// One include, plus the list it was extracted from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetIncludeResponse {
    pub includes: IncludeItems,
    pub include: Include,
}

/// Source of a cloned include
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneIncludeFrom {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub clone_from_version_etag: String,
    pub include_id: String,
    pub version: u32,
}

/// Parameters for creating an include
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateIncludeRequest {
    pub contract_id: String,
    pub group_id: String,
    pub include_name: String,
    pub include_type: Option<IncludeType>,
    pub product_id: String,
    /// Rule format to freeze the include on, empty for `latest`
    pub rule_format: String,
    /// Clone an existing include version instead of starting empty
    pub clone_from: Option<CloneIncludeFrom>,
}

impl CreateIncludeRequest {
    /// `CloneFrom.IncludeID` and `CloneFrom.Version` are only required
    /// when a clone source is given
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let cloning = self.clone_from.is_some();
        let (clone_id, clone_version) = self
            .clone_from
            .as_ref()
            .map(|c| (c.include_id.as_str(), c.version))
            .unwrap_or(("", 0));

        Validation::new()
            .field("ContractID", &self.contract_id, &[Rule::Required])
            .field("GroupID", &self.group_id, &[Rule::Required])
            .field("IncludeName", &self.include_name, &[Rule::Required])
            .field(
                "IncludeType",
                self.include_type.map(|t| t.as_str()),
                &[Rule::Required, Rule::OneOf(INCLUDE_TYPES)],
            )
            .field("ProductID", &self.product_id, &[Rule::Required])
            .field("CloneFrom.IncludeID", clone_id, &[Rule::RequiredIf(cloning)])
            .field("CloneFrom.Version", clone_version, &[Rule::RequiredIf(cloning)])
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIncludeBody<'a> {
    include_name: &'a str,
    include_type: Option<IncludeType>,
    product_id: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    rule_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    clone_from: Option<&'a CloneIncludeFrom>,
}

/// Include quota headers returned on create
///
/// Values the server omits, or sends in a non-numeric form, are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateIncludeResponseHeaders {
    pub includes_limit_total: Option<u64>,
    pub includes_limit_remaining: Option<u64>,
}

impl CreateIncludeResponseHeaders {
    fn from_response(response: &HttpResponse) -> Self {
        let read = |name: &str| response.header(name).and_then(|v| v.trim().parse().ok());
        Self {
            includes_limit_total: read("x-limit-includes-per-contract-limit"),
            includes_limit_remaining: read("x-limit-includes-per-contract-remaining"),
        }
    }
}

/// Result of creating an include
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncludeResponse {
    /// ID taken from `include_link`
    #[serde(skip)]
    pub include_id: String,
    pub include_link: String,
    #[serde(skip)]
    pub response_headers: CreateIncludeResponseHeaders,
}

/// Parameters for deleting an include
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteIncludeRequest {
    pub contract_id: String,
    pub group_id: String,
    pub include_id: String,
}

impl DeleteIncludeRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("IncludeID", &self.include_id, &[Rule::Required])
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteIncludeResponse {
    #[serde(default)]
    pub message: String,
}

impl PapiClient {
    /// List the includes of a contract
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /papi/v1/includes?contractId=..[&groupId=..]
    /// ```
    pub async fn list_includes(&self, params: &ListIncludesRequest) -> Result<ListIncludesResponse> {
        tracing::debug!("ListIncludes");
        params.validate()?;

        let request = HttpRequest::get("/papi/v1/includes")
            .query("contractId", &params.contract_id)
            .query_if(!params.group_id.is_empty(), "groupId", &params.group_id);

        self.exec("ListIncludes", request, 200).await?.json()
    }

    /// List the properties that reference an include
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /papi/v1/includes/{includeId}/parents
    /// ```
    pub async fn list_include_parents(
        &self,
        params: &ListIncludeParentsRequest,
    ) -> Result<ListIncludeParentsResponse> {
        tracing::debug!("ListIncludeParents");
        params.validate()?;

        let request = HttpRequest::get(format!("/papi/v1/includes/{}/parents", params.include_id))
            .query_if(!params.contract_id.is_empty(), "contractId", &params.contract_id)
            .query_if(!params.group_id.is_empty(), "groupId", &params.group_id);

        self.exec("ListIncludeParents", request, 200).await?.json()
    }

    /// Fetch one include
    ///
    /// The API answers with a list; an empty list is reported as
    /// [`Error::NotFound`].
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /papi/v1/includes/{includeId}?contractId=..&groupId=..
    /// ```
    pub async fn get_include(&self, params: &GetIncludeRequest) -> Result<GetIncludeResponse> {
        tracing::debug!("GetInclude");
        params.validate()?;

        let request = HttpRequest::get(format!("/papi/v1/includes/{}", params.include_id))
            .query("contractId", &params.contract_id)
            .query("groupId", &params.group_id);

        let listed: ListIncludesResponse = self.exec("GetInclude", request, 200).await?.json()?;
        let include = listed.includes.items.first().cloned().ok_or_else(|| {
            Error::not_found(format!("get an include: IncludeID: {}", params.include_id))
        })?;

        Ok(GetIncludeResponse {
            includes: listed.includes,
            include,
        })
    }

    /// Create an include, optionally as a clone of another one
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /papi/v1/includes?contractId=..&groupId=..
    /// Content-Type: application/json
    ///
    /// {"includeName": "...", "includeType": "MICROSERVICES", "productId": "..."}
    /// ```
    pub async fn create_include(&self, params: &CreateIncludeRequest) -> Result<CreateIncludeResponse> {
        tracing::debug!("CreateInclude");
        params.validate()?;

        let body = serde_json::to_value(CreateIncludeBody {
            include_name: &params.include_name,
            include_type: params.include_type,
            product_id: &params.product_id,
            rule_format: &params.rule_format,
            clone_from: params.clone_from.as_ref(),
        })?;

        let request = HttpRequest::post("/papi/v1/includes")
            .query("contractId", &params.contract_id)
            .query("groupId", &params.group_id)
            .json(body);

        let response = self.exec("CreateInclude", request, 201).await?;
        let mut created: CreateIncludeResponse = response.json()?;
        created.response_headers = CreateIncludeResponseHeaders::from_response(&response);
        created.include_id = parse_response_link(&created.include_link)?;

        tracing::debug!("created include {}", created.include_id);
        Ok(created)
    }

    /// Delete an include
    ///
    /// # API Call
    ///
    /// ```http
    /// DELETE /papi/v1/includes/{includeId}
    /// ```
    pub async fn delete_include(&self, params: &DeleteIncludeRequest) -> Result<DeleteIncludeResponse> {
        tracing::debug!("DeleteInclude");
        params.validate()?;

        let request = HttpRequest::delete(format!("/papi/v1/includes/{}", params.include_id))
            .query_if(!params.contract_id.is_empty(), "contractId", &params.contract_id)
            .query_if(!params.group_id.is_empty(), "groupId", &params.group_id);

        self.exec("DeleteInclude", request, 200).await?.json()
    }
}
