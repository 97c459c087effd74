//! Include versions and the catalog of criteria and behaviors they accept

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::includes::IncludeType;
use super::{PapiClient, parse_response_link};
use crate::error::{Error, Result};
use crate::traits::HttpRequest;
use crate::validation::{Rule, Validation, ValidationErrors};

/// Activation status of a version on one network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    Active,
    Inactive,
    Pending,
    Deactivated,
    /// A status this client does not know, kept verbatim
    #[serde(untagged)]
    Other(String),
}

/// One version of an include
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeVersion {
    #[serde(default)]
    pub updated_by_user: String,
    pub updated_date: DateTime<Utc>,
    pub production_status: VersionStatus,
    #[serde(default)]
    pub etag: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rule_format: String,
    pub include_version: u32,
    pub staging_status: VersionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncludeVersionItems {
    #[serde(default)]
    pub items: Vec<IncludeVersion>,
}

/// Parameters for creating a version from an existing one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateIncludeVersionRequest {
    pub include_id: String,
    pub create_from_version: u32,
    /// Only create if the source version still has this etag
    pub create_from_version_etag: String,
}

impl CreateIncludeVersionRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("IncludeID", &self.include_id, &[Rule::Required])
            .field("CreateFromVersion", self.create_from_version, &[Rule::Required])
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIncludeVersionBody<'a> {
    create_from_version: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    create_from_version_etag: &'a str,
}

/// Result of creating a version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncludeVersionResponse {
    pub version_link: String,
    /// Version number taken from `version_link`
    #[serde(skip)]
    pub version: u32,
}

/// Parameters for fetching one version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetIncludeVersionRequest {
    pub include_id: String,
    pub version: u32,
    pub contract_id: String,
    pub group_id: String,
}

impl GetIncludeVersionRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("IncludeID", &self.include_id, &[Rule::Required])
            .field("Version", self.version, &[Rule::Required])
            .field("ContractID", &self.contract_id, &[Rule::Required])
            .field("GroupID", &self.group_id, &[Rule::Required])
            .finish()
    }
}

/// Parameters for listing versions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListIncludeVersionsRequest {
    pub include_id: String,
    pub contract_id: String,
    pub group_id: String,
}

impl ListIncludeVersionsRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("IncludeID", &self.include_id, &[Rule::Required])
            .field("ContractID", &self.contract_id, &[Rule::Required])
            .field("GroupID", &self.group_id, &[Rule::Required])
            .finish()
    }
}

/// Versions of an include, newest first, at most 500
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListIncludeVersionsResponse {
    #[serde(default)]
    pub include_id: String,
    #[serde(default)]
    pub include_name: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub contract_id: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub include_type: Option<IncludeType>,
    #[serde(rename = "versions", default)]
    pub include_versions: IncludeVersionItems,
}

/// One version, plus the envelope it was extracted from
#[derive(Debug, Clone, PartialEq)]
pub struct GetIncludeVersionResponse {
    pub listing: ListIncludeVersionsResponse,
    pub include_version: IncludeVersion,
}

/// Parameters for listing the criteria a version accepts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListAvailableCriteriaRequest {
    pub include_id: String,
    pub version: u32,
}

impl ListAvailableCriteriaRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("IncludeID", &self.include_id, &[Rule::Required])
            .field("Version", self.version, &[Rule::Required])
            .finish()
    }
}

/// Parameters for listing the behaviors a version accepts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListAvailableBehaviorsRequest {
    pub include_id: String,
    pub version: u32,
}

impl ListAvailableBehaviorsRequest {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        Validation::new()
            .field("IncludeID", &self.include_id, &[Rule::Required])
            .field("Version", self.version, &[Rule::Required])
            .finish()
    }
}

/// A criterion or behavior name with a link to its option schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableItem {
    pub name: String,
    #[serde(default)]
    pub schema_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableItems {
    #[serde(default)]
    pub items: Vec<AvailableItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableCriteriaResponse {
    #[serde(default)]
    pub contract_id: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub rule_format: String,
    #[serde(rename = "criteria", default)]
    pub available_criteria: AvailableItems,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableBehaviorsResponse {
    #[serde(default)]
    pub contract_id: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub rule_format: String,
    #[serde(rename = "behaviors", default)]
    pub available_behaviors: AvailableItems,
}

fn versions_path(include_id: &str) -> String {
    format!("/papi/v1/includes/{}/versions", include_id)
}

impl PapiClient {
    /// Create a new version of an include, copied from an existing one
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /papi/v1/includes/{includeId}/versions
    /// Content-Type: application/json
    ///
    /// {"createFromVersion": 1}
    /// ```
    pub async fn create_include_version(
        &self,
        params: &CreateIncludeVersionRequest,
    ) -> Result<CreateIncludeVersionResponse> {
        tracing::debug!("CreateIncludeVersion");
        params.validate()?;

        let body = serde_json::to_value(CreateIncludeVersionBody {
            create_from_version: params.create_from_version,
            create_from_version_etag: &params.create_from_version_etag,
        })?;
        let request = HttpRequest::post(versions_path(&params.include_id)).json(body);

        let response = self.exec("CreateIncludeVersion", request, 201).await?;
        let mut created: CreateIncludeVersionResponse = response.json()?;

        let segment = parse_response_link(&created.version_link)?;
        created.version = segment.parse().map_err(|_| {
            Error::invalid_link(format!(
                "version link {:?} does not end in a version number",
                created.version_link
            ))
        })?;

        Ok(created)
    }

    /// Fetch one version of an include
    ///
    /// An empty version list is reported as [`Error::NotFound`].
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /papi/v1/includes/{includeId}/versions/{version}?contractId=..&groupId=..
    /// ```
    pub async fn get_include_version(
        &self,
        params: &GetIncludeVersionRequest,
    ) -> Result<GetIncludeVersionResponse> {
        tracing::debug!("GetIncludeVersion");
        params.validate()?;

        let request = HttpRequest::get(format!(
            "{}/{}",
            versions_path(&params.include_id),
            params.version
        ))
        .query("contractId", &params.contract_id)
        .query("groupId", &params.group_id);

        let listing: ListIncludeVersionsResponse =
            self.exec("GetIncludeVersion", request, 200).await?.json()?;
        let include_version = listing
            .include_versions
            .items
            .first()
            .cloned()
            .ok_or_else(|| {
                Error::not_found(format!(
                    "get an include version: IncludeID: {}",
                    params.include_id
                ))
            })?;

        Ok(GetIncludeVersionResponse {
            listing,
            include_version,
        })
    }

    /// List the versions of an include
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /papi/v1/includes/{includeId}/versions?contractId=..&groupId=..
    /// ```
    pub async fn list_include_versions(
        &self,
        params: &ListIncludeVersionsRequest,
    ) -> Result<ListIncludeVersionsResponse> {
        tracing::debug!("ListIncludeVersions");
        params.validate()?;

        let request = HttpRequest::get(versions_path(&params.include_id))
            .query("contractId", &params.contract_id)
            .query("groupId", &params.group_id);

        self.exec("ListIncludeVersions", request, 200).await?.json()
    }

    /// List the criteria an include version may use
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /papi/v1/includes/{includeId}/versions/{version}/available-criteria
    /// ```
    pub async fn list_include_version_available_criteria(
        &self,
        params: &ListAvailableCriteriaRequest,
    ) -> Result<AvailableCriteriaResponse> {
        tracing::debug!("ListIncludeVersionAvailableCriteria");
        params.validate()?;

        let request = HttpRequest::get(format!(
            "{}/{}/available-criteria",
            versions_path(&params.include_id),
            params.version
        ));

        self.exec("ListIncludeVersionAvailableCriteria", request, 200)
            .await?
            .json()
    }

    /// List the behaviors an include version may use
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /papi/v1/includes/{includeId}/versions/{version}/available-behaviors
    /// ```
    pub async fn list_include_version_available_behaviors(
        &self,
        params: &ListAvailableBehaviorsRequest,
    ) -> Result<AvailableBehaviorsResponse> {
        tracing::debug!("ListIncludeVersionAvailableBehaviors");
        params.validate()?;

        let request = HttpRequest::get(format!(
            "{}/{}/available-behaviors",
            versions_path(&params.include_id),
            params.version
        ));

        self.exec("ListIncludeVersionAvailableBehaviors", request, 200)
            .await?
            .json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_include_version_decodes_timestamps_and_statuses() {
        let version: IncludeVersion = serde_json::from_value(json!({
            "updatedByUser": "test_user",
            "updatedDate": "2022-08-22T07:17:48Z",
            "productionStatus": "INACTIVE",
            "etag": "1d8ed19bce0833a3fe93e62ae5d5579a38cc2dbe",
            "productId": "prd_Site_Defender",
            "includeVersion": 2,
            "stagingStatus": "ACTIVE"
        }))
        .unwrap();

        assert_eq!(
            version.updated_date,
            Utc.with_ymd_and_hms(2022, 8, 22, 7, 17, 48).unwrap()
        );
        assert_eq!(version.production_status, VersionStatus::Inactive);
        assert_eq!(version.staging_status, VersionStatus::Active);
        assert_eq!(version.include_version, 2);
        assert!(version.note.is_empty());
    }

    #[test]
    fn test_unknown_status_is_kept() {
        let status: VersionStatus = serde_json::from_value(json!("ACTIVATING")).unwrap();
        assert_eq!(status, VersionStatus::Other("ACTIVATING".to_string()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("ACTIVATING"));

        let known: VersionStatus = serde_json::from_value(json!("DEACTIVATED")).unwrap();
        assert_eq!(known, VersionStatus::Deactivated);
    }

    #[test]
    fn test_version_requests_require_identifiers() {
        let errs = GetIncludeVersionRequest::default().validate().unwrap_err();
        assert_eq!(errs.paths(), vec!["IncludeID", "Version", "ContractID", "GroupID"]);

        let errs = CreateIncludeVersionRequest::default().validate().unwrap_err();
        assert_eq!(errs.paths(), vec!["IncludeID", "CreateFromVersion"]);

        let errs = ListAvailableBehaviorsRequest {
            include_id: "inc_1".to_string(),
            version: 0,
        }
        .validate()
        .unwrap_err();
        assert_eq!(errs.paths(), vec!["Version"]);
    }

    #[test]
    fn test_create_body_omits_empty_etag() {
        let body = serde_json::to_value(CreateIncludeVersionBody {
            create_from_version: 1,
            create_from_version_etag: "",
        })
        .unwrap();
        assert_eq!(body, json!({ "createFromVersion": 1 }));
    }
}
