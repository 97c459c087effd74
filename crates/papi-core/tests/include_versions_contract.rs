//! Contract Test: Include Version Operations
//!
//! Constraints verified:
//! - The version number of a created version comes from its link
//! - A link that does not end in a number is rejected
//! - Get reports an empty version listing as not found
//! - Available criteria and behaviors are listed per version

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use papi_core::client::{
    CreateIncludeVersionRequest, GetIncludeVersionRequest, ListAvailableBehaviorsRequest,
    ListAvailableCriteriaRequest, ListIncludeVersionsRequest, VersionStatus,
};
use papi_core::Error;
use serde_json::json;

fn versions_listing(items: serde_json::Value) -> serde_json::Value {
    json!({
        "accountId": "test_account",
        "contractId": "test_contract",
        "groupId": "test_group",
        "assetId": "test_asset",
        "includeId": "inc_12345",
        "includeName": "tf_test_include",
        "includeType": "MICROSERVICES",
        "versions": { "items": items }
    })
}

#[tokio::test]
async fn create_include_version_reads_number_from_link() {
    let (client, transport) = client_with(ScriptedTransport::new().respond(
        201,
        json!({ "versionLink": "/papi/v1/includes/inc_12345/versions/5?contractId=c&groupId=g" }),
    ));

    let created = client
        .create_include_version(&CreateIncludeVersionRequest {
            include_id: "inc_12345".to_string(),
            create_from_version: 4,
            create_from_version_etag: String::new(),
        })
        .await
        .unwrap();

    assert_eq!(created.version, 5);
    let request = transport.single_request();
    assert_eq!(request.path_and_query(), "/papi/v1/includes/inc_12345/versions");
    assert_eq!(request.body, Some(json!({ "createFromVersion": 4 })));
}

#[tokio::test]
async fn create_include_version_with_non_numeric_link() {
    let (client, _transport) = client_with(ScriptedTransport::new().respond(
        201,
        json!({ "versionLink": "/papi/v1/includes/inc_12345/versions/latest" }),
    ));

    let err = client
        .create_include_version(&CreateIncludeVersionRequest {
            include_id: "inc_12345".to_string(),
            create_from_version: 1,
            create_from_version_etag: "etag".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidResponseLink(_)), "got {:?}", err);
}

#[tokio::test]
async fn get_include_version_returns_first_item() {
    let (client, transport) = client_with(ScriptedTransport::new().respond(
        200,
        versions_listing(json!([
            {
                "updatedByUser": "test_user",
                "updatedDate": "2022-08-22T07:17:48Z",
                "productionStatus": "INACTIVE",
                "stagingStatus": "ACTIVE",
                "etag": "1d8ed19bce0833a3fe93e62ae5d5579a38cc2dbe",
                "productId": "prd_Site_Defender",
                "ruleFormat": "v2020-11-02",
                "includeVersion": 2
            }
        ])),
    ));

    let response = client
        .get_include_version(&GetIncludeVersionRequest {
            include_id: "inc_12345".to_string(),
            version: 2,
            contract_id: "test_contract".to_string(),
            group_id: "test_group".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        transport.single_request().path_and_query(),
        "/papi/v1/includes/inc_12345/versions/2?contractId=test_contract&groupId=test_group"
    );
    assert_eq!(response.listing.include_name, "tf_test_include");
    assert_eq!(response.include_version.include_version, 2);
    assert_eq!(response.include_version.staging_status, VersionStatus::Active);
    assert_eq!(
        response.include_version.updated_date,
        Utc.with_ymd_and_hms(2022, 8, 22, 7, 17, 48).unwrap()
    );
}

#[tokio::test]
async fn get_include_version_empty_listing_is_not_found() {
    let (client, _transport) =
        client_with(ScriptedTransport::new().respond(200, versions_listing(json!([]))));

    let err = client
        .get_include_version(&GetIncludeVersionRequest {
            include_id: "inc_12345".to_string(),
            version: 2,
            contract_id: "test_contract".to_string(),
            group_id: "test_group".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.to_string().contains("get an include version: IncludeID: inc_12345"));
}

#[tokio::test]
async fn list_include_versions() {
    let (client, _transport) = client_with(ScriptedTransport::new().respond(
        200,
        versions_listing(json!([
            {
                "updatedDate": "2022-08-23T10:00:00Z",
                "productionStatus": "PENDING",
                "stagingStatus": "INACTIVE",
                "includeVersion": 3
            },
            {
                "updatedDate": "2022-08-22T07:17:48Z",
                "productionStatus": "ACTIVE",
                "stagingStatus": "DEACTIVATED",
                "includeVersion": 2
            }
        ])),
    ));

    let listed = client
        .list_include_versions(&ListIncludeVersionsRequest {
            include_id: "inc_12345".to_string(),
            contract_id: "test_contract".to_string(),
            group_id: "test_group".to_string(),
        })
        .await
        .unwrap();

    let statuses: Vec<_> = listed
        .include_versions
        .items
        .iter()
        .map(|v| (v.include_version, v.production_status.clone()))
        .collect();
    assert_eq!(
        statuses,
        vec![(3, VersionStatus::Pending), (2, VersionStatus::Active)]
    );
}

#[tokio::test]
async fn list_available_criteria_and_behaviors() {
    let (client, transport) = client_with(
        ScriptedTransport::new()
            .respond(
                200,
                json!({
                    "contractId": "test_contract",
                    "groupId": "test_group",
                    "productId": "prd_Site_Defender",
                    "ruleFormat": "v2020-11-02",
                    "criteria": {
                        "items": [
                            { "name": "bucket", "schemaLink": "/papi/v1/schemas/products/prd_Site_Defender/latest#%2Fdefinitions%2Fcatalog%2Fcriteria%2Fbucket" }
                        ]
                    }
                }),
            )
            .respond(
                200,
                json!({
                    "contractId": "test_contract",
                    "behaviors": {
                        "items": [
                            { "name": "origin", "schemaLink": "/papi/v1/schemas/origin" },
                            { "name": "caching", "schemaLink": "/papi/v1/schemas/caching" }
                        ]
                    }
                }),
            ),
    );

    let criteria = client
        .list_include_version_available_criteria(&ListAvailableCriteriaRequest {
            include_id: "inc_12345".to_string(),
            version: 2,
        })
        .await
        .unwrap();
    let behaviors = client
        .list_include_version_available_behaviors(&ListAvailableBehaviorsRequest {
            include_id: "inc_12345".to_string(),
            version: 2,
        })
        .await
        .unwrap();

    assert_eq!(criteria.available_criteria.items[0].name, "bucket");
    assert_eq!(criteria.product_id, "prd_Site_Defender");
    let names: Vec<_> = behaviors
        .available_behaviors
        .items
        .iter()
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(names, vec!["origin", "caching"]);

    let paths: Vec<_> = transport.requests().iter().map(|r| r.path_and_query()).collect();
    assert_eq!(
        paths,
        vec![
            "/papi/v1/includes/inc_12345/versions/2/available-criteria",
            "/papi/v1/includes/inc_12345/versions/2/available-behaviors",
        ]
    );
}

#[tokio::test]
async fn version_requests_validate_before_sending() {
    let (client, transport) = client_with(ScriptedTransport::new());

    let err = client
        .list_include_version_available_behaviors(&ListAvailableBehaviorsRequest::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.validation_errors().map(|e| e.paths()),
        Some(vec!["IncludeID", "Version"])
    );
    assert_eq!(transport.call_count(), 0);
}
