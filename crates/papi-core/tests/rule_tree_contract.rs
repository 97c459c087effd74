//! Contract Test: Rule Tree Operations
//!
//! Verifies the request each rule tree operation puts on the wire and how
//! its response is mapped back.
//!
//! Constraints verified:
//! - Path, query and headers match the API for property and include trees
//! - Every request carries `PAPI-Use-Prefixes`
//! - Remote failures surface the problem document
//! - Undecodable trees are reported as malformed, never half-decoded
//!
//! If this test fails, the wire format of rule tree calls has drifted.

mod common;

use common::*;
use papi_core::client::{
    GetIncludeRuleTreeRequest, GetRuleTreeRequest, UpdateIncludeRuleTreeRequest,
    UpdateRulesRequest,
};
use papi_core::rules::{self, OptionValue, RuleLocation, RuleNode};
use papi_core::{Error, Method, PapiClient};
use serde_json::json;

fn get_request() -> GetRuleTreeRequest {
    GetRuleTreeRequest {
        property_id: "prp_175780".to_string(),
        property_version: 3,
        contract_id: "ctr_1-1TJZFW".to_string(),
        group_id: "grp_15166".to_string(),
        validate_mode: "fast".to_string(),
        validate_rules: false,
        rule_format: String::new(),
    }
}

#[tokio::test]
async fn get_rule_tree_builds_request_and_decodes_tree() {
    let (client, transport) = client_with(ScriptedTransport::new().respond(
        200,
        json!({
            "accountId": "act_1-1TJZFB",
            "contractId": "ctr_1-1TJZFW",
            "groupId": "grp_15166",
            "propertyId": "prp_175780",
            "propertyVersion": 3,
            "etag": "a872de3bbc7e7a4eb6e9e1a37b7f5c1b",
            "ruleFormat": "v2020-09-16",
            "rules": sample_rules()
        }),
    ));

    let response = client.get_rule_tree(&get_request()).await.unwrap();

    let request = transport.single_request();
    assert_eq!(request.method, Method::Get);
    assert_eq!(
        request.path_and_query(),
        "/papi/v1/properties/prp_175780/versions/3/rules?contractId=ctr_1-1TJZFW&groupId=grp_15166&validateMode=fast&validateRules=false"
    );
    assert_eq!(request.headers.get("PAPI-Use-Prefixes").map(String::as_str), Some("true"));
    assert!(!request.headers.contains_key("Accept"));
    assert!(request.body.is_none());

    assert_eq!(response.property_id, "prp_175780");
    assert_eq!(response.property_version, 3);
    assert_eq!(response.meta.etag, "a872de3bbc7e7a4eb6e9e1a37b7f5c1b");
    assert_eq!(response.rules.name, "default");
    assert_eq!(
        response.rules.behaviors[0].option("httpPort"),
        Some(&OptionValue::Number(80.0))
    );
    assert_eq!(response.rules.children[0].name, "Static Content");
}

#[tokio::test]
async fn rule_format_selects_accept_header() {
    let (client, transport) = client_with(
        ScriptedTransport::new().respond(200, json!({ "rules": { "name": "default" } })),
    );

    let params = GetRuleTreeRequest {
        rule_format: "v2023-01-05".to_string(),
        validate_rules: true,
        validate_mode: String::new(),
        ..get_request()
    };
    client.get_rule_tree(&params).await.unwrap();

    let request = transport.single_request();
    assert_eq!(
        request.headers.get("Accept").map(String::as_str),
        Some("application/vnd.akamai.papirules.v2023-01-05+json")
    );
    assert_eq!(request.query_param("validateRules"), None);
    assert_eq!(request.query_param("validateMode"), None);
}

#[tokio::test]
async fn use_prefixes_flag_is_sent() {
    let transport = ScriptedTransport::new().respond(200, json!({ "rules": { "name": "default" } }));
    let handle = ScriptedTransport::sharing_state_with(&transport);
    let client = PapiClient::new(Box::new(transport)).with_use_prefixes(false);

    client.get_rule_tree(&get_request()).await.unwrap();

    let request = handle.single_request();
    assert_eq!(request.headers.get("PAPI-Use-Prefixes").map(String::as_str), Some("false"));
}

#[tokio::test]
async fn update_rule_tree_sends_tree_and_reports_rule_errors() {
    let (client, transport) = client_with(ScriptedTransport::new().respond(
        200,
        json!({
            "propertyId": "prp_175780",
            "propertyVersion": 3,
            "rules": sample_rules(),
            "errors": [
                {
                    "type": "https://problems.luna.akamaiapis.net/papi/v0/validation/attribute_required",
                    "errorLocation": "#/rules/children/0/behaviors/0",
                    "detail": "The `ttl` option is required"
                }
            ]
        }),
    ));

    let tree = rules::decode(sample_rules()).unwrap();
    let params = UpdateRulesRequest {
        property_id: "prp_175780".to_string(),
        property_version: 3,
        contract_id: "ctr_1".to_string(),
        group_id: "grp_1".to_string(),
        dry_run: true,
        validate_mode: "full".to_string(),
        validate_rules: false,
        rules: tree.clone(),
        comments: "tighten caching".to_string(),
    };

    let response = client.update_rule_tree(&params).await.unwrap();

    let request = transport.single_request();
    assert_eq!(request.method, Method::Put);
    assert_eq!(
        request.path_and_query(),
        "/papi/v1/properties/prp_175780/versions/3/rules?contractId=ctr_1&groupId=grp_1&validateMode=full&validateRules=false&dryRun=true"
    );
    let body = request.body.expect("update sends a body");
    assert_eq!(body["comments"], "tighten caching");
    assert_eq!(body["rules"], rules::encode(&tree).unwrap());

    assert_eq!(response.meta.errors.len(), 1);
    let location = response.meta.errors[0].locate(&response.rules);
    assert!(matches!(
        location,
        Some(RuleLocation::Behavior { behavior, .. }) if behavior.name == "caching"
    ));
}

#[tokio::test]
async fn invalid_tree_is_never_sent() {
    let (client, transport) = client_with(ScriptedTransport::new());

    let params = UpdateRulesRequest {
        property_id: "prp_1".to_string(),
        property_version: 1,
        rules: RuleNode::new("default").with_child(RuleNode::new("")),
        ..Default::default()
    };

    let err = client.update_rule_tree(&params).await.unwrap_err();
    let report = err.validation_errors().expect("validation error");
    assert_eq!(report.paths(), vec!["Rules.Children[0].Name"]);
    assert!(err.to_string().starts_with("struct validation:\n"));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn remote_failure_carries_problem_document() {
    let (client, _transport) = client_with(ScriptedTransport::new().respond(
        500,
        json!({
            "type": "internal_error",
            "title": "Internal Server Error",
            "detail": "Error fetching rule tree",
            "status": 500
        }),
    ));

    let err = client.get_rule_tree(&get_request()).await.unwrap_err();
    let api = err.api_error().expect("remote error");
    assert_eq!(api.status_code, 500);
    assert_eq!(api.error_type, "internal_error");
    assert_eq!(api.title, "Internal Server Error");
    assert_eq!(api.detail, "Error fetching rule tree");
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn remote_not_found_is_not_found() {
    let (client, _transport) =
        client_with(ScriptedTransport::new().respond_raw(404, "no such property"));

    let err = client.get_rule_tree(&get_request()).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.api_error().map(|e| e.detail.as_str()), Some("no such property"));
}

#[tokio::test]
async fn malformed_tree_in_response() {
    let (client, _transport) = client_with(ScriptedTransport::new().respond(
        200,
        json!({
            "propertyId": "prp_1",
            "rules": { "behaviors": [ { "name": "origin", "options": [] } ] }
        }),
    ));

    let err = client.get_rule_tree(&get_request()).await.unwrap_err();
    assert!(matches!(err, Error::MalformedTree(_)), "got {:?}", err);
}

#[tokio::test]
async fn transport_failure_is_propagated_without_retry() {
    let (client, transport) = client_with(
        ScriptedTransport::new()
            .fail("connection reset")
            .respond(200, json!({ "rules": { "name": "default" } })),
    );

    let err = client.get_rule_tree(&get_request()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(ref msg) if msg == "connection reset"));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn include_rule_tree_round_trip() {
    let (client, transport) = client_with(
        ScriptedTransport::new()
            .respond(
                200,
                json!({
                    "includeId": "inc_123456",
                    "includeName": "test_include",
                    "includeType": "MICROSERVICES",
                    "includeVersion": 2,
                    "ruleFormat": "v2020-11-02",
                    "etag": "etag",
                    "rules": sample_rules()
                }),
            )
            .respond_with(
                papi_core::HttpResponse::new(
                    200,
                    json!({ "includeId": "inc_123456", "includeVersion": 2, "rules": sample_rules() })
                        .to_string(),
                )
                .with_header("x-limit-elements-per-property-remaining", "2978")
                .with_header("x-limit-elements-per-property-limit", "3000")
                .with_header("x-limit-max-nested-rules-per-include-remaining", "3")
                .with_header("x-limit-max-nested-rules-per-include-limit", "4"),
            ),
    );

    let fetched = client
        .get_include_rule_tree(&GetIncludeRuleTreeRequest {
            contract_id: "test_contract".to_string(),
            group_id: "test_group".to_string(),
            include_id: "inc_123456".to_string(),
            include_version: 2,
            validate_mode: "fast".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(fetched.include_name, "test_include");
    assert_eq!(fetched.rules.node_count(), 2);

    let updated = client
        .update_include_rule_tree(&UpdateIncludeRuleTreeRequest {
            contract_id: "test_contract".to_string(),
            group_id: "test_group".to_string(),
            include_id: "inc_123456".to_string(),
            include_version: 2,
            rules: fetched.rules.clone(),
            validate_rules: true,
            ..Default::default()
        })
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(
        requests[0].path_and_query(),
        "/papi/v1/includes/inc_123456/versions/2/rules?contractId=test_contract&groupId=test_group&validateMode=fast&validateRules=false"
    );
    assert_eq!(
        requests[1].path_and_query(),
        "/papi/v1/includes/inc_123456/versions/2/rules?contractId=test_contract&groupId=test_group"
    );
    assert_eq!(updated.response_headers.elements_per_property_remaining, Some(2978));
    assert_eq!(updated.response_headers.max_nested_rules_per_include_total, Some(4));
    assert_eq!(updated.rule_tree.rules, fetched.rules);
}

fn nested_rules(levels: usize) -> String {
    let mut rules = String::from(r#"{"name":"leaf","behaviors":[{"name":"caching","options":{"ttl":"1d"}}]}"#);
    for i in 1..levels {
        rules = format!(r#"{{"name":"level{}","children":[{}]}}"#, i, rules);
    }
    rules
}

#[tokio::test]
async fn deep_rule_trees_are_accepted() {
    let body = format!(r#"{{"propertyId":"prp_1","propertyVersion":1,"rules":{}}}"#, nested_rules(200));
    let (client, transport) = client_with(
        ScriptedTransport::new()
            .respond_raw(200, &body)
            .respond_raw(200, &body),
    );

    let fetched = client.get_rule_tree(&get_request()).await.unwrap();
    assert_eq!(fetched.rules.depth(), 200);
    assert_eq!(fetched.rules.find_behaviors("caching").len(), 1);

    let updated = client
        .update_rule_tree(&UpdateRulesRequest {
            property_id: "prp_1".to_string(),
            property_version: 1,
            rules: fetched.rules.clone(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.rules, fetched.rules);

    let sent = transport.requests()[1].body.clone().expect("update sends a body");
    assert_eq!(rules::decode(sent["rules"].clone()).unwrap(), fetched.rules);
}
