//! Include rule tree fetch against a real account
//!
//! Loads credentials from `AKAMAI_*` environment variables, fetches an
//! include version and its rule tree, and optionally writes the tree back
//! as a dry run so the API validates it without saving.
//!
//! Requests are sent unsigned (`NoopSigner`); point `AKAMAI_HOST` at a
//! signing proxy or plug in a `RequestSigner` for direct access.
//!
//! Environment:
//! - `AKAMAI_HOST`, `AKAMAI_CLIENT_TOKEN`, `AKAMAI_CLIENT_SECRET`,
//!   `AKAMAI_ACCESS_TOKEN` (or `AKAMAI_{SECTION}_*` with `PAPI_SECTION`)
//! - `PAPI_CONTRACT_ID`, `PAPI_GROUP_ID`, `PAPI_INCLUDE_ID`: required
//! - `PAPI_INCLUDE_VERSION`: default 1
//! - `PAPI_MODE`: `read` (default) or `dry-run`

use anyhow::Context;
use papi_core::client::{
    GetIncludeRuleTreeRequest, GetIncludeVersionRequest, UpdateIncludeRuleTreeRequest,
    VALIDATE_MODE_FULL,
};
use papi_core::{ClientConfig, PapiClient};
use papi_transport_reqwest::ReqwestTransport;
use std::env;

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} environment variable is required", key))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let section = env::var("PAPI_SECTION").unwrap_or_else(|_| "default".to_string());
    let config = ClientConfig::from_env(&section)?;
    let contract_id = required("PAPI_CONTRACT_ID")?;
    let group_id = required("PAPI_GROUP_ID")?;
    let include_id = required("PAPI_INCLUDE_ID")?;
    let include_version: u32 = env::var("PAPI_INCLUDE_VERSION")
        .unwrap_or_else(|_| "1".to_string())
        .parse()
        .context("PAPI_INCLUDE_VERSION must be a positive integer")?;
    let dry_run = env::var("PAPI_MODE").is_ok_and(|mode| mode.eq_ignore_ascii_case("dry-run"));

    tracing::info!("Configuration: {:?}", config);
    if dry_run {
        tracing::warn!("Running in DRY-RUN mode - the tree is validated, not saved");
    }

    let transport = ReqwestTransport::from_config(&config)?;
    let client = PapiClient::new(Box::new(transport)).with_use_prefixes(config.use_prefixes);

    tracing::info!("--- Step 1: Include version ---");
    let version = client
        .get_include_version(&GetIncludeVersionRequest {
            include_id: include_id.clone(),
            version: include_version,
            contract_id: contract_id.clone(),
            group_id: group_id.clone(),
        })
        .await?;
    tracing::info!(
        "{} v{}: staging={:?} production={:?} updated {} by {}",
        version.listing.include_name,
        version.include_version.include_version,
        version.include_version.staging_status,
        version.include_version.production_status,
        version.include_version.updated_date,
        version.include_version.updated_by_user
    );

    tracing::info!("--- Step 2: Rule tree ---");
    let tree = client
        .get_include_rule_tree(&GetIncludeRuleTreeRequest {
            contract_id: contract_id.clone(),
            group_id: group_id.clone(),
            include_id: include_id.clone(),
            include_version,
            validate_rules: true,
            ..Default::default()
        })
        .await?;
    tracing::info!(
        "Rule format {}: {} rules, depth {}",
        tree.rule_format,
        tree.rules.node_count(),
        tree.rules.depth()
    );
    for warning in &tree.meta.warnings {
        tracing::warn!("{}: {}", warning.error_location, warning.detail);
    }

    if !dry_run {
        return Ok(());
    }

    tracing::info!("--- Step 3: Dry-run update ---");
    let updated = client
        .update_include_rule_tree(&UpdateIncludeRuleTreeRequest {
            contract_id,
            group_id,
            include_id,
            include_version,
            dry_run: true,
            validate_mode: VALIDATE_MODE_FULL.to_string(),
            validate_rules: true,
            rules: tree.rules,
            comments: tree.comments,
        })
        .await?;

    for error in &updated.rule_tree.meta.errors {
        let owner = error
            .locate(&updated.rule_tree.rules)
            .map(|location| location.node().name.clone())
            .unwrap_or_default();
        tracing::error!("✗ {} (rule '{}'): {}", error.error_location, owner, error.detail);
    }
    tracing::info!(
        "Elements remaining: {:?} of {:?}",
        updated.response_headers.elements_per_property_remaining,
        updated.response_headers.elements_per_property_total
    );

    Ok(())
}
