//! Offline rule tree inspection
//!
//! Decodes a rule tree, validates it, prints its outline and resolves an
//! error location against it. No network access.
//!
//! Environment:
//! - `PAPI_RULES_FILE`: JSON file holding a rule tree (a bare tree or a full
//!   rule tree response with a `rules` field); a built-in sample is used
//!   when unset
//! - `PAPI_ERROR_LOCATION`: pointer to resolve, default
//!   `#/rules/children/0/behaviors/0`

use anyhow::Context;
use papi_core::rules::{self, RuleLocation, RuleNode};
use std::env;

const SAMPLE: &str = r#"{
    "name": "default",
    "options": { "is_secure": false },
    "behaviors": [
        { "name": "origin", "options": { "hostname": "origin.example.com", "httpPort": 80 } },
        { "name": "cpCode", "options": { "value": { "id": 12345 } } }
    ],
    "children": [
        {
            "name": "Static Content",
            "criteria": [
                { "name": "fileExtension", "options": { "matchOperator": "IS_ONE_OF", "values": ["css", "js"] } }
            ],
            "behaviors": [
                { "name": "caching", "options": { "behavior": "MAX_AGE", "ttl": "7d" } }
            ]
        },
        {
            "name": "",
            "behaviors": [ { "name": "gzipResponse", "options": { "behavior": "ALWAYS" } } ]
        }
    ]
}"#;

fn load_tree() -> anyhow::Result<RuleNode> {
    let raw = match env::var("PAPI_RULES_FILE") {
        Ok(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path))?,
        Err(_) => SAMPLE.to_string(),
    };

    let mut document: serde_json::Value =
        serde_json::from_str(&raw).context("rule tree file is not JSON")?;
    if let Some(inner) = document.get_mut("rules") {
        document = inner.take();
    }

    Ok(rules::decode(document)?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let tree = load_tree()?;
    tracing::info!(
        "Decoded rule tree '{}': {} rules, depth {}",
        tree.name,
        tree.node_count(),
        tree.depth()
    );

    tracing::info!("--- Outline ---");
    for (path, node) in tree.walk_with_paths() {
        let indent = "  ".repeat(path.len());
        let behaviors: Vec<&str> = node.behaviors.iter().map(|b| b.name.as_str()).collect();
        tracing::info!(
            "{}{} [{}] criteria={} behaviors={:?}",
            indent,
            if node.name.is_empty() { "<unnamed>" } else { node.name.as_str() },
            path,
            node.criteria.len(),
            behaviors
        );
    }

    tracing::info!("--- Validation ---");
    match tree.validate() {
        Ok(()) => tracing::info!("✓ Rule tree is well formed"),
        Err(errs) => {
            for violation in errs.violations() {
                tracing::warn!("✗ {}", violation);
            }
        }
    }

    tracing::info!("--- Caching behaviors ---");
    for (path, behavior) in tree.find_behaviors("caching") {
        let ttl = behavior
            .option("ttl")
            .and_then(|v| v.as_str())
            .unwrap_or("<none>");
        tracing::info!("{} ttl={}", path, ttl);
    }

    let pointer = env::var("PAPI_ERROR_LOCATION")
        .unwrap_or_else(|_| "#/rules/children/0/behaviors/0".to_string());
    tracing::info!("--- Locating {} ---", pointer);
    match tree.locate(&pointer) {
        Some(RuleLocation::Node(node)) => tracing::info!("rule '{}'", node.name),
        Some(RuleLocation::Behavior { node, behavior }) => {
            tracing::info!("behavior '{}' in rule '{}'", behavior.name, node.name)
        }
        Some(RuleLocation::Criterion { node, criterion }) => {
            tracing::info!("criterion '{}' in rule '{}'", criterion.name, node.name)
        }
        None => tracing::warn!("location does not exist in this tree"),
    }

    println!("{}", serde_json::to_string_pretty(&rules::encode(&tree)?)?);
    Ok(())
}
