//! Rule tree model
//!
//! A rule tree is the recursive configuration document of a property or an
//! include version. Each node carries match criteria, behaviors with free-form
//! options, child rules and some provenance metadata.
//!
//! Presence semantics follow the API: empty sequences and strings are left
//! out of the encoded document, `MatchEntry::options` is always emitted, and
//! variable `value`/`description` are emitted even when null.

mod value;
mod walk;

pub use value::{OptionValue, RuleOptionsMap};
pub use walk::{RuleLocation, RulePath, Walk, WalkWithPaths};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::validation::{Rule, Validation, ValidationErrors};

/// One node of a rule tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleNode {
    /// Rule name, required
    pub name: String,

    /// Match conditions, in declared order
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub criteria: Vec<MatchEntry>,

    /// Behaviors, applied in declared order
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub behaviors: Vec<MatchEntry>,

    /// Nested rules
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RuleNode>,

    /// Fixed node flags
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "RuleOptions::is_empty")]
    pub options: RuleOptions,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comments: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_override: Option<RuleCustomOverride>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<RuleVariable>,

    /// Whether the criteria of this node are locked in the editor
    #[serde(default, skip_serializing_if = "is_false")]
    pub criteria_locked: bool,

    /// How the criteria combine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_must_satisfy: Option<CriteriaMustSatisfy>,

    /// Raw advanced override XML
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub advanced_override: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub template_uuid: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub template_link: String,
}

/// A behavior or a criterion: a name plus an option bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    /// Behavior or criterion name, opaque to the model
    pub name: String,

    /// Free-form options, always emitted
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: RuleOptionsMap,

    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub template_uuid: String,
}

/// Node flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOptions {
    /// Whether the rule applies to secure traffic only; `None` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_secure: Option<bool>,
}

impl RuleOptions {
    /// True when no flag is present
    pub fn is_empty(&self) -> bool {
        self.is_secure.is_none()
    }
}

/// Reference to a custom override defined on the account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCustomOverride {
    pub name: String,
    pub override_id: String,
}

/// A user variable declared on the default rule
///
/// `value` and `description` are nullable and always emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleVariable {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub sensitive: bool,
}

/// How the criteria of a node combine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriteriaMustSatisfy {
    /// Every criterion must match
    All,
    /// At least one criterion must match
    Any,
    /// A value this client does not know, kept verbatim
    #[serde(untagged)]
    Other(String),
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Decode `null` the same way as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RuleNode {
    /// Create an empty node with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a behavior
    pub fn with_behavior(mut self, behavior: MatchEntry) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// Append a criterion
    pub fn with_criterion(mut self, criterion: MatchEntry) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Append a child rule
    pub fn with_child(mut self, child: RuleNode) -> Self {
        self.children.push(child);
        self
    }

    /// Check the shape of the whole tree
    ///
    /// Every node needs a name, a custom override needs both its name and
    /// ID, and every variable needs a name and a (possibly empty) value.
    /// Paths are relative to the root, e.g. `Children[1].Variables[0].Value`.
    /// Behaviors and criteria are not inspected.
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        self.walk_with_paths()
            .fold(Validation::new(), |table, (path, node)| {
                table.nested(&path.to_field_path(), node.validate_own_fields())
            })
            .finish()
    }

    fn validate_own_fields(&self) -> std::result::Result<(), ValidationErrors> {
        let mut table = Validation::new().field("Name", &self.name, &[Rule::Required]);

        if let Some(custom_override) = &self.custom_override {
            table = table
                .field("CustomOverride.Name", &custom_override.name, &[Rule::Required])
                .field(
                    "CustomOverride.OverrideID",
                    &custom_override.override_id,
                    &[Rule::Required],
                );
        }

        for (i, variable) in self.variables.iter().enumerate() {
            table = table
                .field(&format!("Variables[{}].Name", i), &variable.name, &[Rule::Required])
                .field(
                    &format!("Variables[{}].Value", i),
                    variable.value.as_deref(),
                    &[Rule::NotNil],
                );
        }

        table.finish()
    }
}

impl MatchEntry {
    /// Create an entry with no options
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set one option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Look up one option
    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }
}

/// Encode a rule tree to its JSON document
///
/// The stack grows on demand, so tree depth is not limited by the
/// serializer's recursion.
pub fn encode(node: &RuleNode) -> Result<serde_json::Value> {
    Ok(to_value_unbounded(node)?)
}

/// Decode a rule tree from its JSON document
///
/// Any structural problem (missing `name`, options that are not an object,
/// wrongly typed fields) fails the whole decode with [`Error::MalformedTree`].
/// Nesting depth is not limited.
pub fn decode(value: serde_json::Value) -> Result<RuleNode> {
    RuleNode::deserialize(serde_stacker::Deserializer::new(value))
        .map_err(|e| Error::malformed_tree(e.to_string()))
}

/// Decode a rule tree from raw JSON bytes
pub fn decode_slice(bytes: &[u8]) -> Result<RuleNode> {
    from_slice_unbounded(bytes).map_err(|e| Error::malformed_tree(e.to_string()))
}

/// Parse JSON with serde_json's recursion limit off, growing the stack as needed
///
/// Each rule tree level is two JSON levels (the node and its `children`
/// array), so the default limit of 128 would cap trees at 64 levels.
pub(crate) fn from_slice_unbounded<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    let mut json = serde_json::Deserializer::from_slice(bytes);
    json.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(value)
}

/// Serialize to a JSON value, growing the stack as needed
pub(crate) fn to_value_unbounded<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<serde_json::Value> {
    value.serialize(serde_stacker::Serializer::new(serde_json::value::Serializer))
}
