//! Declarative request validation
//!
//! Every request type declares its constraints as a table of
//! `(field path, value, rules)` rows. All rows are checked, the first failing
//! rule of each row is recorded, and violations come out in the order the
//! rows were declared.
//!
//! ```rust
//! use papi_core::validation::{Rule, Validation};
//!
//! let result = Validation::new()
//!     .field("IncludeID", "", &[Rule::Required])
//!     .field("ValidateMode", "fast", &[Rule::OneOf(&["fast", "full"])])
//!     .finish();
//!
//! let errs = result.unwrap_err();
//! assert_eq!(errs.paths(), vec!["IncludeID"]);
//! ```

use regex::Regex;
use std::fmt;

/// A single constraint on a field value
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Value must be non-empty / non-zero
    Required,
    /// Optional value must be present (an empty string is fine)
    NotNil,
    /// Value must be one of the listed tokens; empty values pass
    OneOf(&'static [&'static str]),
    /// String must match the pattern; empty values pass
    Pattern(&'static Regex),
    /// Value is required only when the evaluated condition holds
    RequiredIf(bool),
}

/// A field value as seen by the validator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// A string field
    Str(&'a str),
    /// A numeric field
    Int(i64),
    /// A flag
    Bool(bool),
    /// A nullable string field
    Opt(Option<&'a str>),
}

impl FieldValue<'_> {
    fn is_empty(&self) -> bool {
        match self {
            FieldValue::Str(s) => s.is_empty(),
            FieldValue::Int(n) => *n == 0,
            FieldValue::Bool(b) => !*b,
            FieldValue::Opt(v) => v.is_none_or(str::is_empty),
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            FieldValue::Opt(v) => *v,
            _ => None,
        }
    }
}

impl<'a> From<&'a str> for FieldValue<'a> {
    fn from(value: &'a str) -> Self {
        FieldValue::Str(value)
    }
}

impl<'a> From<&'a String> for FieldValue<'a> {
    fn from(value: &'a String) -> Self {
        FieldValue::Str(value.as_str())
    }
}

impl<'a> From<Option<&'a str>> for FieldValue<'a> {
    fn from(value: Option<&'a str>) -> Self {
        FieldValue::Opt(value)
    }
}

impl From<u32> for FieldValue<'_> {
    fn from(value: u32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<i64> for FieldValue<'_> {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<bool> for FieldValue<'_> {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl Rule {
    /// Check one value, returning the violation message if any
    fn check(&self, value: &FieldValue<'_>) -> Option<&'static str> {
        match self {
            Rule::Required => value.is_empty().then_some("cannot be blank"),
            Rule::RequiredIf(condition) => {
                (*condition && value.is_empty()).then_some("cannot be blank")
            }
            Rule::NotNil => {
                matches!(value, FieldValue::Opt(None)).then_some("is required")
            }
            Rule::OneOf(allowed) => {
                if value.is_empty() {
                    return None;
                }
                let matched = value.as_str().is_some_and(|s| allowed.contains(&s));
                (!matched).then_some("must be a valid value")
            }
            Rule::Pattern(regex) => {
                if value.is_empty() {
                    return None;
                }
                let matched = value.as_str().is_some_and(|s| regex.is_match(s));
                (!matched).then_some("must be in a valid format")
            }
        }
    }
}

/// One violated constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Field path, e.g. `CloneFrom.IncludeID` or `Rules.Children[0].Name`
    pub path: String,
    /// Human-readable explanation
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Aggregated validation report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    /// All violations in declaration order
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Violated field paths in declaration order
    pub fn paths(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.path.as_str()).collect()
    }

    /// Whether a given path was violated
    pub fn contains(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }

    /// Number of violations
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True when there are no violations
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for violation in &self.violations {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{}", violation)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Builder for a validation table
#[derive(Debug, Default)]
#[must_use = "call finish() to obtain the validation result"]
pub struct Validation {
    violations: Vec<Violation>,
}

impl Validation {
    /// Start an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one row: the field path, its value and its rules
    pub fn field<'a>(mut self, path: &str, value: impl Into<FieldValue<'a>>, rules: &[Rule]) -> Self {
        let value = value.into();
        if let Some(message) = rules.iter().find_map(|rule| rule.check(&value)) {
            self.violations.push(Violation {
                path: path.to_string(),
                message: message.to_string(),
            });
        }
        self
    }

    /// Merge the report of a nested validation under a path prefix
    pub fn nested(mut self, prefix: &str, result: Result<(), ValidationErrors>) -> Self {
        if let Err(errs) = result {
            self.violations.extend(errs.violations.into_iter().map(|v| Violation {
                path: join_path(prefix, &v.path),
                message: v.message,
            }));
        }
        self
    }

    /// Finish the table
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                violations: self.violations,
            })
        }
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else if path.starts_with('[') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}.{}", prefix, path)
    }
}
