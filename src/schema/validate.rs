//! # Schema Validation
//!
//! Evaluates JSON documents against compiled schemas (draft 2020-12) and
//! reports failures as a tree of [`OutputUnit`]s.
//!
//! Errors raised inside an `allOf`, `anyOf`, or `oneOf` branch are nested
//! under a unit for the composition keyword, one child per error of each
//! failing branch. `additionalProperties` and `unevaluatedProperties`
//! failures outside a branch carry one child per offending property, located
//! at that property.

use std::collections::HashMap;
use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{BasicOutput, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SchemaStore;
use crate::error::Result;

const COMPOSITION: [&str; 3] = ["allOf", "anyOf", "oneOf"];
const PROPERTY_KEYWORDS: [&str; 2] = ["additionalProperties", "unevaluatedProperties"];

/// Validates documents against schemas held by a [`SchemaStore`].
#[derive(Clone, Debug)]
pub struct SchemaValidator {
    store: Arc<SchemaStore>,
}

impl SchemaValidator {
    /// Create a validator using schemas from `store`.
    #[must_use]
    pub const fn new(store: Arc<SchemaStore>) -> Self {
        Self { store }
    }

    /// The underlying schema store.
    #[must_use]
    pub const fn store(&self) -> &Arc<SchemaStore> {
        &self.store
    }

    /// Validate `document` against the schema stored at `location`.
    ///
    /// A failed validation is not an error; inspect the returned
    /// [`ValidationResult`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the schema cannot be loaded or compiled.
    pub fn validate(&self, location: &str, document: &Value) -> Result<ValidationResult> {
        let schema = self.store.get(location)?;
        let BasicOutput::Invalid(units) = schema.validator().apply(document).basic() else {
            return Ok(ValidationResult {
                valid: true,
                errors: vec![],
            });
        };

        let mut unexpected = None;
        let mut errors = Vec::new();
        for unit in units {
            let instance_location = unit.instance_location().to_string();
            let schema_path = unit.keyword_location().to_string();
            let segments = schema_path.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>();
            let keyword = keyword(&segments);

            let children = if PROPERTY_KEYWORDS.contains(&keyword) {
                let unexpected = unexpected
                    .get_or_insert_with(|| unexpected_properties(schema.validator(), document));
                unexpected
                    .get(&(schema_path.clone(), instance_location.clone()))
                    .map(|properties: &Vec<String>| {
                        properties
                            .iter()
                            .map(|property| OutputUnit {
                                keyword: keyword.to_string(),
                                instance_location: format!(
                                    "{instance_location}/{}",
                                    escape(property)
                                ),
                                message: Some(format!("property `{property}` is not allowed")),
                                errors: vec![],
                                schema_path: schema_path.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            } else {
                vec![]
            };

            let unit = OutputUnit {
                keyword: keyword.to_string(),
                instance_location,
                message: Some(unit.error_description().to_string()),
                errors: children,
                schema_path: schema_path.clone(),
            };
            place(&mut errors, unit, &segments, 0);
        }

        Ok(ValidationResult {
            valid: errors.is_empty(),
            errors,
        })
    }

    /// Serialize `value` to JSON and validate it against the schema stored at
    /// `location`.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized or the schema cannot
    /// be loaded.
    pub fn validate_serialize<T: Serialize>(
        &self, location: &str, value: &T,
    ) -> Result<ValidationResult> {
        let document = serde_json::to_value(value)?;
        self.validate(location, &document)
    }

    /// Whether `document` is valid against the schema stored at `location`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the schema cannot be loaded or compiled.
    pub fn is_valid(&self, location: &str, document: &Value) -> Result<bool> {
        let schema = self.store.get(location)?;
        Ok(schema.validator().is_valid(document))
    }
}

/// Outcome of validating a document.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the document satisfies the schema.
    pub valid: bool,

    /// Top-level error units. Empty when `valid` is true.
    pub errors: Vec<OutputUnit>,
}

impl ValidationResult {
    /// Number of leaf errors in the tree.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.leaves().len()
    }

    /// Every leaf error, depth first.
    #[must_use]
    pub fn leaves(&self) -> Vec<&OutputUnit> {
        fn collect<'a>(units: &'a [OutputUnit], out: &mut Vec<&'a OutputUnit>) {
            for unit in units {
                if unit.errors.is_empty() {
                    out.push(unit);
                } else {
                    collect(&unit.errors, out);
                }
            }
        }

        let mut out = Vec::new();
        collect(&self.errors, &mut out);
        out
    }

    /// Append the errors of `other`, relocating them under the JSON pointer
    /// `pointer`. The combined result is valid only if both were.
    pub fn extend_at(&mut self, pointer: &str, other: Self) {
        fn relocate(unit: &mut OutputUnit, pointer: &str) {
            unit.instance_location = format!("{pointer}{}", unit.instance_location);
            for child in &mut unit.errors {
                relocate(child, pointer);
            }
        }

        self.valid &= other.valid;
        for mut unit in other.errors {
            relocate(&mut unit, pointer);
            self.errors.push(unit);
        }
    }

    /// Log every leaf error at `info` level. Nothing is logged during
    /// validation itself; callers decide whether a failure is worth logging.
    pub fn log_errors(&self) {
        for unit in self.leaves() {
            tracing::info!(
                keyword = %unit.keyword,
                instance_location = %unit.instance_location,
                "{}",
                unit.message.as_deref().unwrap_or("validation failed")
            );
        }
    }
}

/// A single node of the validation error tree.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutputUnit {
    /// The schema keyword that failed, e.g. `required`.
    pub keyword: String,

    /// JSON pointer to the failing part of the instance. Empty for the root.
    pub instance_location: String,

    /// Human readable description of the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Nested errors.
    pub errors: Vec<OutputUnit>,

    #[serde(skip)]
    schema_path: String,
}

// Last non-index segment of the schema path.
fn keyword<'a>(segments: &[&'a str]) -> &'a str {
    segments.iter().rev().find(|s| s.parse::<usize>().is_err()).copied().unwrap_or_default()
}

// Offending property names, keyed by schema path and instance location. Only
// failures outside a composition branch are reported with their names; inside
// a branch the unit stays a leaf at the object.
fn unexpected_properties(
    validator: &Validator, document: &Value,
) -> HashMap<(String, String), Vec<String>> {
    validator
        .iter_errors(document)
        .filter_map(|error| match error.kind {
            ValidationErrorKind::AdditionalProperties { unexpected }
            | ValidationErrorKind::UnevaluatedProperties { unexpected } => Some((
                (error.schema_path.to_string(), error.instance_path.to_string()),
                unexpected,
            )),
            _ => None,
        })
        .collect()
}

fn escape(property: &str) -> String {
    property.replace('~', "~0").replace('/', "~1")
}

// Insert `unit` into `units`, descending into a composition unit for every
// `allOf`/`anyOf`/`oneOf` branch found in the schema path after `offset`.
fn place(units: &mut Vec<OutputUnit>, unit: OutputUnit, segments: &[&str], offset: usize) {
    let branch = (offset..segments.len().saturating_sub(2)).find(|&i| {
        COMPOSITION.contains(&segments[i]) && segments[i + 1].parse::<usize>().is_ok()
    });
    let Some(i) = branch else {
        units.push(unit);
        return;
    };

    let prefix = format!("/{}", segments[..=i].join("/"));
    let index = if let Some(index) = units.iter().position(|u| u.schema_path == prefix) {
        let parent = &mut units[index];
        parent.instance_location =
            common_prefix(&parent.instance_location, &unit.instance_location);
        index
    } else {
        units.push(OutputUnit {
            keyword: segments[i].to_string(),
            instance_location: unit.instance_location.clone(),
            message: None,
            errors: vec![],
            schema_path: prefix,
        });
        units.len() - 1
    };

    place(&mut units[index].errors, unit, segments, i + 2);
}

fn common_prefix(a: &str, b: &str) -> String {
    a.split('/')
        .zip(b.split('/'))
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect::<Vec<_>>()
        .join("/")
}
