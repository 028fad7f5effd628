//! Semantic validation of extracted parameters
//!
//! Invalid input is a value ([`ValidationResult::invalid`]), never an error.
//! Both entry points are pure functions of their arguments, so validating
//! the same parameters twice always yields the same result.

use crate::command::catalog::{CommandTemplate, IntentCategory};
use crate::context::ConversationContext;
use crate::core::types::{EntityId, ParamValue, Parameters};

/// Numeric parameters that must be strictly positive wherever they appear
const POSITIVE_FIELDS: &[&str] = &["radius", "height", "width", "length", "depth", "factor", "spacing", "count"];

/// Outcome of a validation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(reason.into()) }
    }

    pub fn message(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }
}

/// Structural and context-dependent parameter checks
#[derive(Debug, Clone, Default)]
pub struct SemanticValidator;

impl SemanticValidator {
    pub fn new() -> Self {
        Self
    }

    /// Per-template structural and numeric rules
    pub fn validate_parameters(&self, parameters: &Parameters, template: &CommandTemplate) -> ValidationResult {
        if let Some(key) = parameters.keys().find(|k| !template.declares(k)) {
            return ValidationResult::invalid(format!(
                "Parameter '{}' is not accepted by {}",
                key, template.name
            ));
        }

        let subject = if template.name.starts_with("Create") {
            capitalize(&template.entity_kind())
        } else {
            template.name.clone()
        };

        for field in POSITIVE_FIELDS {
            match parameters.get(*field) {
                Some(value) => match value.as_f64() {
                    Some(n) if n <= 0.0 || !n.is_finite() => {
                        return ValidationResult::invalid(format!("{} {} must be positive", subject, field));
                    }
                    None => {
                        return ValidationResult::invalid(format!("{} {} must be a number", subject, field));
                    }
                    _ => {}
                },
                None => continue,
            }
        }

        for field in ["dimensions", "size"] {
            if let Some(value) = parameters.get(field) {
                match value {
                    ParamValue::Vector(dims) if dims.all_positive() => {}
                    ParamValue::Vector(_) => {
                        return ValidationResult::invalid(format!("{} dimensions must be positive", subject));
                    }
                    _ => {
                        return ValidationResult::invalid(format!(
                            "{} dimensions must be three numbers",
                            subject
                        ));
                    }
                }
            }
        }

        for field in ["center", "position", "offset"] {
            if let Some(value) = parameters.get(field) {
                match value.as_vec3() {
                    Some(v) if v.components().iter().all(|c| c.is_finite()) => {}
                    _ => {
                        return ValidationResult::invalid(format!("{} must be a 3D point", field));
                    }
                }
            }
        }

        ValidationResult::valid()
    }

    /// Structural check, then constraints that depend on the live context
    pub fn pre_execute_validation(
        &self,
        template: &CommandTemplate,
        parameters: &Parameters,
        context: &ConversationContext,
    ) -> ValidationResult {
        let structural = self.validate_parameters(parameters, template);
        if !structural.is_valid {
            return structural;
        }

        if let Some(layer) = parameters.get("layer").and_then(|v| v.as_str()) {
            if !context.layers.is_empty() && !context.layers.iter().any(|l| l.eq_ignore_ascii_case(layer)) {
                return ValidationResult::invalid(format!("Layer '{}' does not exist", layer));
            }
        }

        if template.category == IntentCategory::Modification {
            return validate_modification_target(parameters, context);
        }

        ValidationResult::valid()
    }
}

/// A modification needs exactly one resolvable target
fn validate_modification_target(parameters: &Parameters, context: &ConversationContext) -> ValidationResult {
    match parameters.get("objectId") {
        Some(ParamValue::Text(raw)) => match EntityId::parse(raw) {
            Some(_) => ValidationResult::valid(),
            None => ValidationResult::invalid(format!("'{}' is not a valid object id", raw)),
        },
        Some(_) => ValidationResult::invalid("Object id must be text"),
        None if context.selected_entities.len() > 1 => {
            ValidationResult::invalid("Several objects are selected; say which one to modify")
        }
        None if context.selected_entities.is_empty() && context.last_created.is_none() => {
            ValidationResult::invalid("There is no object to modify")
        }
        None => ValidationResult::valid(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
