//! Command templates and the catalog they are registered in

use crate::core::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Broad purpose of an utterance; decides how the pipeline routes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// Single, fully specified command ("create a sphere")
    DirectCommand,
    /// Multi-step work that needs AI interpretation
    ComplexOperation,
    /// Question about the scene; never mutates it
    Query,
    /// Change to an existing object
    Modification,
    /// Nothing matched
    Unknown,
}

impl IntentCategory {
    pub fn label(&self) -> &'static str {
        match self {
            IntentCategory::DirectCommand => "command",
            IntentCategory::ComplexOperation => "complex operation",
            IntentCategory::Query => "question",
            IntentCategory::Modification => "modification",
            IntentCategory::Unknown => "unknown",
        }
    }
}

/// A named, parameterized command shape the pipeline can execute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub name: String,
    /// Parameter names in declaration order
    pub parameters: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Keyword entries; `|` separates synonyms within one entry
    #[serde(default)]
    pub keywords: Vec<String>,
    pub category: IntentCategory,
    /// Always interpret through the AI orchestrator
    #[serde(default)]
    pub requires_ai: bool,
}

impl CommandTemplate {
    pub fn new(name: &str, category: IntentCategory) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            description: None,
            keywords: Vec::new(),
            category,
            requires_ai: false,
        }
    }

    pub fn with_parameters(mut self, parameters: &[&str]) -> Self {
        self.parameters = parameters.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn requiring_ai(mut self) -> Self {
        self.requires_ai = true;
        self
    }

    /// Whether `parameter` is declared on this template
    pub fn declares(&self, parameter: &str) -> bool {
        self.parameters.iter().any(|p| p == parameter)
    }

    /// Type tag for entities this template creates ("CreateSphere" -> "sphere")
    pub fn entity_kind(&self) -> String {
        self.name
            .strip_prefix("Create")
            .filter(|rest| !rest.is_empty())
            .unwrap_or(&self.name)
            .to_lowercase()
    }
}

/// Immutable registry of command templates, in declaration order
///
/// Declaration order matters: the intent classifier resolves confidence ties
/// in favor of the template declared first.
#[derive(Debug, Clone, Default)]
pub struct CommandCatalog {
    templates: Vec<Arc<CommandTemplate>>,
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in modeling commands
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        let verbs = "create|make|add|draw|place|generate|build";

        catalog.add(
            CommandTemplate::new("CreateSphere", IntentCategory::DirectCommand)
                .with_parameters(&["center", "radius", "material", "layer"])
                .with_keywords(&[verbs, "sphere|ball|orb"])
                .with_description("Creates a sphere with center, radius, material, layer"),
        );
        catalog.add(
            CommandTemplate::new("CreateBox", IntentCategory::DirectCommand)
                .with_parameters(&["center", "dimensions", "material", "layer"])
                .with_keywords(&[verbs, "box|cube|block|cuboid"])
                .with_description("Creates a box with center, dimensions, material, layer"),
        );
        catalog.add(
            CommandTemplate::new("CreateCylinder", IntentCategory::DirectCommand)
                .with_parameters(&["center", "radius", "height", "material", "layer"])
                .with_keywords(&[verbs, "cylinder|tube|pipe|column"])
                .with_description("Creates a cylinder with center, radius, height, material, layer"),
        );
        catalog.add(
            CommandTemplate::new("ModifyObject", IntentCategory::Modification)
                .with_parameters(&["objectId", "operation", "offset", "factor", "angle"])
                .with_keywords(&[
                    "move|scale|rotate|modify|change|edit|update|resize|shift|turn",
                    "it|this|that|object|selection|selected|sphere|box|cube|cylinder",
                ])
                .with_description("Moves, scales or rotates an existing object"),
        );
        catalog.add(
            CommandTemplate::new("QueryScene", IntentCategory::Query)
                .with_keywords(&[
                    "what|how many|list|show|which|describe|where",
                    "scene|objects|layer|selected|selection|there",
                ])
                .with_description("Answers questions about the current scene"),
        );
        catalog.add(
            CommandTemplate::new("ArrangeObjects", IntentCategory::ComplexOperation)
                .with_parameters(&["layout", "count", "spacing"])
                .with_keywords(&[
                    "arrange|layout|distribute|pattern|array|assemble|design",
                    "grid|row|circle|ring|structure|objects|spheres|boxes|cylinders",
                ])
                .with_description("Multi-object layouts interpreted by the AI provider")
                .requiring_ai(),
        );

        catalog
    }

    /// Add a template to the catalog
    pub fn add(&mut self, template: CommandTemplate) {
        self.templates.push(Arc::new(template));
    }

    /// Look a template up by name.
    ///
    /// Case, underscores, hyphens and spaces are ignored so that provider
    /// replies like `create_sphere` still resolve.
    pub fn get(&self, name: &str) -> Option<Arc<CommandTemplate>> {
        let wanted = comparable_name(name);
        self.templates
            .iter()
            .find(|t| comparable_name(&t.name) == wanted)
            .cloned()
    }

    /// All templates in declaration order
    pub fn all(&self) -> &[Arc<CommandTemplate>] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Load a catalog from a TOML file
    pub fn load_from_toml(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse a catalog from TOML text (`[[commands]]` tables)
    pub fn parse_toml(content: &str) -> Result<Self> {
        let toml_data: TomlCatalog = toml::from_str(content)?;

        let mut catalog = Self::new();
        for template in toml_data.commands {
            if template.name.trim().is_empty() {
                return Err(PipelineError::Config("command with empty name".into()));
            }
            if catalog.get(&template.name).is_some() {
                return Err(PipelineError::Config(format!(
                    "duplicate command '{}'",
                    template.name
                )));
            }
            catalog.add(template);
        }
        Ok(catalog)
    }
}

fn comparable_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// TOML representation of a catalog file
#[derive(Debug, Deserialize)]
struct TomlCatalog {
    commands: Vec<CommandTemplate>,
}
