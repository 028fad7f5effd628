//! Prompt construction for AI interpretation

use crate::command::catalog::{CommandCatalog, CommandTemplate};
use crate::context::ConversationContext;
use crate::core::error::Result;
use serde::Serialize;

/// User payload sent alongside the system prompt
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRequest<'a> {
    pub user_input: &'a str,
    pub context: &'a ConversationContext,
    pub available_commands: Vec<&'a CommandTemplate>,
    pub scene_info: &'a str,
}

impl<'a> AiRequest<'a> {
    pub fn new(user_input: &'a str, context: &'a ConversationContext, catalog: &'a CommandCatalog) -> Self {
        Self {
            user_input,
            context,
            available_commands: catalog.all().iter().map(|t| t.as_ref()).collect(),
            scene_info: &context.scene_summary,
        }
    }

    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// System prompt: capabilities, reply schema, commands, and live context
pub fn system_prompt(catalog: &CommandCatalog, context: &ConversationContext) -> String {
    let mut prompt = String::from(SYSTEM_PROMPT_HEADER);

    prompt.push_str("\nAVAILABLE COMMANDS:\n");
    for template in catalog.all() {
        let params = template.parameters.join(", ");
        match &template.description {
            Some(description) => prompt.push_str(&format!("- {}({}): {}\n", template.name, params, description)),
            None => prompt.push_str(&format!("- {}({})\n", template.name, params)),
        }
    }

    prompt.push_str("\nCURRENT CONTEXT:\n");
    prompt.push_str(&context.summary());
    prompt.push_str(SYSTEM_PROMPT_FOOTER);
    prompt
}

const SYSTEM_PROMPT_HEADER: &str = r#"You are interpreting natural language commands for a 3D modeling application.
Convert the user's request into an ordered list of commands to execute.

CAPABILITIES:
- Interpret modeling commands and their parameters
- Resolve spatial relationships ("next to it", "above the box") using the context
- Break multi-step requests into several commands

RESPONSE FORMAT (JSON only, no explanation outside the JSON):
{
  "actions": [
    {"commandName": "ExactCommandName", "parameters": {...}, "confidence": 0.0-1.0}
  ],
  "responseText": "short explanation, or a clarifying question when actions is empty"
}
"#;

const SYSTEM_PROMPT_FOOTER: &str = r#"
RULES:
- Use only the commands listed above and only their listed parameters
- Points and dimensions are [x, y, z] arrays
- All sizes must be positive numbers
- If the request is ambiguous, return no actions and ask in responseText

Example:
"create a red sphere with radius 5 at the origin" -> {"actions": [{"commandName": "CreateSphere", "parameters": {"center": [0, 0, 0], "radius": 5, "material": "red"}, "confidence": 0.95}]}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_lists_catalog_and_context() {
        let catalog = CommandCatalog::with_defaults();
        let context = ConversationContext {
            active_layer: "Walls".into(),
            ..Default::default()
        };
        let prompt = system_prompt(&catalog, &context);
        assert!(prompt.contains("- CreateSphere(center, radius, material, layer)"));
        assert!(prompt.contains("ArrangeObjects"));
        assert!(prompt.contains("Active layer: Walls"));
        assert!(prompt.contains("\"commandName\""));
    }

    #[test]
    fn test_payload_is_camel_case() {
        let catalog = CommandCatalog::with_defaults();
        let context = ConversationContext::default();
        let payload = AiRequest::new("arrange spheres in a ring", &context, &catalog)
            .to_payload()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["userInput"], "arrange spheres in a ring");
        assert_eq!(value["availableCommands"].as_array().unwrap().len(), catalog.len());
        assert!(value.get("sceneInfo").is_some());
    }
}
