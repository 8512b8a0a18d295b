//! Tool definitions offered to the model, and the typed inputs we read back.
//!
//! The model is steered through tool calls rather than free text:
//! `validate_agent_idea` classifies the idea, `select_architecture` picks a
//! pattern, and `generate_spec` carries the three spec files as string
//! arguments. `generate_spec`'s arguments are what the streaming
//! extractor parses.

use serde::Deserialize;
use serde_json::{json, Value};

pub const VALIDATE_AGENT_IDEA: &str = "validate_agent_idea";
pub const SELECT_ARCHITECTURE: &str = "select_architecture";
pub const GENERATE_SPEC: &str = "generate_spec";

/// All tools, in the Anthropic Messages API `tools` format.
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": VALIDATE_AGENT_IDEA,
            "description": "Validate whether the user's idea is suitable to be built as an AI agent or if it can be achieved with a simple script. If suitable for an agent, determine whether it should be a single-agent or multi-agent system.",
            "input_schema": {
                "type": "object",
                "properties": {
                    "is_suitable_for_agent": {
                        "type": "boolean",
                        "description": "Whether the idea requires an AI agent (True) or can be solved with a simple script (False)"
                    },
                    "agent_type": {
                        "type": "string",
                        "description": "The recommended system type based on the idea's complexity and requirements",
                        "enum": ["script", "single-agent", "multi-agent"]
                    },
                    "reasoning": {
                        "type": "string",
                        "description": "Explanation of why this classification was chosen"
                    }
                },
                "required": ["is_suitable_for_agent", "agent_type", "reasoning"]
            }
        },
        {
            "name": SELECT_ARCHITECTURE,
            "description": "Select the best architecture pattern for the user's agent based on their requirements. Use after validate_agent_idea confirms the idea is viable.",
            "input_schema": {
                "type": "object",
                "properties": {
                    "complexity": {
                        "type": "string",
                        "enum": ["simple", "moderate", "complex"],
                        "description": "How complex the agent's task is"
                    },
                    "needs_determinism": {
                        "type": "boolean",
                        "description": "Whether the agent needs predictable, repeatable behavior"
                    },
                    "parallel_subtasks": {
                        "type": "boolean",
                        "description": "Whether the agent has independent subtasks that can run simultaneously"
                    },
                    "reasoning": {
                        "type": "string",
                        "description": "Explanation of the architecture decisions for complexity, determinism, and parallelism"
                    }
                },
                "required": ["complexity", "needs_determinism", "reasoning"]
            }
        },
        {
            "name": GENERATE_SPEC,
            "description": "Generate the three spec files (requirements.md, design.md, tasks.md) for the user's AI agent, formatted for Kiro IDE and Claude Code compatibility.",
            "input_schema": {
                "type": "object",
                "properties": {
                    "requirements": {
                        "type": "string",
                        "description": "The full content of requirements.md including user stories, acceptance criteria in EARS notation, and non-functional requirements"
                    },
                    "design": {
                        "type": "string",
                        "description": "The full content of design.md including architecture diagrams, components, data flow, technology stack, prompts, and risk matrix"
                    },
                    "tasks": {
                        "type": "string",
                        "description": "The full content of tasks.md with phased implementation tasks, sub-tasks, dependencies, and acceptance criteria. Tasks must be individually executable in Kiro IDE"
                    }
                },
                "required": ["requirements", "design", "tasks"]
            }
        }
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    Script,
    SingleAgent,
    MultiAgent,
}

/// Input of a `validate_agent_idea` call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdeaValidation {
    pub is_suitable_for_agent: bool,
    pub agent_type: AgentType,
    pub reasoning: String,
}

impl IdeaValidation {
    pub fn from_tool_input(input: &Value) -> anyhow::Result<Self> {
        Ok(serde_json::from_value(input.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_tools_with_names() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec![VALIDATE_AGENT_IDEA, SELECT_ARCHITECTURE, GENERATE_SPEC]);
    }

    #[test]
    fn test_generate_spec_requires_spec_fields() {
        let tools = tool_definitions();
        let spec = &tools[2]["input_schema"]["required"];
        assert_eq!(spec, &json!(["requirements", "design", "tasks"]));
    }

    #[test]
    fn test_parse_idea_validation() {
        let v = IdeaValidation::from_tool_input(&json!({
            "is_suitable_for_agent": true,
            "agent_type": "multi-agent",
            "reasoning": "distinct roles"
        }))
        .unwrap();
        assert!(v.is_suitable_for_agent);
        assert_eq!(v.agent_type, AgentType::MultiAgent);

        assert!(IdeaValidation::from_tool_input(&json!({"agent_type": "robot"})).is_err());
    }
}
