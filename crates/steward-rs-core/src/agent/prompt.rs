//! System instruction rendering.
//!
//! The instruction is a pure function of the conversation state. It is
//! rendered fresh for every agent invocation and never written to history.

use crate::types::{Message, SessionId};
use chrono::{DateTime, Local};
use steward_rs_config::OrchestratorConfig;

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

const PERSONA: &str = "You are my (the user's) dedicated personal secretary.\n\n\
Your core personality:\n\
- Elegant: your words and manner are graceful and pleasant, and you keep a professional poise.\n\
- Smart: you think quickly and clearly and offer high-quality insight.\n\
- Capable: you work efficiently and reliably, without dragging things out.\n\
- Gentle: you are friendly, patient and attentive, with genuine warmth.\n\n\
Communication and output:\n\
1. Keep everyday replies brief. In casual conversation, when confirming an instruction or answering a simple \
question, be concise. A secretary reporting to the boss does not ramble.\n\
2. Make written deliverables thorough. When the user asks for a report, code, a plan or other formal work, \
provide complete, detailed, high-quality content with care and rigor.\n\
3. Tell the two apart. Judge whether the moment calls for a spoken report (brief) or a written deliverable (detailed).";

const MEMORY_RULES: &str = "## Long-term memory\n\n\
You have access to the user's long-term memory.\n\
- To save new information about the user, use `update_user_memory`.\n\
- To recall information about the user, use `search_memory` (semantic search) or `get_user_memory` (direct lookup).\n\
- You can also check the current time and the weather.\n\n\
Decide on your own when to search memory. If the user asks about personal details \
(for example \"what is my name?\" or \"what do I like?\"), use `search_memory` to find the answer.\n\
Do not invent details about the user. If you are unsure, check memory first.";

/// Conversation state visible to prompt rendering.
#[derive(Debug, Clone)]
pub struct PromptState<'a> {
    pub session_id: SessionId,
    /// Stored history, oldest first, without any system message.
    pub history: &'a [Message],
    /// Names of the tools offered on this invocation.
    pub tool_names: &'a [String],
    /// Wall-clock time of the invocation.
    pub now: DateTime<Local>,
}

/// `(conversation state) -> instruction text`.
pub trait SystemPrompt: Send + Sync {
    fn render(&self, state: &PromptState<'_>) -> String;
}

/// Default assistant persona with memory-tool rules.
#[derive(Debug, Clone)]
pub struct PersonaPrompt {
    base: String,
    append: Option<String>,
}

impl Default for PersonaPrompt {
    fn default() -> Self {
        Self {
            base: PERSONA.to_string(),
            append: None,
        }
    }
}

impl PersonaPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persona honouring `system_prompt` (replace) and `append_system_prompt`.
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        let base = config
            .system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| PERSONA.to_string());
        let append = config
            .append_system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|extra| !extra.is_empty())
            .map(str::to_string);
        Self { base, append }
    }
}

impl SystemPrompt for PersonaPrompt {
    fn render(&self, state: &PromptState<'_>) -> String {
        let mut sections = vec![self.base.clone()];
        if state
            .tool_names
            .iter()
            .any(|name| name.ends_with("_memory"))
        {
            sections.push(MEMORY_RULES.to_string());
        }
        sections.push(format!(
            "## Current Time\n{}",
            state.now.format("%Y-%m-%d %H:%M (%A)")
        ));
        if let Some(append) = &self.append {
            sections.push(format!("## Additional Instructions\n{append}"));
        }
        sections.join(SECTION_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::{PersonaPrompt, PromptState, SystemPrompt};
    use chrono::{Local, TimeZone};
    use pretty_assertions::assert_eq;
    use steward_rs_config::OrchestratorConfig;
    use uuid::Uuid;

    fn render(prompt: &PersonaPrompt, tools: &[String]) -> String {
        let now = Local
            .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
            .single()
            .expect("time");
        prompt.render(&PromptState {
            session_id: Uuid::new_v4(),
            history: &[],
            tool_names: tools,
            now,
        })
    }

    #[test]
    fn default_persona_includes_memory_rules_and_time() {
        let tools = vec!["search_memory".to_string(), "update_user_memory".to_string()];
        let text = render(&PersonaPrompt::new(), &tools);
        assert!(text.starts_with("You are my (the user's) dedicated personal secretary."));
        assert!(text.contains("A secretary reporting to the boss does not ramble."));
        assert!(text.contains("Do not invent details about the user."));
        assert!(text.contains("## Current Time\n2024-03-01 09:30 (Friday)"));
    }

    #[test]
    fn memory_rules_are_skipped_without_memory_tools() {
        let text = render(&PersonaPrompt::new(), &["get_current_time".to_string()]);
        assert!(!text.contains("## Long-term memory"));
    }

    #[test]
    fn config_overrides_and_appends() {
        let config = OrchestratorConfig {
            system_prompt: Some("You are terse.".to_string()),
            append_system_prompt: Some("Answer in French.".to_string()),
            ..OrchestratorConfig::default()
        };
        let text = render(&PersonaPrompt::from_config(&config), &[]);
        let sections: Vec<_> = text.split("\n\n---\n\n").collect();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0], "You are terse.");
        assert_eq!(sections[2], "## Additional Instructions\nAnswer in French.");
    }

    #[test]
    fn rendering_is_deterministic() {
        let prompt = PersonaPrompt::new();
        assert_eq!(render(&prompt, &[]), render(&prompt, &[]));
    }
}
