//! Prompt templates and the grounded-generation composer.
//!
//! The composed request has five named slots: persona, grounding rule,
//! format rules, retrieved context, and the user query. The first three make
//! up the request instructions; context and query make up the request input.

use crate::base::config::Config;

/// Persona and tone instructions for the answer model.
pub const PERSONA_DIRECTIVE: &str = r#####"
# Role

You are a friendly workplace guide assistant embedded in a company chat workspace.  You answer employees' questions about internal policies, benefits, office facilities, and everyday procedures.  Keep a warm, plain-spoken tone, address the reader directly, and prefer short, concrete answers over exhaustive ones.  You are not a replacement for the people team: when a question needs human judgment, say so and point at them.
"#####;

/// Absolute grounding rule. The `{no_information}` slot is replaced with the
/// configured no-information phrase.
pub const GROUNDING_DIRECTIVE_TEMPLATE: &str = r#####"
# Grounding

Answer using ONLY the information inside the "Knowledge Context" section of the request.  Do not use outside knowledge, do not guess, and do not extrapolate from partial matches.  If the context does not contain the answer to the question, reply with exactly this sentence and nothing else:

{no_information}
"#####;

/// Output-formatting rules for the answer model.
pub const FORMAT_DIRECTIVE: &str = r#####"
# Format

Write one sentence per line.  Do not use bold, italics, or any other text-emphasis markup.  The only emoji you may use are ✅ ⚠️ ℹ️ 📌, and only as structural cues at the start of a line, never decoratively.
"#####;

/// Built-in help document, used when no help file is configured.
pub const DEFAULT_HELP_TEXT: &str = r#####"ℹ️ I answer questions about the workplace guide.
Mention me in a channel or send me a direct message with your question.
Reply in my thread (mentioning me) to ask a follow-up.
Send the book-request phrase with a title and author to request a book.
"#####;

/// Generation request assembled by the composer: model instructions plus the
/// delimited context-and-query input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub instructions: String,
    pub input: String,
}

/// Named materials for one generation request.
pub struct PromptSlots<'a> {
    pub persona: &'a str,
    pub grounding: &'a str,
    pub format: &'a str,
    pub context: &'a str,
    pub query: &'a str,
}

/// Interpolate the configured no-information phrase into the grounding rule.
pub fn grounding_directive(no_information: &str) -> String {
    GROUNDING_DIRECTIVE_TEMPLATE.replace("{no_information}", no_information)
}

/// Merge the slots into a single request with clearly delimited sections.
///
/// No truncation happens here; the retriever already bounded the context.
/// An empty context still composes a full request so the model can apply the
/// no-information instruction.
pub fn compose(slots: &PromptSlots) -> ComposedPrompt {
    let instructions = format!("{}\n{}\n{}", slots.persona.trim(), slots.grounding.trim(), slots.format.trim());
    let input = format!("## Knowledge Context\n\n{}\n\n## Question\n\n{}", slots.context.trim(), slots.query.trim());

    ComposedPrompt { instructions, input }
}

/// Compose a request from the configured directives.
pub fn compose_from_config(config: &Config, context: &str, query: &str) -> ComposedPrompt {
    let grounding = grounding_directive(&config.no_information_text);

    compose(&PromptSlots {
        persona: PERSONA_DIRECTIVE,
        grounding: &grounding,
        format: FORMAT_DIRECTIVE,
        context,
        query,
    })
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_carries_all_slots() {
        let prompt = compose(&PromptSlots {
            persona: "persona text",
            grounding: "grounding text",
            format: "format text",
            context: "vacation policy: 15 days",
            query: "how many vacation days?",
        });

        assert!(prompt.instructions.contains("persona text"));
        assert!(prompt.instructions.contains("grounding text"));
        assert!(prompt.instructions.contains("format text"));
        assert!(prompt.input.contains("vacation policy: 15 days"));
        assert!(prompt.input.contains("how many vacation days?"));
    }

    #[test]
    fn context_and_query_sections_are_delimited() {
        let prompt = compose(&PromptSlots {
            persona: "p",
            grounding: "g",
            format: "f",
            context: "ctx",
            query: "q",
        });

        let context_at = prompt.input.find("## Knowledge Context").unwrap();
        let query_at = prompt.input.find("## Question").unwrap();
        assert!(context_at < query_at);
    }

    #[test]
    fn empty_context_still_composes() {
        let prompt = compose(&PromptSlots {
            persona: "p",
            grounding: "g",
            format: "f",
            context: "",
            query: "where is the office?",
        });

        assert!(prompt.input.contains("## Knowledge Context"));
        assert!(prompt.input.contains("where is the office?"));
    }

    #[test]
    fn grounding_directive_interpolates_phrase() {
        let directive = grounding_directive("I don't know that one.");
        assert!(directive.contains("I don't know that one."));
        assert!(!directive.contains("{no_information}"));
    }
}
